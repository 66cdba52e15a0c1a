//! OpenType parsing logic.

use core::{fmt, ops, str};

pub(crate) use self::{
    cmap::{CmapTable, SegmentDeltas, SegmentWithDelta, SegmentedCoverage, SequentialMapGroup},
    directory::TableDirectory,
    glyph::{Glyph, GlyphComponent, GlyphComponentArgs, GlyphWithMetrics, TransformData},
    name::NameTable,
    post::{PostGlyphNames, PostTable},
    tables::{HeadTable, HheaTable, HmtxTable, LocaFormat, LocaTable, MaxpTable, Os2Table},
};
use crate::{
    alloc::{String, Vec},
    errors::{ParseError, ParseErrorKind},
};

mod cmap;
mod directory;
mod glyph;
mod name;
mod post;
mod tables;

/// OpenType table tag, e.g. `glyf` or `cmap`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match str::from_utf8(&self.0) {
            Ok(s) => formatter.pad(s),
            Err(_) => write!(formatter, "{:#010x}", u32::from_be_bytes(self.0)),
        }
    }
}

impl TableTag {
    pub(crate) const CMAP: Self = Self(*b"cmap");
    pub(crate) const HEAD: Self = Self(*b"head");
    pub(crate) const HHEA: Self = Self(*b"hhea");
    pub(crate) const HMTX: Self = Self(*b"hmtx");
    pub(crate) const MAXP: Self = Self(*b"maxp");
    pub(crate) const NAME: Self = Self(*b"name");
    pub(crate) const OS2: Self = Self(*b"OS/2");
    pub(crate) const POST: Self = Self(*b"post");
    pub(crate) const CVT: Self = Self(*b"cvt ");
    pub(crate) const FPGM: Self = Self(*b"fpgm");
    pub(crate) const GLYF: Self = Self(*b"glyf");
    pub(crate) const LOCA: Self = Self(*b"loca");
    pub(crate) const PREP: Self = Self(*b"prep");
    pub(crate) const GASP: Self = Self(*b"gasp");
    pub(crate) const CFF: Self = Self(*b"CFF ");
    pub(crate) const CFF2: Self = Self(*b"CFF2");

    /// Tables not tied to glyph indices that are carried to the subset verbatim.
    const PASSTHROUGH: [Self; 4] = [Self::CVT, Self::FPGM, Self::PREP, Self::GASP];

    /// Returns the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

/// Bounds-checked big-endian reader over font data.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    /// Offset of `bytes` relative to the start of the table (or font data); used in errors.
    offset: usize,
    table: Option<TableTag>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    pub(crate) fn for_table(tag: TableTag, bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: Some(tag),
        }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        self.bytes = &self.bytes[len..];
        self.offset += len;
        Ok(())
    }

    /// Splits off the first `len` bytes into a separate cursor.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.bytes.split_at(len);
        let head = Self {
            bytes: head,
            ..*self
        };
        self.bytes = tail;
        self.offset += len;
        Ok(head)
    }

    /// Narrows this cursor to the specified range relative to the current position.
    pub(crate) fn range(self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let len = self.bytes.len();
        let Some(bytes) = self.bytes.get(range.clone()) else {
            return Err(self.err(ParseErrorKind::RangeOutOfBounds { range, len }));
        };
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }

    /// Moves the cursor to the specified offset relative to the current position.
    pub(crate) fn at(mut self, offset: usize) -> Result<Self, ParseError> {
        if offset > self.bytes.len() {
            return Err(self.err(ParseErrorKind::OffsetOutOfBounds(offset)));
        }
        self.bytes = &self.bytes[offset..];
        self.offset += offset;
        Ok(self)
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        };
        self.bytes = tail;
        self.offset += N;
        Ok(*head)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_byte_array::<1>()?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, ParseError> {
        self.read_byte_array().map(i16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    /// Reads a `u16` value and validates it with the provided closure. Errors returned
    /// by the closure are attributed to the start of the value.
    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| start.err(kind))
    }

    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Reads a `UIntBase128` value as defined by WOFF2.
    #[cfg_attr(not(feature = "woff2"), allow(dead_code))]
    pub(crate) fn read_uint_base128(&mut self) -> Result<u32, ParseError> {
        let start = *self;
        let mut value = 0_u32;
        for i in 0..5 {
            let byte = self.read_u8()?;
            // Leading zeros and values overflowing `u32` are forbidden
            if (i == 0 && byte == 0x80) || value & 0xfe00_0000 != 0 {
                return Err(start.err(ParseErrorKind::Decompression));
            }
            value = (value << 7) | u32::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(start.err(ParseErrorKind::UnexpectedEof))
    }
}

/// Glyph outlines of a [`Font`].
#[derive(Debug)]
pub(crate) enum Outlines<'a> {
    /// TrueType outlines from the `glyf` / `loca` tables, decoded for every glyph.
    TrueType(Vec<GlyphWithMetrics<'a>>),
    /// Outlines in a compact font format table, which are not decoded.
    Cff(TableTag),
}

/// OpenType font parsed from binary data.
///
/// All tables relevant for subsetting are decoded eagerly, so that subsetting cannot fail
/// because of malformed font data.
#[derive(Debug)]
pub struct Font<'a> {
    pub(crate) sfnt_version: u32,
    pub(crate) head: HeadTable<'a>,
    pub(crate) hhea: HheaTable<'a>,
    pub(crate) maxp: MaxpTable<'a>,
    pub(crate) cmap: CmapTable<'a>,
    pub(crate) name: Option<NameTable<'a>>,
    pub(crate) os2: Option<Os2Table<'a>>,
    pub(crate) post: Option<PostTable<'a>>,
    pub(crate) outlines: Outlines<'a>,
    /// Tables copied to the subset as-is, in the directory order.
    pub(crate) passthrough: Vec<(TableTag, &'a [u8])>,
}

impl<'a> Font<'a> {
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    pub(crate) const APPLE_SFNT_VERSION: u32 = u32::from_be_bytes(*b"true");
    pub(crate) const CFF_SFNT_VERSION: u32 = u32::from_be_bytes(*b"OTTO");
    pub(crate) const WOFF_SIGNATURE: u32 = u32::from_be_bytes(*b"wOFF");
    pub(crate) const WOFF2_SIGNATURE: u32 = u32::from_be_bytes(*b"wOF2");
    /// Offset of the `checkSumAdjustment` field in the `head` table.
    pub(crate) const HEAD_CHECKSUM_OFFSET: usize = 8;
    /// Target value for the checksum of the entire font file.
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;

    /// Parses a font from OpenType data.
    ///
    /// # Errors
    ///
    /// Returns an error if the font data is malformed, or a required table is missing.
    /// WOFF / WOFF2 data results in a
    /// [`CompressedContainer`](crate::ParseErrorKind::CompressedContainer) error;
    /// use [`decode_container()`](crate::decode_container) to unwrap it first.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let directory = TableDirectory::parse(bytes)?;
        let expect_table =
            |tag| directory.table(tag).ok_or_else(|| ParseError::missing_table(tag));

        let head = HeadTable::parse(expect_table(TableTag::HEAD)?)?;
        let maxp = MaxpTable::parse(expect_table(TableTag::MAXP)?)?;
        let glyph_count = maxp.glyph_count;
        let hhea = HheaTable::parse(expect_table(TableTag::HHEA)?)?;
        let hmtx = HmtxTable::parse(
            expect_table(TableTag::HMTX)?,
            hhea.number_of_h_metrics,
            glyph_count,
        )?;
        let cmap = CmapTable::parse(expect_table(TableTag::CMAP)?)?;

        let outlines = if let Some(glyf) = directory.table(TableTag::GLYF) {
            let loca = LocaTable::new(
                head.loca_format,
                glyph_count,
                expect_table(TableTag::LOCA)?,
            )?;
            Outlines::TrueType(Self::parse_glyphs(glyf, &loca, &hmtx, glyph_count)?)
        } else if directory.table(TableTag::CFF).is_some() {
            Outlines::Cff(TableTag::CFF)
        } else if directory.table(TableTag::CFF2).is_some() {
            Outlines::Cff(TableTag::CFF2)
        } else {
            return Err(ParseError::missing_table(TableTag::GLYF));
        };

        let name = directory.table(TableTag::NAME).map(NameTable::parse);
        let os2 = directory.table(TableTag::OS2).map(Os2Table::parse);
        let post = directory
            .table(TableTag::POST)
            .map(|cursor| PostTable::parse(cursor, glyph_count));
        let passthrough = directory
            .entries
            .iter()
            .filter(|entry| TableTag::PASSTHROUGH.contains(&entry.tag))
            .map(|entry| (entry.tag, entry.data))
            .collect();
        for entry in &directory.entries {
            if !Self::is_handled_table(entry.tag) {
                log::debug!("table `{}` will not be carried to subsets", entry.tag);
            }
        }

        Ok(Self {
            sfnt_version: directory.sfnt_version,
            head,
            hhea,
            maxp,
            cmap,
            name: name.transpose()?,
            os2: os2.transpose()?,
            post: post.transpose()?,
            outlines,
            passthrough,
        })
    }

    fn is_handled_table(tag: TableTag) -> bool {
        matches!(
            tag,
            TableTag::CMAP
                | TableTag::HEAD
                | TableTag::HHEA
                | TableTag::HMTX
                | TableTag::MAXP
                | TableTag::NAME
                | TableTag::OS2
                | TableTag::POST
                | TableTag::GLYF
                | TableTag::LOCA
        ) || TableTag::PASSTHROUGH.contains(&tag)
    }

    fn parse_glyphs(
        glyf: Cursor<'a>,
        loca: &LocaTable<'_>,
        hmtx: &HmtxTable<'_>,
        glyph_count: u16,
    ) -> Result<Vec<GlyphWithMetrics<'a>>, ParseError> {
        (0..glyph_count)
            .map(|glyph_idx| {
                let range = loca.glyph_range(glyph_idx)?;
                let inner = Glyph::new(glyf.range(range)?, glyph_count)?;
                let (advance, lsb) = hmtx.advance_and_lsb(glyph_idx)?;
                Ok(GlyphWithMetrics {
                    inner,
                    advance,
                    lsb,
                })
            })
            .collect()
    }

    /// Computes the OpenType checksum of the provided data, padding it with zeros
    /// to a 4-byte boundary.
    pub(crate) fn checksum(bytes: &[u8]) -> u32 {
        bytes.chunks(4).fold(0_u32, |acc, chunk| {
            let mut word = [0_u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            acc.wrapping_add(u32::from_be_bytes(word))
        })
    }

    /// Returns the number of glyphs in this font.
    pub fn glyph_count(&self) -> u16 {
        self.maxp.glyph_count
    }

    /// Returns the number of font design units per em.
    pub fn units_per_em(&self) -> u16 {
        self.head.units_per_em
    }

    /// Returns the typographic ascender from the `hhea` table.
    pub fn ascender(&self) -> i16 {
        self.hhea.ascender
    }

    /// Returns the typographic descender from the `hhea` table (usually negative).
    pub fn descender(&self) -> i16 {
        self.hhea.descender
    }

    /// Returns the font family name from the `name` table, if present.
    pub fn family_name(&self) -> Option<String> {
        self.name.as_ref()?.family_name()
    }

    /// Returns the weight class (e.g., 400 for regular fonts) from the `OS/2` table, if present.
    pub fn weight_class(&self) -> Option<u16> {
        self.os2.as_ref().map(|os2| os2.weight_class)
    }

    /// Maps a char to a glyph index. Returns 0 (the missing glyph) if the char is not mapped,
    /// or is mapped to a glyph outside the font.
    pub fn map_char(&self, ch: char) -> u16 {
        let glyph_idx = self.cmap.map_char(ch);
        if glyph_idx >= self.glyph_count() {
            log::warn!(
                "`cmap` maps {ch:?} to glyph {glyph_idx}, but the font has {} glyphs",
                self.glyph_count()
            );
            return 0;
        }
        glyph_idx
    }
}
