//! Logic for serializing `FontSubset`s in OpenType and WOFF2 formats.

use core::{iter, mem};

use crate::{
    alloc::{vec, Vec},
    font::{
        CmapTable, Glyph, GlyphComponent, GlyphComponentArgs, GlyphWithMetrics, HeadTable,
        HheaTable, HmtxTable, LocaFormat, LocaTable, MaxpTable, PostGlyphNames, PostTable,
        SegmentDeltas, SegmentWithDelta, SegmentedCoverage, SequentialMapGroup, TableDirectory,
        TransformData,
    },
    subset::OutlineStats,
    Font, FontSubset, ParseError, TableTag, Woff2Error,
};

#[cfg(feature = "woff2")]
pub(crate) mod brotli;

fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_i16(writer: &mut Vec<u8>, value: i16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn uint_base128_len(val: u32) -> usize {
    if val == 0 {
        1
    } else {
        val.ilog2() as usize / 7 + 1
    }
}

#[allow(clippy::cast_possible_truncation)] // intentional
fn write_uint_base128(buffer: &mut Vec<u8>, val: u32) {
    if val >= 1 << 28 {
        buffer.push(0x80 | (val >> 28) as u8);
    }
    if val >= 1 << 21 {
        buffer.push(0x80 | (val >> 21) as u8);
    }
    if val >= 1 << 14 {
        buffer.push(0x80 | (val >> 14) as u8);
    }
    if val >= 1 << 7 {
        buffer.push(0x80 | (val >> 7) as u8);
    }
    buffer.push((val & 127) as u8);
}

/// Writes a `cmap` table for the provided char map, which must be sorted by chars.
///
/// The table always contains a format 4 subtable for BMP chars. If the map has chars that cannot be
/// encoded in format 4, a format 12 subtable covering all chars is added as well. The latter
/// also happens if BMP chars are too fragmented to fit into format 4; in this case, the format 4
/// subtable only covers a prefix of BMP chars.
pub(crate) fn write_cmap(map: &[(char, u16)], writer: &mut Vec<u8>) {
    const HEADER_LEN: usize = 4;
    const RECORD_LEN: usize = 8;

    let coverage = SegmentedCoverage::from_map(map);
    let (deltas, is_truncated) = SegmentDeltas::from_coverage(&coverage);
    let has_full_coverage = is_truncated
        || map
            .last()
            .is_some_and(|&(ch, _)| u32::from(ch) >= u32::from(u16::MAX));

    let table_count: u16 = if has_full_coverage { 4 } else { 2 };
    write_u16(writer, 0); // table version
    write_u16(writer, table_count);

    let deltas_offset = HEADER_LEN + RECORD_LEN * usize::from(table_count);
    let coverage_offset = deltas_offset + deltas.subtable_len();
    let deltas_offset = u32::try_from(deltas_offset).expect("`cmap` offset overflow");
    let coverage_offset = u32::try_from(coverage_offset).expect("`cmap` offset overflow");
    // Encoding records must be sorted by platform ID, then by encoding ID.
    let records = [
        (
            CmapTable::UNICODE_PLATFORM,
            CmapTable::UNICODE_BMP_ENCODING,
            deltas_offset,
        ),
        (
            CmapTable::UNICODE_PLATFORM,
            CmapTable::UNICODE_FULL_ENCODING,
            coverage_offset,
        ),
        (
            CmapTable::WINDOWS_PLATFORM,
            CmapTable::WINDOWS_BMP_ENCODING,
            deltas_offset,
        ),
        (
            CmapTable::WINDOWS_PLATFORM,
            CmapTable::WINDOWS_FULL_ENCODING,
            coverage_offset,
        ),
    ];
    let records = records
        .into_iter()
        .filter(|&(_, _, offset)| has_full_coverage || offset == deltas_offset);
    for (platform_id, encoding_id, offset) in records {
        write_u16(writer, platform_id);
        write_u16(writer, encoding_id);
        write_u32(writer, offset);
    }

    deltas.write(writer);
    if has_full_coverage {
        coverage.write(writer);
    }
}

impl SegmentDeltas<'static> {
    /// Max number of segments (including the terminating one) so that the subtable length
    /// fits into `u16`.
    const MAX_SEGMENTS: usize = (u16::MAX as usize - 16) / 8;

    /// Creates format 4 segments from BMP groups of the `coverage`. Returns `true` together
    /// with segments if some BMP groups didn't fit.
    fn from_coverage(coverage: &SegmentedCoverage) -> (Self, bool) {
        const LAST_ENCODABLE_CHAR: u32 = 0xfffe;

        let bmp_group_count = coverage
            .groups
            .iter()
            .take_while(|group| group.start_char_code <= LAST_ENCODABLE_CHAR)
            .count();
        let is_truncated = bmp_group_count >= Self::MAX_SEGMENTS;
        if is_truncated {
            log::debug!(
                "{bmp_group_count} BMP segments don't fit into format 4 `cmap` subtable; \
                 truncating it to {} segments",
                Self::MAX_SEGMENTS - 1
            );
        }
        let bmp_groups = coverage.groups[..bmp_group_count]
            .iter()
            .take(Self::MAX_SEGMENTS - 1);
        #[allow(clippy::cast_possible_truncation)]
        // `_ as u16` is safe: char codes are bounded by `LAST_ENCODABLE_CHAR`, glyph IDs are `u16`
        let delta_segments = bmp_groups.map(|group| {
            let start_code = group.start_char_code as u16;
            SegmentWithDelta {
                start_code,
                end_code: group.end_char_code.min(LAST_ENCODABLE_CHAR) as u16,
                id_delta: (group.start_glyph_id as u16).wrapping_sub(start_code),
                id_range_offset: 0,
            }
        });
        // Add an empty segment with `start_code == end_code == 0xffff` as required by OpenType.
        let delta_segments = delta_segments.chain([SegmentWithDelta {
            start_code: u16::MAX,
            end_code: u16::MAX,
            id_delta: 1, // maps `start_code` to glyph #0 (the missing glyph) as recommended
            id_range_offset: 0,
        }]);
        let this = Self {
            segments: delta_segments.collect(),
            glyph_id_array: &[],
        };
        (this, is_truncated)
    }

    fn subtable_len(&self) -> usize {
        16 + 8 * self.segments.len() + self.glyph_id_array.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, Self::FORMAT);
        // Both values are bounded by `MAX_SEGMENTS`
        write_u16(writer, u16::try_from(self.subtable_len()).unwrap_or(u16::MAX));
        write_u16(writer, 0); // language

        let segment_count = u16::try_from(self.segments.len()).unwrap_or(u16::MAX);
        write_u16(writer, 2 * segment_count);
        // `segment_count` is positive: there's always the terminating segment.
        // `unwrap()` is safe: the logarithm of a `u16` value is small
        let entry_selector = u16::try_from(segment_count.ilog2()).unwrap();
        let search_range = 1_u16 << (entry_selector + 1);
        write_u16(writer, search_range);
        write_u16(writer, entry_selector);
        let range_shift = 2 * segment_count - search_range;
        write_u16(writer, range_shift);

        for segment in &self.segments {
            write_u16(writer, segment.end_code);
        }
        write_u16(writer, 0); // reserved padding
        for segment in &self.segments {
            write_u16(writer, segment.start_code);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_delta);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_range_offset);
        }
        writer.extend_from_slice(self.glyph_id_array);
    }
}

impl SegmentedCoverage {
    fn from_map(map: &[(char, u16)]) -> Self {
        let mut groups = vec![];
        let [(first_char, first_idx), rest @ ..] = map else {
            return Self::default();
        };
        let mut current_group = SequentialMapGroup {
            start_char_code: (*first_char).into(),
            end_char_code: (*first_char).into(),
            start_glyph_id: (*first_idx).into(),
        };

        for &(ch, glyph_idx) in rest {
            if u32::from(ch) == current_group.end_char_code + 1
                && u32::from(glyph_idx) == current_group.map_unchecked(ch)
            {
                current_group.end_char_code += 1;
            } else {
                let prev_group = mem::replace(
                    &mut current_group,
                    SequentialMapGroup {
                        start_char_code: ch.into(),
                        end_char_code: ch.into(),
                        start_glyph_id: glyph_idx.into(),
                    },
                );
                groups.push(prev_group);
            }
        }

        groups.push(current_group);
        Self { groups }
    }

    fn subtable_len(&self) -> usize {
        16 + 12 * self.groups.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, Self::FORMAT);
        write_u16(writer, 0); // reserved

        write_u32(
            writer,
            self.subtable_len()
                .try_into()
                .expect("subtable_len overflow"),
        );
        write_u32(writer, 0); // language
        write_u32(
            writer,
            self.groups.len().try_into().expect("groups.len() overflow"),
        );
        for group in &self.groups {
            write_u32(writer, group.start_char_code);
            write_u32(writer, group.end_char_code);
            write_u32(writer, group.start_glyph_id);
        }
    }
}

fn saturating_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

impl FontSubset<'_> {
    /// Serializes this subset to the OpenType format.
    pub fn to_truetype(&self) -> Vec<u8> {
        self.to_writer().into_opentype()
    }

    /// Serializes this subset to the WOFF2 format.
    ///
    /// # Errors
    ///
    /// Returns [`Woff2Error::CompressionUnavailable`] if the crate is compiled without
    /// the `woff2` feature, or if compression fails. In this case, [`Self::to_truetype()`]
    /// can be used as a fallback.
    pub fn to_woff2(&self) -> Result<Vec<u8>, Woff2Error> {
        self.to_writer().into_woff2()
    }

    fn to_writer(&self) -> FontWriter {
        let mut writer = FontWriter::new(Font::SFNT_VERSION);
        writer.write_table(TableTag::CMAP, |buffer| write_cmap(&self.char_map, buffer));

        let number_of_h_metrics = writer.write_table(TableTag::HMTX, |buffer| {
            HmtxTable::write_for_glyphs(&self.glyphs, buffer)
        });
        let mut hhea = self.font.hhea;
        hhea.number_of_h_metrics = number_of_h_metrics;
        writer.write_table(TableTag::HHEA, |buffer| {
            hhea.write(buffer);
        });
        writer.write_table(TableTag::MAXP, |buffer| {
            self.font
                .maxp
                .write(self.glyph_count(), &self.outline_stats, buffer);
        });

        if let Some(name) = &self.font.name {
            writer.write_raw_table(TableTag::NAME, name.raw);
        }
        if let Some(os2) = &self.font.os2 {
            writer.write_raw_table(TableTag::OS2, os2.raw);
        }
        if let Some(post) = &self.font.post {
            writer.write_table(TableTag::POST, |buffer| {
                post.write_for_glyphs(self.original_glyph_ids(), buffer);
            });
        }
        for &(tag, data) in &self.font.passthrough {
            writer.write_raw_table(tag, data);
        }

        let locations = writer.write_table(TableTag::GLYF, |buffer| {
            let mut locations = vec![0];
            let initial_offset = buffer.len();
            for glyph in &self.glyphs {
                glyph.inner.write(buffer);
                if (buffer.len() - initial_offset) % 2 == 1 {
                    buffer.push(0);
                }
                locations.push(buffer.len() - initial_offset);
            }
            locations
        });
        let loca_format = writer.write_table(TableTag::LOCA, |buffer| {
            LocaTable::write(&locations, buffer)
        });
        log::debug!("using {loca_format:?} `loca` format for the subset");

        writer.write_table(TableTag::HEAD, |buffer| {
            self.font.head.write(loca_format, buffer);
        });
        writer
    }
}

impl HeadTable<'_> {
    fn write(&self, loca_format: LocaFormat, writer: &mut Vec<u8>) {
        let original = self.raw;
        writer.extend_from_slice(&original[..Font::HEAD_CHECKSUM_OFFSET]);
        write_u32(writer, 0); // checkSumAdjustment, patched once the font is written
        writer.extend_from_slice(
            &original[Font::HEAD_CHECKSUM_OFFSET + 4..Self::LOCA_FORMAT_OFFSET],
        );
        write_u16(
            writer,
            match loca_format {
                LocaFormat::Short => 0,
                LocaFormat::Long => 1,
            },
        );
        writer.extend_from_slice(&original[Self::LOCA_FORMAT_OFFSET + 2..]);
    }
}

impl MaxpTable<'_> {
    /// Offset of `maxZones`, the first field not related to glyph outlines.
    const HINTING_FIELDS_OFFSET: usize = 14;
    /// Offset of `maxSizeOfInstructions`.
    const INSTRUCTION_FIELDS_OFFSET: usize = 26;

    fn write(&self, glyph_count: u16, stats: &OutlineStats, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.raw[..4]);
        write_u16(writer, glyph_count);
        if !self.has_v1_fields() {
            writer.extend_from_slice(&self.raw[6..]);
            return;
        }

        write_u16(writer, saturating_u16(stats.max_points));
        write_u16(writer, saturating_u16(stats.max_contours));
        write_u16(writer, saturating_u16(stats.max_composite_points));
        write_u16(writer, saturating_u16(stats.max_composite_contours));
        // Hinting limits refer to `fpgm` / `prep` programs, which are copied verbatim.
        writer.extend_from_slice(
            &self.raw[Self::HINTING_FIELDS_OFFSET..Self::INSTRUCTION_FIELDS_OFFSET],
        );
        write_u16(writer, stats.max_size_of_instructions);
        write_u16(writer, stats.max_component_elements);
        write_u16(writer, stats.max_component_depth);
        writer.extend_from_slice(&self.raw[Self::V1_LEN..]);
    }
}

impl PostTable<'_> {
    /// Writes the table for the glyphs with the specified original indices.
    fn write_for_glyphs(&self, original_glyph_ids: &[u16], writer: &mut Vec<u8>) {
        if self.version == Self::VERSION_3_0 {
            writer.extend_from_slice(self.raw);
            return;
        }
        let header = &self.raw[4..Self::HEADER_LEN];
        let Some(glyph_names) = &self.glyph_names else {
            // Drop names that cannot be reliably subset.
            write_u32(writer, Self::VERSION_3_0);
            writer.extend_from_slice(header);
            return;
        };

        write_u32(writer, Self::VERSION_2_0);
        writer.extend_from_slice(header);
        let glyph_count = u16::try_from(original_glyph_ids.len()).expect("too many glyphs");
        write_u16(writer, glyph_count);

        let mut names = vec![];
        for &old_idx in original_glyph_ids {
            // Glyphs beyond the 258 standard names in version 1.0 tables are nameless
            let name_idx = glyph_names
                .indices
                .get(usize::from(old_idx))
                .copied()
                .unwrap_or(0);
            if let Some(custom_idx) = name_idx.checked_sub(PostGlyphNames::STANDARD_NAME_COUNT) {
                let name = glyph_names.names[usize::from(custom_idx)];
                let new_idx = u16::try_from(names.len()).expect("too many glyph names");
                write_u16(writer, PostGlyphNames::STANDARD_NAME_COUNT + new_idx);
                names.push(name);
            } else {
                write_u16(writer, name_idx);
            }
        }
        for name in names {
            // Names are read as Pascal strings, so their length fits into `u8`
            writer.push(u8::try_from(name.len()).expect("glyph name too long"));
            writer.extend_from_slice(name);
        }
    }
}

impl HmtxTable<'_> {
    fn write_for_glyphs(glyphs: &[GlyphWithMetrics<'_>], writer: &mut Vec<u8>) -> u16 {
        let mut number_of_h_metrics = glyphs.len();
        while let Some([prev, current]) = glyphs[..number_of_h_metrics].last_chunk::<2>() {
            if prev.advance != current.advance {
                break;
            }
            number_of_h_metrics -= 1;
        }

        for (i, glyph) in glyphs.iter().enumerate() {
            if i < number_of_h_metrics {
                write_u16(writer, glyph.advance);
            }
            write_i16(writer, glyph.lsb);
        }

        // `number_of_h_metrics` <= number of glyphs, which fits into `u16`
        number_of_h_metrics.try_into().unwrap()
    }
}

impl HheaTable<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.raw[..Self::EXPECTED_LEN - 2]);
        write_u16(writer, self.number_of_h_metrics);
    }
}

impl LocaTable<'_> {
    /// Writes glyph locations, all of which must be even.
    fn write(locations: &[usize], writer: &mut Vec<u8>) -> LocaFormat {
        debug_assert!(locations.iter().all(|&loc| loc % 2 == 0));
        let in_bounds = locations
            .last()
            .is_none_or(|&loc| loc / 2 <= usize::from(u16::MAX));
        if in_bounds {
            for &loc in locations {
                #[allow(clippy::cast_possible_truncation)]
                // doesn't happen due to the preceding check
                write_u16(writer, (loc / 2) as u16);
            }
            LocaFormat::Short
        } else {
            for &loc in locations {
                write_u32(writer, u32::try_from(loc).expect("glyph location overflow"));
            }
            LocaFormat::Long
        }
    }
}

impl TableTag {
    /// Tags with a known index in the WOFF2 table directory.
    const WOFF2_KNOWN_TAGS: [[u8; 4]; 63] = [
        *b"cmap", *b"head", *b"hhea", *b"hmtx", *b"maxp", *b"name", *b"OS/2", *b"post",
        *b"cvt ", *b"fpgm", *b"glyf", *b"loca", *b"prep", *b"CFF ", *b"VORG", *b"EBDT",
        *b"EBLC", *b"gasp", *b"hdmx", *b"kern", *b"LTSH", *b"PCLT", *b"VDMX", *b"vhea",
        *b"vmtx", *b"BASE", *b"GDEF", *b"GPOS", *b"GSUB", *b"EBSC", *b"JSTF", *b"MATH",
        *b"CBDT", *b"CBLC", *b"COLR", *b"CPAL", *b"SVG ", *b"sbix", *b"acnt", *b"avar",
        *b"bdat", *b"bloc", *b"bsln", *b"cvar", *b"fdsc", *b"feat", *b"fmtx", *b"fvar",
        *b"gvar", *b"hsty", *b"just", *b"lcar", *b"mort", *b"morx", *b"opbd", *b"prop",
        *b"trak", *b"Zapf", *b"Silf", *b"Glat", *b"Gloc", *b"Feat", *b"Sill",
    ];
    /// Flag value signaling that the tag is written explicitly.
    pub(crate) const WOFF2_ARBITRARY_TAG: u8 = 0x3f;

    #[allow(clippy::cast_possible_truncation)] // the number of known tags is small
    pub(crate) fn woff2_index(self) -> Option<u8> {
        Self::WOFF2_KNOWN_TAGS
            .iter()
            .position(|tag| *tag == self.0)
            .map(|idx| idx as u8)
    }

    #[cfg_attr(not(feature = "woff2"), allow(dead_code))]
    pub(crate) fn from_woff2_index(idx: u8) -> Option<Self> {
        Self::WOFF2_KNOWN_TAGS.get(usize::from(idx)).copied().map(Self)
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq))]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Offset is initially recorded relative to the table data start. It's always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    fn write_opentype(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset);
        write_u32(writer, self.length);
    }

    fn self_checksum(&self) -> u32 {
        u32::from_be_bytes(self.tag.0)
            .wrapping_add(self.checksum)
            .wrapping_add(self.offset)
            .wrapping_add(self.length)
    }

    fn woff2_len(&self) -> usize {
        let tag_len = if self.tag.woff2_index().is_some() {
            0
        } else {
            4
        };
        1 /* flags */ + tag_len + uint_base128_len(self.length)
    }

    fn write_woff2(&self, buffer: &mut Vec<u8>) {
        const NULL_TRANSFORM: u8 = 0b_1100_0000;

        if let Some(idx) = self.tag.woff2_index() {
            let flags = match self.tag {
                TableTag::GLYF | TableTag::LOCA => idx | NULL_TRANSFORM,
                _ => idx,
            };
            buffer.push(flags);
        } else {
            buffer.push(TableTag::WOFF2_ARBITRARY_TAG);
            buffer.extend_from_slice(&self.tag.0);
        }
        write_uint_base128(buffer, self.length);
    }
}

/// Writer of sfnt table data shared by OpenType and WOFF2 serialization.
#[derive(Debug, Clone)]
pub(crate) struct FontWriter {
    sfnt_version: u32,
    tables: Vec<TableRecord>,
    /// Contains *aligned* table data
    table_data: Vec<u8>,
}

impl FontWriter {
    const SFNT_HEADER_LEN: usize = 12;
    const WOFF2_HEADER_LEN: usize = 48;

    pub(crate) fn new(sfnt_version: u32) -> Self {
        Self {
            sfnt_version,
            tables: vec![],
            table_data: vec![],
        }
    }

    /// Copies all tables from OpenType font data. `loca` is placed immediately after `glyf`,
    /// which is required by WOFF2.
    pub(crate) fn from_sfnt(bytes: &[u8]) -> Result<Self, ParseError> {
        let directory = TableDirectory::parse(bytes)?;
        let mut this = Self::new(directory.sfnt_version);
        let loca = directory.table(TableTag::LOCA);
        for entry in &directory.entries {
            if entry.tag == TableTag::LOCA {
                continue;
            }
            this.copy_table(entry.tag, entry.data);
            if entry.tag == TableTag::GLYF {
                if let Some(loca) = loca {
                    this.copy_table(TableTag::LOCA, loca.bytes);
                }
            }
        }
        if directory.table(TableTag::GLYF).is_none() {
            if let Some(loca) = loca {
                this.copy_table(TableTag::LOCA, loca.bytes);
            }
        }
        Ok(this)
    }

    pub(crate) fn write_table<T>(
        &mut self,
        tag: TableTag,
        with: impl FnOnce(&mut Vec<u8>) -> T,
    ) -> T {
        let offset = self.table_data.len();
        debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");

        let output = with(&mut self.table_data);
        let length = self.table_data.len() - offset;
        // Pad the table heap to a 4-byte boundary.
        if length % 4 > 0 {
            let zero_padding = 4 - length % 4;
            self.table_data.extend(iter::repeat_n(0_u8, zero_padding));
        }

        let checksum = Font::checksum(&self.table_data[offset..]);
        self.tables.push(TableRecord {
            tag,
            checksum,
            offset: u32::try_from(offset).expect("table offset overflow"),
            length: u32::try_from(length).expect("table length overflow"),
        });
        output
    }

    pub(crate) fn write_raw_table(&mut self, tag: TableTag, content: &[u8]) {
        self.write_table(tag, |buffer| buffer.extend_from_slice(content));
    }

    /// Copies a table from another font, zeroing the checksum adjustment in `head`.
    pub(crate) fn copy_table(&mut self, tag: TableTag, content: &[u8]) {
        const ADJUSTMENT_RANGE: core::ops::Range<usize> =
            Font::HEAD_CHECKSUM_OFFSET..Font::HEAD_CHECKSUM_OFFSET + 4;

        self.write_table(tag, |buffer| {
            let start = buffer.len();
            buffer.extend_from_slice(content);
            if tag == TableTag::HEAD && content.len() >= ADJUSTMENT_RANGE.end {
                let adjustment_range = start + ADJUSTMENT_RANGE.start..start + ADJUSTMENT_RANGE.end;
                buffer[adjustment_range].copy_from_slice(&[0; 4]);
            }
        });
    }

    fn write_sfnt_header(&self) -> Vec<u8> {
        let mut buffer = vec![];
        write_u32(&mut buffer, self.sfnt_version);

        // `unwrap()`s are safe: there are at most 2^16 tables in a directory.
        let table_count = u16::try_from(self.tables.len()).unwrap();
        write_u16(&mut buffer, table_count);
        let entry_selector = u16::try_from(table_count.max(1).ilog2()).unwrap();
        let search_range = 1_u16 << (4 + entry_selector);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        let range_shift = (16 * table_count).saturating_sub(search_range);
        write_u16(&mut buffer, range_shift);

        debug_assert_eq!(buffer.len(), Self::SFNT_HEADER_LEN);
        buffer
    }

    /// Returns the starting offset of table data.
    fn data_offset(&self) -> usize {
        Self::SFNT_HEADER_LEN + self.tables.len() * TableRecord::BYTE_LEN
    }

    pub(crate) fn into_opentype(mut self) -> Vec<u8> {
        let mut buffer = self.write_sfnt_header();
        self.adjust_data(Font::checksum(&buffer));

        self.tables.sort_unstable_by_key(|record| record.tag.0);
        for record in &self.tables {
            record.write_opentype(&mut buffer);
        }
        buffer.extend(self.table_data);
        buffer
    }

    fn adjust_data(&mut self, sfnt_header_checksum: u32) {
        let data_offset = self.data_offset();
        let data_offset_u32 = u32::try_from(data_offset).expect("data_offset overflow");

        let mut file_checksum = sfnt_header_checksum;
        for record in &mut self.tables {
            record.offset += data_offset_u32;
            file_checksum = file_checksum
                .wrapping_add(record.self_checksum())
                .wrapping_add(record.checksum);
        }
        self.patch_head_table(file_checksum, data_offset);
    }

    fn checksum_adjustment_offset(&self) -> Option<usize> {
        let head_table = self
            .tables
            .iter()
            .find(|record| record.tag == TableTag::HEAD)?;
        if (head_table.length as usize) < Font::HEAD_CHECKSUM_OFFSET + 4 {
            return None;
        }
        Some(head_table.offset as usize + Font::HEAD_CHECKSUM_OFFSET)
    }

    fn patch_head_table(&mut self, file_checksum: u32, data_offset: usize) {
        let checksum_adjustment = Font::SFNT_CHECKSUM.wrapping_sub(file_checksum);
        let Some(offset) = self.checksum_adjustment_offset() else {
            log::warn!("font has no `head` table; skipping checksum adjustment");
            return;
        };
        // Table offsets already include the heap offset
        let offset = offset - data_offset;
        self.table_data[offset..offset + 4].copy_from_slice(&checksum_adjustment.to_be_bytes());
    }

    #[cfg(not(feature = "woff2"))]
    #[allow(clippy::unused_self)] // signature matches the Brotli-enabled version
    fn compress_data(&self) -> Result<Vec<u8>, Woff2Error> {
        Err(Woff2Error::CompressionUnavailable)
    }

    pub(crate) fn into_woff2(mut self) -> Result<Vec<u8>, Woff2Error> {
        self.adjust_data(Font::checksum(&self.write_sfnt_header()));

        let compressed_data = self.compress_data()?;
        let tables_len = self
            .tables
            .iter()
            .map(TableRecord::woff2_len)
            .sum::<usize>();
        let mut file_len = Self::WOFF2_HEADER_LEN + tables_len + compressed_data.len();
        if file_len % 4 != 0 {
            file_len += 4 - file_len % 4;
        }

        let mut buffer = vec![];
        write_u32(&mut buffer, Font::WOFF2_SIGNATURE);
        write_u32(&mut buffer, self.sfnt_version);
        write_u32(
            &mut buffer,
            file_len.try_into().expect("file length overflow"),
        );
        // `unwrap()` is safe: there are at most 2^16 tables in a directory
        write_u16(&mut buffer, self.tables.len().try_into().unwrap());
        write_u16(&mut buffer, 0); // reserved

        let decompressed_len = self.data_offset() + self.table_data.len();
        // `unwrap`s are safe, since `file_len` fits into u32.
        write_u32(&mut buffer, decompressed_len.try_into().unwrap());
        write_u32(&mut buffer, compressed_data.len().try_into().unwrap());
        write_u32(&mut buffer, 0); // WOFF version
        write_u32(&mut buffer, 0); // metadata offset
        write_u32(&mut buffer, 0); // metadata length
        write_u32(&mut buffer, 0); // original metadata length
        write_u32(&mut buffer, 0); // private block offset
        write_u32(&mut buffer, 0); // private block length
        debug_assert_eq!(buffer.len(), Self::WOFF2_HEADER_LEN);

        for record in &self.tables {
            record.write_woff2(&mut buffer);
        }
        debug_assert_eq!(buffer.len(), Self::WOFF2_HEADER_LEN + tables_len);
        buffer.extend(compressed_data);

        // The WOFF2 file length must be a multiple of 4
        if buffer.len() % 4 != 0 {
            let padding = 4 - buffer.len() % 4;
            buffer.extend(iter::repeat_n(0, padding));
        }
        debug_assert_eq!(file_len, buffer.len());
        Ok(buffer)
    }
}

/// Converts an OpenType font to the WOFF2 format without subsetting it.
///
/// All tables are copied as-is, without WOFF2 transforms. The `head` checksum adjustment
/// is recomputed.
///
/// # Errors
///
/// Returns an error if the font table directory cannot be parsed, or if Brotli compression
/// is not available (see [`FontSubset::to_woff2()`]).
pub fn woff2_from_truetype(bytes: &[u8]) -> Result<Vec<u8>, Woff2Error> {
    FontWriter::from_sfnt(bytes)?.into_woff2()
}

impl Glyph<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        match self {
            Self::Empty => { /* do nothing */ }
            Self::Simple(glyph) => {
                writer.extend_from_slice(glyph.raw);
            }
            Self::Composite(glyph) => {
                write_u16(writer, u16::MAX); // numberOfContours = -1
                writer.extend_from_slice(&glyph.header);
                for component in &glyph.components {
                    component.write(writer);
                }
                writer.extend_from_slice(glyph.instructions);
            }
        }
    }
}

impl GlyphComponent {
    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, self.flags);
        write_u16(writer, self.glyph_idx);
        match self.args {
            GlyphComponentArgs::U16(args) => write_u16(writer, args),
            GlyphComponentArgs::U32(args) => write_u32(writer, args),
        }
        match self.transform {
            TransformData::None => { /* do nothing */ }
            TransformData::Scale(val) => write_u16(writer, val),
            TransformData::TwoScales([x, y]) => {
                write_u16(writer, x);
                write_u16(writer, y);
            }
            TransformData::Affine([xx, xy, yx, yy]) => {
                write_u16(writer, xx);
                write_u16(writer, xy);
                write_u16(writer, yx);
                write_u16(writer, yy);
            }
        }
    }
}
