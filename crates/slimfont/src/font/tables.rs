//! Decoders for fixed-layout tables: `head`, `hhea`, `hmtx`, `maxp`, `loca` and `OS/2`.

use core::ops;

use super::Cursor;
use crate::{errors::ParseErrorKind, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    const fn bytes_per_offset(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HeadTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) units_per_em: u16,
    pub(crate) loca_format: LocaFormat,
}

impl<'a> HeadTable<'a> {
    pub(crate) const EXPECTED_LEN: usize = 54;
    pub(crate) const LOCA_FORMAT_OFFSET: usize = 50;
    const MAGIC: u32 = 0x_5f0f_3cf5;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        if raw.len() < Self::EXPECTED_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::EXPECTED_LEN,
                actual: raw.len(),
            }));
        }

        cursor.read_u32_checked(|version| {
            if version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion(version));
            }
            Ok(())
        })?;
        cursor.skip(8)?; // fontRevision, checksumAdjustment
        cursor.read_u32_checked(|magic| {
            if magic != Self::MAGIC {
                return Err(ParseErrorKind::UnexpectedMagic(magic));
            }
            Ok(())
        })?;
        cursor.skip(2)?; // flags
        let units_per_em = cursor.read_u16()?;
        cursor.skip(Self::LOCA_FORMAT_OFFSET - 20)?;
        // ^ created, modified, bounding box, macStyle, lowestRecPPEM, fontDirectionHint

        let loca_format = cursor.read_u16_checked(|format| match format {
            0 => Ok(LocaFormat::Short),
            1 => Ok(LocaFormat::Long),
            _ => Err(ParseErrorKind::UnexpectedTableFormat(format)),
        })?;

        Ok(Self {
            raw,
            units_per_em,
            loca_format,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HheaTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) ascender: i16,
    pub(crate) descender: i16,
    pub(crate) number_of_h_metrics: u16,
}

impl<'a> HheaTable<'a> {
    pub(crate) const EXPECTED_LEN: usize = 36; // 18 words

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        if raw.len() != Self::EXPECTED_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::EXPECTED_LEN,
                actual: raw.len(),
            }));
        }
        cursor.skip(4)?; // version
        let ascender = cursor.read_i16()?;
        let descender = cursor.read_i16()?;
        cursor.skip(Self::EXPECTED_LEN - 10)?;
        let number_of_h_metrics = cursor.read_u16()?;
        Ok(Self {
            raw,
            ascender,
            descender,
            number_of_h_metrics,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MaxpTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) glyph_count: u16,
}

impl<'a> MaxpTable<'a> {
    pub(crate) const VERSION_0_5: u32 = 0x_0000_5000;
    pub(crate) const VERSION_1_0: u32 = 0x_0001_0000;
    pub(crate) const V1_LEN: usize = 32;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        let version = cursor.read_u32_checked(|version| match version {
            Self::VERSION_0_5 | Self::VERSION_1_0 => Ok(version),
            _ => Err(ParseErrorKind::UnexpectedTableVersion(version)),
        })?;
        let glyph_count = cursor.read_u16()?;

        if version == Self::VERSION_1_0 && raw.len() < Self::V1_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::V1_LEN,
                actual: raw.len(),
            }));
        }
        Ok(Self { raw, glyph_count })
    }

    pub(crate) fn has_v1_fields(&self) -> bool {
        self.raw.len() >= Self::V1_LEN && self.raw[..4] == Self::VERSION_1_0.to_be_bytes()
    }
}

#[derive(Debug)]
pub(crate) struct HmtxTable<'a> {
    cursor: Cursor<'a>,
    number_of_h_metrics: u16,
}

impl<'a> HmtxTable<'a> {
    pub(crate) fn parse(
        cursor: Cursor<'a>,
        number_of_h_metrics: u16,
        glyph_count: u16,
    ) -> Result<Self, ParseError> {
        if number_of_h_metrics == 0 || number_of_h_metrics > glyph_count {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: usize::from(glyph_count),
                actual: usize::from(number_of_h_metrics),
            }));
        }
        let expected_len = 4 * usize::from(number_of_h_metrics)
            + 2 * usize::from(glyph_count - number_of_h_metrics);
        if cursor.len() < expected_len {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: expected_len,
                actual: cursor.len(),
            }));
        }
        Ok(Self {
            cursor,
            number_of_h_metrics,
        })
    }

    pub(crate) fn advance_and_lsb(&self, glyph_idx: u16) -> Result<(u16, i16), ParseError> {
        if glyph_idx < self.number_of_h_metrics {
            let mut cursor = self.cursor.at(usize::from(glyph_idx) * 4)?;
            Ok((cursor.read_u16()?, cursor.read_i16()?))
        } else {
            let advance_offset = usize::from(self.number_of_h_metrics - 1) * 4;
            let advance = self.cursor.at(advance_offset)?.read_u16()?;
            let lsb_offset = usize::from(self.number_of_h_metrics) * 4
                + usize::from(glyph_idx - self.number_of_h_metrics) * 2;
            let lsb = self.cursor.at(lsb_offset)?.read_i16()?;
            Ok((advance, lsb))
        }
    }
}

#[derive(Debug)]
pub(crate) struct LocaTable<'a> {
    format: LocaFormat,
    cursor: Cursor<'a>,
}

impl<'a> LocaTable<'a> {
    pub(crate) fn new(
        format: LocaFormat,
        glyph_count: u16,
        cursor: Cursor<'a>,
    ) -> Result<Self, ParseError> {
        let expected_len = format.bytes_per_offset() * (usize::from(glyph_count) + 1);
        // Some fonts have trailing data in `loca`; it is ignored.
        if cursor.len() < expected_len {
            Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: expected_len,
                actual: cursor.len(),
            }))
        } else {
            Ok(Self { format, cursor })
        }
    }

    pub(crate) fn glyph_range(&self, glyph_idx: u16) -> Result<ops::Range<usize>, ParseError> {
        let bytes_per_offset = self.format.bytes_per_offset();
        let mut cursor = self.cursor.at(usize::from(glyph_idx) * bytes_per_offset)?;
        let entry_cursor = cursor;
        let (start, end) = match self.format {
            LocaFormat::Short => (
                usize::from(cursor.read_u16()?) * 2,
                usize::from(cursor.read_u16()?) * 2,
            ),
            LocaFormat::Long => (cursor.read_u32()? as usize, cursor.read_u32()? as usize),
        };
        if start > end {
            return Err(entry_cursor.err(ParseErrorKind::RangeOutOfBounds {
                range: start..end,
                len: end,
            }));
        }
        Ok(start..end)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Os2Table<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) weight_class: u16,
}

impl<'a> Os2Table<'a> {
    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        cursor.read_u16_checked(|version| {
            if version > 5 {
                return Err(ParseErrorKind::UnexpectedTableVersion(version.into()));
            }
            Ok(())
        })?;
        cursor.skip(2)?; // xAvgCharWidth
        let weight_class = cursor.read_u16()?;
        Ok(Self { raw, weight_class })
    }
}
