//! `cmap` table processing.

use super::Cursor;
use crate::{alloc::Vec, errors::ParseErrorKind, ParseError};

#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentWithDelta {
    pub(crate) start_code: u16,
    pub(crate) end_code: u16,
    pub(crate) id_delta: u16,
    pub(crate) id_range_offset: u16,
}

/// Segment mapping to delta values (format 4) subtable of the `cmap` table.
#[derive(Debug, Clone)]
pub(crate) struct SegmentDeltas<'a> {
    pub(crate) segments: Vec<SegmentWithDelta>,
    pub(crate) glyph_id_array: &'a [u8],
}

impl<'a> SegmentDeltas<'a> {
    pub(crate) const FORMAT: u16 = 4;

    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        cursor.read_u16_checked(|format| {
            if format != Self::FORMAT {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;

        let remaining_len = cursor.read_u16_checked(|subtable_len| {
            Ok(subtable_len
                .checked_sub(4)
                .ok_or(ParseErrorKind::UnexpectedEof)? as usize)
        })?;
        cursor = cursor.range(0..remaining_len)?;

        cursor.skip(2)?; // language
        let segment_count = cursor.read_u16()? / 2;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let vec_len = 2 * usize::from(segment_count);
        let mut end_codes = cursor.split_at(vec_len)?;
        cursor.skip(2)?; // reserved padding
        let mut start_codes = cursor.split_at(vec_len)?;
        let mut id_deltas = cursor.split_at(vec_len)?;
        let mut id_range_offsets = cursor.split_at(vec_len)?;

        let segments = (0..segment_count).map(|_| {
            let segment = SegmentWithDelta {
                start_code: start_codes.read_u16()?,
                end_code: end_codes.read_u16()?,
                id_delta: id_deltas.read_u16()?,
                id_range_offset: id_range_offsets.read_u16()?,
            };
            if segment.start_code > segment.end_code {
                let range = usize::from(segment.start_code)..usize::from(segment.end_code);
                return Err(start_codes.err(ParseErrorKind::RangeOutOfBounds {
                    range,
                    len: usize::from(u16::MAX),
                }));
            }
            Ok(segment)
        });
        let this = Self {
            segments: segments.collect::<Result<_, ParseError>>()?,
            glyph_id_array: cursor.bytes,
        };
        this.validate_range_offsets(cursor)?;
        Ok(this)
    }

    /// Checks that all `idRangeOffset`s point inside `glyphIdArray`, so that lookups
    /// are infallible.
    fn validate_range_offsets(&self, glyph_ids: Cursor<'_>) -> Result<(), ParseError> {
        for (segment_idx, segment) in self.segments.iter().enumerate() {
            if segment.id_range_offset == 0 {
                continue;
            }
            let span = segment.end_code - segment.start_code;
            let start = self.glyph_id_offset(segment_idx, 0);
            let end = self.glyph_id_offset(segment_idx, span).map(|offset| offset + 2);
            let (Some(start), Some(end)) = (start, end) else {
                return Err(glyph_ids.err(ParseErrorKind::OffsetOutOfBounds(usize::from(
                    segment.id_range_offset,
                ))));
            };
            if end > self.glyph_id_array.len() {
                return Err(glyph_ids.err(ParseErrorKind::RangeOutOfBounds {
                    range: start..end,
                    len: self.glyph_id_array.len(),
                }));
            }
        }
        Ok(())
    }

    /// Computes the offset of the glyph ID in `glyphIdArray` for a segment with a non-zero
    /// `idRangeOffset`.
    fn glyph_id_offset(&self, segment_idx: usize, code_offset: u16) -> Option<usize> {
        let segment = &self.segments[segment_idx];
        // Offset is counted from the position of `idRangeOffset[segment_idx]`
        let mut byte_offset = 2 * segment_idx;
        byte_offset += usize::from(segment.id_range_offset);
        byte_offset += 2 * usize::from(code_offset);
        // Shift the offset to count from the start of `glyphIdArray`
        byte_offset.checked_sub(2 * self.segments.len())
    }

    fn map_char(&self, ch: char) -> u16 {
        let Ok(c) = u16::try_from(u32::from(ch)) else {
            return 0; // chars outside BMP are not covered
        };

        let segment_idx = self
            .segments
            .binary_search_by_key(&c, |segment| segment.end_code)
            .unwrap_or_else(|pos| pos);
        let Some(segment) = self.segments.get(segment_idx) else {
            return 0;
        };
        if segment.start_code > c {
            return 0; // missing glyph
        }

        if segment.id_range_offset == 0 {
            segment.id_delta.wrapping_add(c)
        } else {
            let offset = self
                .glyph_id_offset(segment_idx, c - segment.start_code)
                .unwrap_or(usize::MAX);
            let Some(&[hi, lo]) = self.glyph_id_array.get(offset..offset.saturating_add(2)) else {
                return 0; // doesn't happen for validated tables
            };
            let glyph_id = u16::from_be_bytes([hi, lo]);
            if glyph_id == 0 {
                0
            } else {
                segment.id_delta.wrapping_add(glyph_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SequentialMapGroup {
    pub(crate) start_char_code: u32,
    pub(crate) end_char_code: u32,
    pub(crate) start_glyph_id: u32,
}

impl SequentialMapGroup {
    pub(crate) fn map_unchecked(&self, ch: char) -> u32 {
        u32::from(ch) - self.start_char_code + self.start_glyph_id
    }
}

/// Segmented coverage (format 12) subtable of the `cmap` table.
#[derive(Debug, Default, Clone)]
pub(crate) struct SegmentedCoverage {
    pub(crate) groups: Vec<SequentialMapGroup>,
}

impl SegmentedCoverage {
    pub(crate) const FORMAT: u16 = 12;

    fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        cursor.read_u16_checked(|format| {
            if format != Self::FORMAT {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;

        cursor.skip(2)?; // reserved

        let remaining_len = cursor.read_u32_checked(|subtable_len| {
            Ok(subtable_len
                .checked_sub(8)
                .ok_or(ParseErrorKind::UnexpectedEof)? as usize)
        })?;
        cursor = cursor.range(0..remaining_len)?;

        cursor.skip(4)?; // language
        let num_groups = cursor.read_u32_checked(|num_groups| {
            // Each group takes 12 bytes; `remaining_len` includes `language` and `numGroups` fields
            let expected_len = 8 + 12 * num_groups as usize;
            if expected_len > remaining_len {
                return Err(ParseErrorKind::UnexpectedTableLen {
                    expected: expected_len,
                    actual: remaining_len,
                });
            }
            Ok(num_groups)
        })?;
        let groups = (0..num_groups).map(|_| {
            let group_cursor = cursor;
            let group = SequentialMapGroup {
                start_char_code: cursor.read_u32()?,
                end_char_code: cursor.read_u32()?,
                start_glyph_id: cursor.read_u32()?,
            };
            let last_glyph_id = group
                .end_char_code
                .checked_sub(group.start_char_code)
                .and_then(|span| span.checked_add(group.start_glyph_id));
            match last_glyph_id {
                None => Err(group_cursor.err(ParseErrorKind::RangeOutOfBounds {
                    range: group.start_char_code as usize..group.end_char_code as usize,
                    len: char::MAX as usize,
                })),
                Some(glyph_idx) if glyph_idx > u32::from(u16::MAX) => {
                    Err(group_cursor.err(ParseErrorKind::GlyphOutOfRange {
                        glyph_idx,
                        glyph_count: u16::MAX,
                    }))
                }
                Some(_) => Ok(group),
            }
        });

        Ok(Self {
            groups: groups.collect::<Result<_, ParseError>>()?,
        })
    }

    #[allow(clippy::cast_possible_truncation)] // glyph IDs are checked when parsing
    fn map_char(&self, ch: char) -> u16 {
        let ch = u32::from(ch);
        let group_idx = self
            .groups
            .binary_search_by_key(&ch, |group| group.end_char_code)
            .unwrap_or_else(|pos| pos);
        let Some(group) = self.groups.get(group_idx) else {
            return 0; // `ch` exceeds `end_char_code` for the last segment
        };
        if group.start_char_code > ch {
            return 0; // missing glyph
        }
        (ch - group.start_char_code + group.start_glyph_id) as u16
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CmapTable<'a> {
    Deltas(SegmentDeltas<'a>),
    Coverage(SegmentedCoverage),
}

impl<'a> CmapTable<'a> {
    pub(crate) const UNICODE_PLATFORM: u16 = 0;
    pub(crate) const WINDOWS_PLATFORM: u16 = 3;
    pub(crate) const UNICODE_BMP_ENCODING: u16 = 3;
    pub(crate) const UNICODE_FULL_ENCODING: u16 = 4;
    pub(crate) const WINDOWS_BMP_ENCODING: u16 = 1;
    pub(crate) const WINDOWS_FULL_ENCODING: u16 = 10;
    /// Unicode variation sequences; uses format 14, which cannot map chars on its own.
    const UNICODE_VARIATIONS_ENCODING: u16 = 5;

    /// Ranks an encoding record; higher is better. `None` means the record is not usable.
    fn rank(platform_id: u16, encoding_id: u16, format: u16) -> Option<u8> {
        let is_unicode = match (platform_id, encoding_id) {
            (Self::UNICODE_PLATFORM, Self::UNICODE_VARIATIONS_ENCODING) => return None,
            (Self::UNICODE_PLATFORM, _) => true,
            (Self::WINDOWS_PLATFORM, Self::WINDOWS_BMP_ENCODING | Self::WINDOWS_FULL_ENCODING) => {
                false
            }
            _ => return None,
        };
        let coverage_rank = match format {
            SegmentDeltas::FORMAT => 0,
            SegmentedCoverage::FORMAT => 2,
            _ => return None,
        };
        Some(coverage_rank + u8::from(is_unicode))
    }

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let table_cursor = cursor;
        cursor.read_u16_checked(|version| {
            if version != 0 {
                return Err(ParseErrorKind::UnexpectedTableVersion(version.into()));
            }
            Ok(())
        })?;

        let num_tables = cursor.read_u16()?;
        let mut best: Option<(u8, Cursor<'a>)> = None;
        for _ in 0..num_tables {
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let subtable = table_cursor.at(cursor.read_u32()? as usize)?;
            let format = { subtable }.read_u16()?;

            let Some(rank) = Self::rank(platform_id, encoding_id, format) else {
                continue; // unsupported encoding or subtable format
            };
            if best.is_none_or(|(best_rank, _)| rank > best_rank) {
                best = Some((rank, subtable));
            }
        }

        let (_, subtable) = best.ok_or_else(|| cursor.err(ParseErrorKind::NoSupportedCmap))?;
        let mut format_cursor = subtable;
        Ok(match format_cursor.read_u16()? {
            SegmentDeltas::FORMAT => {
                log::debug!("using format 4 `cmap` subtable");
                Self::Deltas(SegmentDeltas::parse(subtable)?)
            }
            _ => {
                log::debug!("using format 12 `cmap` subtable");
                Self::Coverage(SegmentedCoverage::parse(subtable)?)
            }
        })
    }

    /// Maps a char to a glyph index; returns 0 for unmapped chars.
    pub(crate) fn map_char(&self, ch: char) -> u16 {
        match self {
            Self::Deltas(deltas) => deltas.map_char(ch),
            Self::Coverage(coverage) => coverage.map_char(ch),
        }
    }
}
