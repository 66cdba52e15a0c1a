//! `post` table processing.

use super::Cursor;
use crate::{alloc::Vec, errors::ParseErrorKind, ParseError};

/// Glyph names from a version 1.0 or 2.0 `post` table.
#[derive(Debug, Clone)]
pub(crate) struct PostGlyphNames<'a> {
    /// Name index for each glyph. Indices below 258 refer to standard Macintosh names.
    pub(crate) indices: Vec<u16>,
    /// Custom names as Pascal strings without the length byte.
    pub(crate) names: Vec<&'a [u8]>,
}

impl PostGlyphNames<'_> {
    pub(crate) const STANDARD_NAME_COUNT: u16 = 258;
}

#[derive(Debug, Clone)]
pub(crate) struct PostTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) version: u32,
    pub(crate) glyph_names: Option<PostGlyphNames<'a>>,
}

impl<'a> PostTable<'a> {
    pub(crate) const VERSION_1_0: u32 = 0x_0001_0000;
    pub(crate) const VERSION_2_0: u32 = 0x_0002_0000;
    pub(crate) const VERSION_3_0: u32 = 0x_0003_0000;
    pub(crate) const HEADER_LEN: usize = 32;

    pub(crate) fn parse(mut cursor: Cursor<'a>, glyph_count: u16) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        if raw.len() < Self::HEADER_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::HEADER_LEN,
                actual: raw.len(),
            }));
        }
        let version = cursor.read_u32()?;
        cursor.skip(Self::HEADER_LEN - 4)?;

        let glyph_names = match version {
            Self::VERSION_1_0 => Some(PostGlyphNames {
                indices: (0..glyph_count.min(PostGlyphNames::STANDARD_NAME_COUNT)).collect(),
                names: Vec::new(),
            }),
            Self::VERSION_2_0 => Some(Self::parse_names(cursor, glyph_count)?),
            _ => {
                if version != Self::VERSION_3_0 {
                    log::debug!("`post` table version {version:#x} will be rewritten as 3.0");
                }
                None
            }
        };
        Ok(Self {
            raw,
            version,
            glyph_names,
        })
    }

    fn parse_names(
        mut cursor: Cursor<'a>,
        glyph_count: u16,
    ) -> Result<PostGlyphNames<'a>, ParseError> {
        let name_count = cursor.read_u16_checked(|count| {
            if count != glyph_count {
                return Err(ParseErrorKind::UnexpectedTableLen {
                    expected: glyph_count.into(),
                    actual: count.into(),
                });
            }
            Ok(count)
        })?;
        let mut index_cursor = cursor.split_at(2 * usize::from(name_count))?;
        let indices: Vec<_> = (0..name_count)
            .map(|_| index_cursor.read_u16())
            .collect::<Result<_, _>>()?;

        let mut names = Vec::new();
        while !cursor.is_empty() {
            let len = cursor.read_u8()?;
            names.push(cursor.split_at(len.into())?.bytes);
        }

        let max_custom_idx = indices
            .iter()
            .filter_map(|&idx| idx.checked_sub(PostGlyphNames::STANDARD_NAME_COUNT))
            .max();
        if let Some(max_idx) = max_custom_idx {
            if usize::from(max_idx) >= names.len() {
                return Err(cursor.err(ParseErrorKind::OffsetOutOfBounds(max_idx.into())));
            }
        }
        Ok(PostGlyphNames { indices, names })
    }
}
