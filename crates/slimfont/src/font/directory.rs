//! sfnt header and table directory.

use super::{Cursor, Font, TableTag};
use crate::{alloc::Vec, errors::ParseErrorKind, ParseError};

/// Entry in the table directory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TableEntry<'a> {
    pub(crate) tag: TableTag,
    pub(crate) data: &'a [u8],
}

/// Table directory of an sfnt font.
#[derive(Debug)]
pub(crate) struct TableDirectory<'a> {
    pub(crate) sfnt_version: u32,
    pub(crate) entries: Vec<TableEntry<'a>>,
}

impl<'a> TableDirectory<'a> {
    const HEADER_LEN: usize = 12;
    const RECORD_LEN: usize = 16;

    pub(crate) fn parse(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(bytes);
        let sfnt_version = cursor.read_u32_checked(|version| match version {
            Font::SFNT_VERSION | Font::APPLE_SFNT_VERSION | Font::CFF_SFNT_VERSION => Ok(version),
            Font::WOFF_SIGNATURE | Font::WOFF2_SIGNATURE => {
                Err(ParseErrorKind::CompressedContainer)
            }
            _ => Err(ParseErrorKind::UnexpectedFontVersion),
        })?;
        let table_count = cursor.read_u16_checked(|count| {
            let records_end = Self::HEADER_LEN + Self::RECORD_LEN * usize::from(count);
            if records_end > bytes.len() {
                return Err(ParseErrorKind::UnexpectedTableLen {
                    expected: records_end,
                    actual: bytes.len(),
                });
            }
            Ok(count)
        })?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut entries = Vec::with_capacity(usize::from(table_count));
        for _ in 0..table_count {
            let tag = TableTag(cursor.read_byte_array()?);
            cursor.skip(4)?; // checksum; recomputed on output
            let record_start = cursor;
            let offset = cursor.read_u32()? as usize;
            let len = cursor.read_u32()? as usize;
            let range = offset..offset.saturating_add(len);
            let data = bytes.get(range.clone()).ok_or_else(|| {
                record_start.err(ParseErrorKind::RangeOutOfBounds {
                    range,
                    len: bytes.len(),
                })
            })?;

            if entries.iter().any(|entry: &TableEntry<'_>| entry.tag == tag) {
                log::warn!("duplicate `{tag}` table record; using the first one");
                continue;
            }
            entries.push(TableEntry { tag, data });
        }

        Ok(Self {
            sfnt_version,
            entries,
        })
    }

    pub(crate) fn table(&self, tag: TableTag) -> Option<Cursor<'a>> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| Cursor::for_table(tag, entry.data))
    }
}
