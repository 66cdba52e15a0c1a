//! `name` table processing.

use super::Cursor;
use crate::{
    alloc::{String, Vec},
    errors::ParseErrorKind,
    ParseError,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct NameRecord<'a> {
    pub(crate) platform_id: u16,
    pub(crate) encoding_id: u16,
    pub(crate) language_id: u16,
    pub(crate) name_id: u16,
    pub(crate) value: &'a [u8],
}

/// Chars for Mac Roman bytes `0x80..=0xff`; the lower half coincides with ASCII.
const MAC_ROMAN_HIGH_HALF: &str = "\
    ÄÅÇÉÑÖÜáàâäãåçéèêëíìîïñóòôöõúùûü\
    †°¢£§•¶ß®©™´¨≠ÆØ∞±≤≥¥µ∂∑∏π∫ªºΩæø\
    ¿¡¬√ƒ≈∆«»…\u{a0}ÀÃÕŒœ–—“”‘’÷◊ÿŸ⁄€‹›ﬁﬂ\
    ‡·‚„‰ÂÊÁËÈÍÎÏÌÓÔ\u{f8ff}ÒÚÛÙıˆ˜¯˘˙˚¸˝˛ˇ";

fn decode_mac_roman(byte: u8) -> char {
    if byte.is_ascii() {
        char::from(byte)
    } else {
        MAC_ROMAN_HIGH_HALF
            .chars()
            .nth(usize::from(byte - 0x80))
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl NameRecord<'_> {
    const UNICODE_PLATFORM: u16 = 0;
    const MAC_PLATFORM: u16 = 1;
    const WINDOWS_PLATFORM: u16 = 3;
    const MAC_ROMAN_ENCODING: u16 = 0;
    const WINDOWS_BMP_ENCODING: u16 = 1;
    const WINDOWS_FULL_ENCODING: u16 = 10;
    const WINDOWS_ENGLISH_US: u16 = 0x0409;

    /// Ranks the record as a source of the family name; higher is better.
    fn rank(&self) -> Option<u8> {
        match (self.platform_id, self.encoding_id) {
            (Self::WINDOWS_PLATFORM, Self::WINDOWS_BMP_ENCODING | Self::WINDOWS_FULL_ENCODING) => {
                Some(if self.language_id == Self::WINDOWS_ENGLISH_US {
                    3
                } else {
                    2
                })
            }
            (Self::UNICODE_PLATFORM, _) => Some(2),
            (Self::MAC_PLATFORM, Self::MAC_ROMAN_ENCODING) => Some(1),
            _ => None,
        }
    }

    fn decode(&self) -> String {
        if self.platform_id == Self::MAC_PLATFORM {
            return self.value.iter().copied().map(decode_mac_roman).collect();
        }

        let units = self
            .value
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]));
        char::decode_utf16(units)
            .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// Naming table. Its raw bytes are carried to subsets unchanged.
#[derive(Debug, Clone)]
pub(crate) struct NameTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) records: Vec<NameRecord<'a>>,
}

impl<'a> NameTable<'a> {
    const FAMILY_NAME_ID: u16 = 1;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let table_cursor = cursor;
        cursor.read_u16_checked(|format| {
            if format > 1 {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;
        let count = cursor.read_u16()?;
        let storage = table_cursor.at(usize::from(cursor.read_u16()?))?;

        let records = (0..count).map(|_| {
            let record_cursor = cursor;
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let language_id = cursor.read_u16()?;
            let name_id = cursor.read_u16()?;
            let len = usize::from(cursor.read_u16()?);
            let offset = usize::from(cursor.read_u16()?);
            let value = storage.bytes.get(offset..offset + len).ok_or_else(|| {
                record_cursor.err(ParseErrorKind::RangeOutOfBounds {
                    range: offset..offset + len,
                    len: storage.len(),
                })
            })?;
            Ok(NameRecord {
                platform_id,
                encoding_id,
                language_id,
                name_id,
                value,
            })
        });

        Ok(Self {
            raw: table_cursor.bytes,
            records: records.collect::<Result<_, ParseError>>()?,
        })
    }

    pub(crate) fn family_name(&self) -> Option<String> {
        let mut best: Option<(u8, &NameRecord<'_>)> = None;
        let family_records = self
            .records
            .iter()
            .filter(|record| record.name_id == Self::FAMILY_NAME_ID);
        for record in family_records {
            let Some(rank) = record.rank() else {
                continue;
            };
            if best.is_none_or(|(best_rank, _)| rank > best_rank) {
                best = Some((rank, record));
            }
        }
        best.map(|(_, record)| record.decode())
    }
}
