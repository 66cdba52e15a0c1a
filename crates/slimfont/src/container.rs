//! Unwrapping of WOFF and WOFF2 containers into plain OpenType data.

use crate::{
    alloc::{Cow, Vec},
    errors::ParseErrorKind,
    font::Cursor,
    write::FontWriter,
    Font, ParseError, TableTag,
};

/// Decodes font data that may be wrapped in a WOFF 1.0 or WOFF2 container.
///
/// OpenType data is returned as-is. Container tables are decompressed and re-serialized
/// as an OpenType font with recomputed checksums.
///
/// # Errors
///
/// Returns an error if the container is malformed, a table cannot be decompressed, or
/// the WOFF2 data uses table transforms (other than the null transform) or is a font collection.
/// Without the `woff2` crate feature, WOFF2 data results in a
/// [`Decompression`](ParseErrorKind::Decompression) error.
pub fn decode_container(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    let signature = Cursor::new(bytes).read_u32()?;
    match signature {
        Font::WOFF_SIGNATURE => {
            log::debug!("decoding WOFF container ({} bytes)", bytes.len());
            decode_woff(bytes).map(Cow::Owned)
        }
        Font::WOFF2_SIGNATURE => {
            log::debug!("decoding WOFF2 container ({} bytes)", bytes.len());
            decode_woff2(bytes).map(Cow::Owned)
        }
        _ => Ok(Cow::Borrowed(bytes)),
    }
}

fn check_flavor(flavor: u32) -> Result<u32, ParseErrorKind> {
    const COLLECTION_FLAVOR: u32 = u32::from_be_bytes(*b"ttcf");

    match flavor {
        Font::SFNT_VERSION | Font::APPLE_SFNT_VERSION | Font::CFF_SFNT_VERSION => Ok(flavor),
        COLLECTION_FLAVOR => Err(ParseErrorKind::UnsupportedTransform),
        _ => Err(ParseErrorKind::UnexpectedFontVersion),
    }
}

fn decode_woff(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    const HEADER_LEN: usize = 44;

    let mut cursor = Cursor::new(bytes);
    cursor.skip(4)?; // signature
    let flavor = cursor.read_u32_checked(check_flavor)?;
    cursor.skip(4)?; // length
    let table_count = cursor.read_u16()?;
    cursor.skip(HEADER_LEN - 14)?;
    // ^ reserved, totalSfntSize, version, metadata and private data blocks

    let mut writer = FontWriter::new(flavor);
    for _ in 0..table_count {
        let tag = TableTag(cursor.read_byte_array()?);
        let entry_cursor = cursor;
        let offset = cursor.read_u32()? as usize;
        let compressed_len = cursor.read_u32()? as usize;
        let original_len = cursor.read_u32()? as usize;
        cursor.skip(4)?; // origChecksum; recomputed on output

        let range = offset..offset.saturating_add(compressed_len);
        let data = Cursor::new(bytes).range(range)?.bytes;
        if compressed_len > original_len {
            return Err(entry_cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: original_len,
                actual: compressed_len,
            }));
        } else if compressed_len == original_len {
            writer.copy_table(tag, data);
        } else {
            let inflated = miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(
                data,
                original_len,
            )
            .map_err(|err| {
                log::warn!("failed inflating `{tag}` table: {err:?}");
                entry_cursor.err(ParseErrorKind::Decompression)
            })?;
            if inflated.len() != original_len {
                return Err(entry_cursor.err(ParseErrorKind::UnexpectedTableLen {
                    expected: original_len,
                    actual: inflated.len(),
                }));
            }
            writer.copy_table(tag, &inflated);
        }
    }
    Ok(writer.into_opentype())
}

#[cfg(feature = "woff2")]
fn decode_woff2(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    const HEADER_LEN: usize = 48;
    const NULL_TRANSFORM_VERSION: u8 = 3;

    let mut cursor = Cursor::new(bytes);
    cursor.skip(4)?; // signature
    let flavor = cursor.read_u32_checked(check_flavor)?;
    cursor.skip(4)?; // length
    let table_count = cursor.read_u16()?;
    cursor.skip(2)?; // reserved
    let total_sfnt_size = cursor.read_u32()? as usize;
    let compressed_len = cursor.read_u32()? as usize;
    cursor.skip(HEADER_LEN - 24)?;
    // ^ version, metadata and private data blocks

    let mut tables = Vec::with_capacity(usize::from(table_count));
    let mut decompressed_len = 0_usize;
    for _ in 0..table_count {
        let entry_cursor = cursor;
        let flags = cursor.read_u8()?;
        let tag_idx = flags & 0x3f;
        let tag = if tag_idx == TableTag::WOFF2_ARBITRARY_TAG {
            TableTag(cursor.read_byte_array()?)
        } else {
            TableTag::from_woff2_index(tag_idx).ok_or_else(|| {
                entry_cursor.err(ParseErrorKind::UnexpectedTableFormat(tag_idx.into()))
            })?
        };
        let transform_version = flags >> 6;
        let is_transformed = match tag {
            TableTag::GLYF | TableTag::LOCA => transform_version != NULL_TRANSFORM_VERSION,
            _ => transform_version != 0,
        };
        if is_transformed {
            log::warn!("`{tag}` table uses WOFF2 transform {transform_version}");
            return Err(entry_cursor.err(ParseErrorKind::UnsupportedTransform));
        }

        let len = cursor.read_uint_base128()? as usize;
        // Tables cannot take more space than the entire OpenType font
        let tables_end = decompressed_len
            .checked_add(len)
            .filter(|&end| end <= total_sfnt_size)
            .ok_or_else(|| {
                entry_cursor.err(ParseErrorKind::UnexpectedTableLen {
                    expected: total_sfnt_size,
                    actual: decompressed_len.saturating_add(len),
                })
            })?;
        tables.push((tag, decompressed_len..tables_end));
        decompressed_len = tables_end;
    }

    let compressed = cursor.split_at(compressed_len)?;
    let data = crate::write::brotli::decompress(compressed.bytes, decompressed_len)
        .ok_or_else(|| compressed.err(ParseErrorKind::Decompression))?;

    let mut writer = FontWriter::new(flavor);
    for (tag, range) in tables {
        writer.copy_table(tag, &data[range]);
    }
    Ok(writer.into_opentype())
}

#[cfg(not(feature = "woff2"))]
fn decode_woff2(bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
    log::warn!(
        "cannot decode WOFF2 container ({} bytes): Brotli support is disabled",
        bytes.len()
    );
    Err(Cursor::new(bytes).err(ParseErrorKind::Decompression))
}
