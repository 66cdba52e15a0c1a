//! Brotli compression and decompression for WOFF2 containers.

use brotli_decompressor::{BrotliDecompressStream, BrotliResult, BrotliState};

use super::FontWriter;
use crate::{
    alloc::{vec, Box, Vec},
    Woff2Error,
};

/// Stream of table data without padding between tables, which is the layout of the WOFF2 data.
struct TableStream<'a> {
    /// Remaining tables in the reverse order.
    tables: Vec<&'a [u8]>,
    current: &'a [u8],
}

impl<'a> TableStream<'a> {
    fn new(writer: &'a FontWriter) -> Self {
        let data_offset = writer.tables.first().map_or(0, |record| record.offset) as usize;
        let tables = writer.tables.iter().rev().map(|record| {
            let start = record.offset as usize - data_offset;
            &writer.table_data[start..start + record.length as usize]
        });
        Self {
            tables: tables.collect(),
            current: &[],
        }
    }
}

impl brotli::CustomRead<()> for TableStream<'_> {
    fn read(&mut self, data: &mut [u8]) -> Result<usize, ()> {
        let mut total_read = 0;
        while total_read < data.len() {
            if self.current.is_empty() {
                let Some(next_table) = self.tables.pop() else {
                    break;
                };
                self.current = next_table;
                continue;
            }

            let current = self.current;
            let (chunk, rest) = current.split_at(current.len().min(data.len() - total_read));
            data[total_read..total_read + chunk.len()].copy_from_slice(chunk);
            total_read += chunk.len();
            self.current = rest;
        }
        Ok(total_read)
    }
}

#[derive(Default)]
struct Buffer(Vec<u8>);

impl brotli::CustomWrite<()> for Buffer {
    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct BoxedSlice<T>(Box<[T]>);

impl<T> brotli::SliceWrapper<T> for BoxedSlice<T> {
    fn slice(&self) -> &[T] {
        self.0.as_ref()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> brotli::SliceWrapperMut<T> for BoxedSlice<T> {
    fn slice_mut(&mut self) -> &mut [T] {
        self.0.as_mut()
    }
}

/// Allocator backed by the global allocator. Used both by the encoder and the decoder.
#[derive(Debug, Clone, Copy)]
struct GlobalAlloc;

impl<T: Clone + Default> brotli::enc::Allocator<T> for GlobalAlloc {
    type AllocatedMemory = BoxedSlice<T>;

    fn alloc_cell(&mut self, len: usize) -> Self::AllocatedMemory {
        BoxedSlice(vec![T::default(); len].into())
    }

    fn free_cell(&mut self, data: Self::AllocatedMemory) {
        drop(data);
    }
}

impl brotli::enc::BrotliAlloc for GlobalAlloc {}

impl FontWriter {
    pub(super) fn compress_data(&self) -> Result<Vec<u8>, Woff2Error> {
        let mut buffer = Buffer::default();
        let result = brotli::BrotliCompressCustomIo(
            &mut TableStream::new(self),
            &mut buffer,
            &mut [0_u8; 4_096],
            &mut [0_u8; 4_096],
            &brotli::enc::BrotliEncoderParams::default(),
            GlobalAlloc,
            &mut |_, _, _, _| { /* do nothing */ },
            (),
        );
        if result.is_err() {
            log::error!("Brotli compression of {} tables failed", self.tables.len());
            return Err(Woff2Error::CompressionUnavailable);
        }
        Ok(buffer.0)
    }
}

/// Decompresses a Brotli stream that must expand to exactly `expected_len` bytes.
///
/// The output grows with the data actually produced by the stream, so `expected_len` only bounds
/// memory usage rather than being allocated upfront.
pub(crate) fn decompress(input: &[u8], expected_len: usize) -> Option<Vec<u8>> {
    const CHUNK_LEN: usize = 1 << 16;

    let mut state = BrotliState::<GlobalAlloc, GlobalAlloc, GlobalAlloc>::new(
        GlobalAlloc,
        GlobalAlloc,
        GlobalAlloc,
    );
    let mut output = Vec::new();
    let mut chunk = vec![0_u8; CHUNK_LEN.min(expected_len + 1)];
    let (mut available_in, mut input_offset) = (input.len(), 0);
    let mut total_out = 0;
    loop {
        let (mut available_out, mut chunk_offset) = (chunk.len(), 0);
        let result = BrotliDecompressStream(
            &mut available_in,
            &mut input_offset,
            input,
            &mut available_out,
            &mut chunk_offset,
            &mut chunk,
            &mut total_out,
            &mut state,
        );
        output.extend_from_slice(&chunk[..chunk_offset]);
        if output.len() > expected_len {
            log::warn!("Brotli stream decompresses to more than {expected_len} bytes");
            return None;
        }

        match result {
            BrotliResult::NeedsMoreOutput => { /* continue with the next chunk */ }
            BrotliResult::ResultSuccess if output.len() == expected_len => return Some(output),
            BrotliResult::ResultSuccess => {
                log::warn!(
                    "Brotli stream decompressed to {} bytes, expected {expected_len}",
                    output.len()
                );
                return None;
            }
            BrotliResult::NeedsMoreInput | BrotliResult::ResultFailure => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use brotli::CustomRead;
    use test_casing::test_casing;

    use super::*;
    use crate::{
        tests::{TestFont, TestFontBuilder, TestGlyph, SUBSET_CHARS},
        Font, FontSubset,
    };

    fn ascii_subset_writer(font_bytes: &[u8]) -> FontWriter {
        let font = Font::new(font_bytes).unwrap();
        let subset = FontSubset::new(font, &SUBSET_CHARS[0].to_set()).unwrap();
        subset.to_writer()
    }

    #[test_casing(5, [1, 10, 100, 1000, 100_000])]
    fn table_stream_skips_padding(chunk_size: usize) {
        let font_bytes = TestFont::Latin.bytes();
        let writer = ascii_subset_writer(&font_bytes);

        let mut data_reader = TableStream::new(&writer);
        let mut buffer = vec![0; 100_000];

        let read = buffer
            .chunks_mut(chunk_size)
            .map(|chunk| data_reader.read(chunk).unwrap())
            .sum::<usize>();
        let expected_read = writer
            .tables
            .iter()
            .map(|record| record.length as usize)
            .sum::<usize>();
        assert_eq!(read, expected_read);

        let mut pos = 0;
        for record in &writer.tables {
            let offset = record.offset as usize;
            let len = record.length as usize;
            assert_eq!(
                writer.table_data[offset..offset + len],
                buffer[pos..pos + len]
            );
            pos += len;
        }
    }

    #[test]
    fn compressed_data_can_be_decompressed() {
        let font_bytes = TestFont::Symbols.bytes();
        let writer = ascii_subset_writer(&font_bytes);
        let compressed = writer.compress_data().unwrap();
        let expected_len = writer
            .tables
            .iter()
            .map(|record| record.length as usize)
            .sum::<usize>();

        let decompressed = decompress(&compressed, expected_len).unwrap();
        let mut pos = 0;
        for record in &writer.tables {
            let offset = record.offset as usize;
            let len = record.length as usize;
            assert_eq!(writer.table_data[offset..offset + len], decompressed[pos..pos + len]);
            pos += len;
        }

        assert!(decompress(&compressed, expected_len - 1).is_none());
        assert!(decompress(&compressed, expected_len + 1).is_none());
        assert!(decompress(&compressed[..compressed.len() / 2], expected_len).is_none());
        assert!(decompress(&compressed, 0).is_none());
    }

    #[test]
    fn decompressing_data_spanning_multiple_chunks() {
        let font_bytes = TestFontBuilder::new()
            .glyph(TestGlyph::zigzag(20_000), &['z'])
            .build();
        let writer = ascii_subset_writer(&font_bytes);
        let expected_len = writer
            .tables
            .iter()
            .map(|record| record.length as usize)
            .sum::<usize>();
        assert!(expected_len > 1 << 16, "{expected_len}");

        let compressed = writer.compress_data().unwrap();
        let decompressed = decompress(&compressed, expected_len).unwrap();
        assert_eq!(decompressed.len(), expected_len);
        assert!(decompress(&compressed, expected_len - 1).is_none());
    }
}
