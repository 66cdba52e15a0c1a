use core::{fmt, ops};

use crate::TableTag;

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version.
    UnexpectedFontVersion,
    /// Font data is wrapped in a WOFF / WOFF2 container and must be decoded
    /// with [`decode_container()`](crate::decode_container) first.
    CompressedContainer,
    /// Missing required font table (e.g., `head`).
    MissingTable,
    /// No supported subtable in the `cmap` table.
    NoSupportedCmap,
    /// Offset inferred from the table data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Unexpected table version.
    UnexpectedTableVersion(u32),
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unexpected table format (e.g., for a `cmap` subtable).
    UnexpectedTableFormat(u16),
    /// Unexpected magic number in the `head` table.
    UnexpectedMagic(u32),
    /// Glyph index referenced by the table data exceeds the number of glyphs in the font.
    GlyphOutOfRange {
        /// Referenced glyph index.
        glyph_idx: u32,
        /// Number of glyphs in the font.
        glyph_count: u16,
    },
    /// Failed decompressing WOFF / WOFF2 table data.
    Decompression,
    /// WOFF2 table transform or flavor that cannot be reversed.
    UnsupportedTransform,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion => formatter.write_str("unexpected font version"),
            Self::CompressedContainer => {
                formatter.write_str("font data is wrapped in a WOFF / WOFF2 container")
            }
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::NoSupportedCmap => {
                formatter.write_str("no supported subtable in the `cmap` table")
            }
            Self::OffsetOutOfBounds(val) => {
                write!(
                    formatter,
                    "offset ({val}) inferred from the table data is out of bounds"
                )
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedTableVersion(val) => {
                write!(formatter, "unexpected table version ({val:#x})")
            }
            Self::UnexpectedTableLen { expected, actual } => {
                write!(
                    formatter,
                    "unexpected table length: expected {expected}, got {actual}"
                )
            }
            Self::UnexpectedTableFormat(val) => {
                write!(formatter, "unexpected table format ({val})")
            }
            Self::UnexpectedMagic(val) => {
                write!(formatter, "unexpected magic number ({val:#x})")
            }
            Self::GlyphOutOfRange {
                glyph_idx,
                glyph_count,
            } => {
                write!(
                    formatter,
                    "glyph index {glyph_idx} is out of range (font has {glyph_count} glyphs)"
                )
            }
            Self::Decompression => formatter.write_str("failed decompressing table data"),
            Self::UnsupportedTransform => {
                formatter.write_str("unsupported WOFF2 table transform or font flavor")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseErrorKind {}

/// Errors that can occur when parsing an OpenType [`Font`](crate::Font).
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ParseError {
    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data. If the error relates to a table,
    /// the offset is relative to the table start.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Errors that can occur when creating a [`FontSubset`](crate::FontSubset).
#[derive(Debug)]
#[non_exhaustive]
pub enum SubsetError {
    /// Glyph outlines are stored in a table the subsetter cannot rebuild (e.g., `CFF `).
    UnsupportedOutlines(TableTag),
    /// Composite glyph references form a cycle.
    CyclicComposite {
        /// Glyph at which the cycle was detected.
        glyph_idx: u16,
    },
}

impl fmt::Display for SubsetError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedOutlines(tag) => {
                write!(formatter, "unsupported glyph outlines in `{tag}` table")
            }
            Self::CyclicComposite { glyph_idx } => {
                write!(
                    formatter,
                    "composite glyph references form a cycle through glyph {glyph_idx}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SubsetError {}

/// Errors that can occur when converting a font to the WOFF2 format.
///
/// These errors do not affect the OpenType output, which can be used as a fallback.
#[derive(Debug)]
#[non_exhaustive]
pub enum Woff2Error {
    /// Error parsing the supplied OpenType font data.
    Parse(ParseError),
    /// Brotli compression is not available (the `woff2` crate feature is off) or has failed.
    CompressionUnavailable,
}

impl From<ParseError> for Woff2Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl fmt::Display for Woff2Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(formatter, "failed parsing OpenType data: {err}"),
            Self::CompressionUnavailable => {
                formatter.write_str("Brotli compression is unavailable")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Woff2Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::CompressionUnavailable => None,
        }
    }
}
