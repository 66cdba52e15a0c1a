//! `Glyph` and related types.

use super::Cursor;
use crate::{alloc::Vec, errors::ParseErrorKind, ParseError};

/// Simple glyph from the `glyf` table. The glyph data is copied to subsets verbatim.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimpleGlyph<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) contour_count: u16,
    pub(crate) point_count: u16,
    pub(crate) instructions_len: u16,
}

impl<'a> SimpleGlyph<'a> {
    const X_SHORT_VECTOR: u8 = 0x02;
    const Y_SHORT_VECTOR: u8 = 0x04;
    const REPEAT_FLAG: u8 = 0x08;
    const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;

    /// Walks the glyph description to check that it fits into the glyph data.
    fn parse(
        raw: &'a [u8],
        contour_count: u16,
        mut cursor: Cursor<'a>,
    ) -> Result<Self, ParseError> {
        let mut point_count = 0_u16;
        for _ in 0..contour_count {
            let end_point_cursor = cursor;
            let end_point = cursor.read_u16()?;
            // End points must increase strictly; otherwise, the point count is meaningless
            if end_point < point_count {
                return Err(end_point_cursor.err(ParseErrorKind::OffsetOutOfBounds(
                    usize::from(end_point),
                )));
            }
            point_count = end_point.checked_add(1).ok_or_else(|| {
                end_point_cursor.err(ParseErrorKind::OffsetOutOfBounds(usize::from(end_point)))
            })?;
        }

        let instructions_len = cursor.read_u16()?;
        cursor.skip(usize::from(instructions_len))?;

        let (mut x_len, mut y_len) = (0_usize, 0_usize);
        let mut remaining_points = usize::from(point_count);
        while remaining_points > 0 {
            let flag = cursor.read_u8()?;
            let repeat = if flag & Self::REPEAT_FLAG != 0 {
                usize::from(cursor.read_u8()?) + 1
            } else {
                1
            };
            if repeat > remaining_points {
                return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                    expected: remaining_points,
                    actual: repeat,
                }));
            }
            remaining_points -= repeat;
            let x_coord_len =
                Self::coordinate_len(flag, Self::X_SHORT_VECTOR, Self::X_IS_SAME_OR_POSITIVE);
            let y_coord_len =
                Self::coordinate_len(flag, Self::Y_SHORT_VECTOR, Self::Y_IS_SAME_OR_POSITIVE);
            x_len += repeat * x_coord_len;
            y_len += repeat * y_coord_len;
        }
        cursor.skip(x_len + y_len)?;

        Ok(Self {
            raw,
            contour_count,
            point_count,
            instructions_len,
        })
    }

    fn coordinate_len(flag: u8, short_mask: u8, same_mask: u8) -> usize {
        if flag & short_mask != 0 {
            1
        } else if flag & same_mask != 0 {
            0
        } else {
            2
        }
    }
}

/// Composite glyph. Component glyph indices are remapped when writing a subset, so
/// the glyph is stored in the decoded form.
#[derive(Debug, Clone)]
pub(crate) struct CompositeGlyph<'a> {
    /// xMin, yMin, xMax, yMax
    pub(crate) header: [u8; 8],
    pub(crate) components: Vec<GlyphComponent>,
    /// Optional instructions after the last component descriptor
    pub(crate) instructions: &'a [u8],
}

impl CompositeGlyph<'_> {
    /// Returns the length of the instructions attached to the glyph. Instructions are present
    /// if any component has the corresponding flag.
    pub(crate) fn instructions_len(&self) -> u16 {
        let has_instructions = self
            .components
            .iter()
            .any(|component| component.flags & GlyphComponent::WE_HAVE_INSTRUCTIONS != 0);
        match self.instructions {
            [hi, lo, ..] if has_instructions => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Glyph<'a> {
    Empty,
    Simple(SimpleGlyph<'a>),
    Composite(CompositeGlyph<'a>),
}

impl<'a> Glyph<'a> {
    pub(super) fn new(raw: Cursor<'a>, glyph_count: u16) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Ok(Self::Empty);
        }

        let mut cursor = raw;
        let number_of_contours = cursor.read_i16()?;
        let header = cursor.read_byte_array::<8>()?;
        if let Ok(contour_count) = u16::try_from(number_of_contours) {
            SimpleGlyph::parse(raw.bytes, contour_count, cursor).map(Self::Simple)
        } else {
            let mut has_more_components = true;
            let mut components = Vec::with_capacity(1);
            while has_more_components {
                let (component, new_has_more_components) =
                    GlyphComponent::new(&mut cursor, glyph_count)?;
                components.push(component);
                has_more_components = new_has_more_components;
            }
            let instructions = cursor.bytes;
            let glyph = CompositeGlyph {
                header,
                components,
                instructions,
            };
            let instructions_len = usize::from(glyph.instructions_len());
            if instructions_len > 0 && instructions.len() < instructions_len + 2 {
                return Err(cursor.err(ParseErrorKind::UnexpectedEof));
            }
            Ok(Self::Composite(glyph))
        }
    }

    /// Returns indices of glyphs directly referenced by this glyph.
    pub(crate) fn component_indices(&self) -> impl Iterator<Item = u16> + '_ {
        let components = match self {
            Self::Composite(glyph) => glyph.components.as_slice(),
            Self::Empty | Self::Simple(_) => &[],
        };
        components.iter().map(|component| component.glyph_idx)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GlyphComponent {
    pub(crate) flags: u16,
    pub(crate) glyph_idx: u16,
    pub(crate) args: GlyphComponentArgs,
    pub(crate) transform: TransformData,
}

impl GlyphComponent {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x_0001;
    const WE_HAVE_A_SCALE: u16 = 0x_0008;
    const MORE_COMPONENTS: u16 = 0x_0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x_0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x_0080;
    const WE_HAVE_INSTRUCTIONS: u16 = 0x_0100;

    fn new(cursor: &mut Cursor<'_>, glyph_count: u16) -> Result<(Self, bool), ParseError> {
        let flags = cursor.read_u16()?;
        let glyph_idx = cursor.read_u16_checked(|glyph_idx| {
            if glyph_idx >= glyph_count {
                return Err(ParseErrorKind::GlyphOutOfRange {
                    glyph_idx: glyph_idx.into(),
                    glyph_count,
                });
            }
            Ok(glyph_idx)
        })?;
        let args = if flags & Self::ARG_1_AND_2_ARE_WORDS != 0 {
            GlyphComponentArgs::U32(cursor.read_u32()?)
        } else {
            GlyphComponentArgs::U16(cursor.read_u16()?)
        };
        let transform = if flags & Self::WE_HAVE_A_SCALE != 0 {
            TransformData::Scale(cursor.read_u16()?)
        } else if flags & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            TransformData::TwoScales([cursor.read_u16()?, cursor.read_u16()?])
        } else if flags & Self::WE_HAVE_A_TWO_BY_TWO != 0 {
            TransformData::Affine([
                cursor.read_u16()?,
                cursor.read_u16()?,
                cursor.read_u16()?,
                cursor.read_u16()?,
            ])
        } else {
            TransformData::None
        };
        let this = Self {
            flags,
            glyph_idx,
            args,
            transform,
        };

        let has_more_components = flags & Self::MORE_COMPONENTS != 0;
        Ok((this, has_more_components))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum GlyphComponentArgs {
    U16(u16),
    U32(u32),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum TransformData {
    None,
    Scale(u16),
    TwoScales([u16; 2]),
    Affine([u16; 4]),
}

/// [`Glyph`] together with metrics read from the `hmtx` table.
#[derive(Debug, Clone)]
pub(crate) struct GlyphWithMetrics<'a> {
    pub(crate) inner: Glyph<'a>,
    pub(crate) advance: u16,
    pub(crate) lsb: i16,
}
