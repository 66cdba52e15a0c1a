//! OpenType font subsetting for lightweight web fonts.
//!
//! The crate reduces a TrueType-flavored OpenType font to the glyphs required to render
//! a set of chars and serializes the result either as an OpenType font or as a WOFF2 web font.
//!
//! # Pipeline
//!
//! 1. [`decode_container()`] unwraps WOFF / WOFF2 inputs into plain OpenType data.
//! 2. [`Font::new()`] parses the font tables.
//! 3. [`FontSubset::new()`] resolves chars to glyphs, follows composite glyph references
//!    and renumbers the retained glyphs.
//! 4. [`FontSubset::to_truetype()`] / [`FontSubset::to_woff2()`] serialize the subset.
//!
//! # Crate features
//!
//! ## `std`
//!
//! *(On by default)*
//!
//! Enables `std`-specific functionality, such as [`Error`](std::error::Error) implementations
//! for error types. Without it, the crate is `no_std`-compatible (but still requires an allocator).
//!
//! ## `woff2`
//!
//! *(On by default)*
//!
//! Enables reading and writing WOFF2 containers. Without it, [`FontSubset::to_woff2()`] returns
//! [`Woff2Error::CompressionUnavailable`].
//!
//! # Examples
//!
//! ```
//! # use std::collections::BTreeSet;
//! use slimfont::{decode_container, Font, FontSubset};
//!
//! # fn test_wrapper(font_bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let font_bytes = decode_container(font_bytes)?;
//! let font = Font::new(&font_bytes)?;
//! let chars: BTreeSet<char> = "Hello, world!".chars().collect();
//! let subset = FontSubset::new(font, &chars)?;
//! println!(
//!     "resolved {} of {} chars",
//!     subset.resolved_char_count(),
//!     subset.requested_char_count()
//! );
//! let ttf: Vec<u8> = subset.to_truetype();
//! let woff2: Vec<u8> = subset.to_woff2()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![doc(html_root_url = "https://docs.rs/slimfont/0.1.0")]

mod container;
mod errors;
mod font;
mod subset;
#[cfg(test)]
pub(crate) mod tests;
mod write;

pub use crate::{
    container::decode_container,
    errors::{ParseError, ParseErrorKind, SubsetError, Woff2Error},
    font::{Font, TableTag},
    subset::FontSubset,
    write::woff2_from_truetype,
};

mod alloc {
    #[cfg(not(feature = "std"))]
    extern crate alloc as std;

    pub(crate) use std::{
        borrow::Cow,
        boxed::Box,
        collections::{BTreeMap, BTreeSet},
        string::String,
        vec,
        vec::Vec,
    };
}

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
