//! Pure-Rust WOFF and WOFF2 font encoding and decoding.
//!
//! This crate converts both ways between uncompressed SFNT font containers
//! (TrueType/OpenType) and the two web font container formats:
//!
//! - [`decode_woff2`] / [`encode_woff2`] for WOFF2, including the glyf/loca
//!   glyph transform, the hmtx transform, and TrueType collections on the
//!   decode side.
//! - [`decode_woff1`] / [`encode_woff1`] for WOFF 1.0.
//!
//! All four entry points are pure functions on byte slices; no state
//! survives a call. The compression codecs are pluggable: the
//! `*_with_custom_*` variants accept the (de)compressor as a closure, and
//! the plain variants bundle pure-Rust codecs behind the `brotli` and `z`
//! features (both on by default).
//!
//! Malformed input is never repaired; every failure surfaces as an
//! [`Error`] describing what was wrong.

mod checksum;
pub mod error;
pub mod sfnt;
pub mod tags;
pub mod types;
pub mod variable_length;
pub mod woff1;
pub mod woff2;

pub use error::Error;
#[cfg(feature = "z")]
pub use woff1::{decode_woff1, encode_woff1};
pub use woff1::{Woff1EncodeOptions, decode_woff1_with_custom_z, encode_woff1_with_custom_z};
#[cfg(feature = "brotli")]
pub use woff2::{decode_woff2, encode_woff2};
pub use woff2::{Woff2EncodeOptions, decode_woff2_with_custom_brotli, encode_woff2_with_custom_brotli};
