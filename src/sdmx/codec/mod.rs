//! Codec layer: token reading and localized text selection.
//!
//! # Submodules
//!
//! - [`stream`][]: Depth-tracking XML reader with the suspend/resume scan primitive
//! - [`text`][]: Language lookup over `xml:lang`-tagged texts

pub mod stream;
pub mod text;
