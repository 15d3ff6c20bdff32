//! Image normalization and placeholder synthesis.
//!
//! Decoding, encoding and drawing need the `imaging` feature (on by
//! default). Without it, [`normalize`] only passes through images already
//! in the requested format and [`placeholder`] always returns the minimal
//! images from [`fallback`].

pub mod fallback;
#[cfg(feature = "imaging")]
mod font;
pub mod normalize;
pub mod placeholder;

pub use fallback::minimal_image;
pub use normalize::{from_pnm, normalize};
pub use placeholder::{placeholder, PlaceholderInfo};
