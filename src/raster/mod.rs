//! CPU-side images on either end of the transform.

pub mod coverage;
pub mod output;

pub use coverage::{CoverageChannel, CoverageImage};
pub use output::DistanceFieldImage;
