//! FAST-9 keypoint detection over an image pyramid.
//!
//! [`FastDetector`] implements [`planar_core::FeatureDetector`]: corners are
//! found with the segment test on every pyramid level, thinned by
//! non-maximum suppression, refined to sub-pixel precision, oriented by
//! intensity centroid and mapped back to base-image coordinates.

pub mod builder;
pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod pyramid;
pub mod refinement;
pub mod types;
pub mod utils;

pub use builder::DetectorBuilder;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use types::{CornerType, ScaleLevel, ScoredKeypoint};
