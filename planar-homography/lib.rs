//! Robust planar homography estimation.
//!
//! [`dlt`] solves the normalized direct linear transform for four or more
//! correspondences, [`ransac`] wraps it in a seeded consensus search, and
//! [`partition`] splits correspondences by the resulting inlier mask.

pub mod dlt;
pub mod error;
pub mod partition;
pub mod ransac;

pub use dlt::{dlt_homography, reprojection_error};
pub use error::{HomographyError, HomographyResult};
pub use partition::{partition_by_mask, Partition};
pub use ransac::RansacHomography;

/// Smallest number of correspondences that determines a homography
pub const MIN_CORRESPONDENCES: usize = 4;
