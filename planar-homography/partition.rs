use crate::error::{HomographyError, HomographyResult};
use planar_core::{FeatureMatch, Point2};

/// Correspondences split by an inlier mask, order preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub inliers_src: Vec<Point2>,
    pub inliers_dst: Vec<Point2>,
    pub outliers: Vec<(Point2, Point2)>,
}

impl Partition {
    pub fn inlier_count(&self) -> usize {
        self.inliers_src.len()
    }

    /// Matches pairing the i-th source inlier with the i-th destination inlier
    pub fn identity_matches(&self) -> Vec<FeatureMatch> {
        (0..self.inliers_src.len()).map(FeatureMatch::identity).collect()
    }
}

pub fn partition_by_mask(src: &[Point2], dst: &[Point2], mask: &[bool]) -> HomographyResult<Partition> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch { src: src.len(), dst: dst.len() });
    }
    if mask.len() != src.len() {
        return Err(HomographyError::LengthMismatch { src: src.len(), dst: mask.len() });
    }

    let mut partition = Partition::default();
    for ((p, q), &inlier) in src.iter().zip(dst).zip(mask) {
        if inlier {
            partition.inliers_src.push(*p);
            partition.inliers_dst.push(*q);
        } else {
            partition.outliers.push((*p, *q));
        }
    }
    Ok(partition)
}
