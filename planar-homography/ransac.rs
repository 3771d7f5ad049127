use crate::dlt::{dlt_homography, reprojection_error, to_rows};
use crate::error::{HomographyError, HomographyResult};
use crate::MIN_CORRESPONDENCES;
use log::{debug, warn};
use nalgebra::Matrix3;
use planar_core::{CoreResult, Homography, HomographyConfig, HomographyEstimator, Point2};
use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

const COLLINEAR_EPS: f64 = 1e-6;
const MIN_DETERMINANT: f64 = 1e-12;

/// Twice the signed area of the triangle `a b c`
fn triangle_area2(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True when any three of the four sampled points are collinear
fn has_collinear_triple(points: &[Point2], sample: &[usize]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|t| {
        let (a, b, c) = (&points[sample[t[0]]], &points[sample[t[1]]], &points[sample[t[2]]]);
        triangle_area2(a, b, c).abs() < COLLINEAR_EPS
    })
}

/// Iterations needed to draw one all-inlier sample with probability `confidence`
fn required_iterations(inlier_ratio: f64, confidence: f64, max_iterations: usize) -> usize {
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let all_inliers = inlier_ratio.powi(MIN_CORRESPONDENCES as i32);
    if all_inliers <= f64::EPSILON {
        return max_iterations;
    }
    let n = (1.0 - confidence).ln() / (1.0 - all_inliers).ln();
    if !n.is_finite() {
        return max_iterations;
    }
    (n.ceil() as usize).clamp(1, max_iterations)
}

#[derive(Debug, Clone)]
struct Consensus {
    model: Matrix3<f64>,
    mask: Vec<bool>,
    count: usize,
    error: f64,
}

impl Consensus {
    fn score(model: Matrix3<f64>, src: &[Point2], dst: &[Point2], threshold: f64) -> Self {
        let mut mask = Vec::with_capacity(src.len());
        let mut count = 0;
        let mut error = 0.0;
        for (p, q) in src.iter().zip(dst) {
            let e = reprojection_error(&model, p, q);
            let inlier = e <= threshold;
            if inlier {
                count += 1;
                error += e;
            }
            mask.push(inlier);
        }
        Self { model, mask, count, error }
    }

    fn beats(&self, other: &Consensus) -> bool {
        self.count > other.count || (self.count == other.count && self.error < other.error)
    }

    fn selected(&self, points: &[Point2]) -> Vec<Point2> {
        points
            .iter()
            .zip(&self.mask)
            .filter(|(_, &inlier)| inlier)
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Seeded RANSAC around the normalized DLT.
///
/// Same input and seed always produce the same model and mask.
#[derive(Debug, Clone)]
pub struct RansacHomography {
    threshold: f64,
    max_iterations: usize,
    confidence: f64,
    seed: u64,
    refine: bool,
}

impl Default for RansacHomography {
    fn default() -> Self {
        Self::from_config(&HomographyConfig::default())
    }
}

impl RansacHomography {
    pub fn from_config(cfg: &HomographyConfig) -> Self {
        Self {
            threshold: cfg.reprojection_threshold,
            max_iterations: cfg.max_iterations.max(1),
            confidence: cfg.confidence,
            seed: cfg.seed,
            refine: cfg.refine,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Estimate `H` with `dst ~ H * src`, marking correspondences within the
    /// reprojection threshold as inliers.
    pub fn fit(&self, src: &[Point2], dst: &[Point2]) -> HomographyResult<Homography> {
        let n = src.len();
        if n != dst.len() {
            return Err(HomographyError::LengthMismatch { src: n, dst: dst.len() });
        }
        if n < MIN_CORRESPONDENCES {
            return Err(HomographyError::InsufficientCorrespondences {
                required: MIN_CORRESPONDENCES,
                actual: n,
            });
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut best: Option<Consensus> = None;
        let mut budget = self.max_iterations;
        let mut iterations = 0;

        while iterations < budget {
            iterations += 1;
            let sample = index::sample(&mut rng, n, MIN_CORRESPONDENCES).into_vec();
            if has_collinear_triple(src, &sample) || has_collinear_triple(dst, &sample) {
                continue;
            }
            let sample_src: Vec<Point2> = sample.iter().map(|&i| src[i]).collect();
            let sample_dst: Vec<Point2> = sample.iter().map(|&i| dst[i]).collect();
            let Ok(model) = dlt_homography(&sample_src, &sample_dst) else {
                continue;
            };

            let candidate = Consensus::score(model, src, dst, self.threshold);
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                budget = required_iterations(
                    candidate.count as f64 / n as f64,
                    self.confidence,
                    self.max_iterations,
                );
                best = Some(candidate);
            }
        }

        let mut best = match best {
            Some(b) if b.count >= MIN_CORRESPONDENCES => b,
            _ => return Err(HomographyError::NoConsensus { iterations }),
        };
        debug!(
            "ransac: {} of {} inliers after {} iterations",
            best.count, n, iterations
        );

        if self.refine {
            match dlt_homography(&best.selected(src), &best.selected(dst)) {
                Ok(model) => {
                    let refined = Consensus::score(model, src, dst, self.threshold);
                    if refined.count >= best.count {
                        best = refined;
                    } else {
                        warn!(
                            "refit lost inliers ({} -> {}), keeping sample model",
                            best.count, refined.count
                        );
                    }
                }
                Err(e) => warn!("refit on inliers failed: {e}"),
            }
        }

        let homography = Homography::new(to_rows(&best.model), best.mask);
        if !homography.is_finite() {
            return Err(HomographyError::Degenerate("non-finite homography".into()));
        }
        if homography.determinant().abs() < MIN_DETERMINANT {
            return Err(HomographyError::Degenerate("singular homography".into()));
        }
        Ok(homography)
    }
}

impl HomographyEstimator for RansacHomography {
    fn estimate(&self, src: &[Point2], dst: &[Point2]) -> CoreResult<Homography> {
        Ok(self.fit(src, dst)?)
    }
}
