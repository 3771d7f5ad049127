use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::types::{ScaleLevel, ScoredKeypoint};
use log::debug;
use planar_core::{CoreResult, FeatureConfig, FeatureDetector, Image, Keypoint, MIN_PATCH_SIZE};
use rayon::prelude::*;

/// FAST requires at least 7x7 image (3-pixel border on each side)
pub const MIN_IMAGE_SIZE: usize = 7;

/// Multi-scale FAST corner detector
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FeatureConfig,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: FeatureConfig) -> FastResult<Self> {
        // 0 would detect everything, >127 could cause issues with u8 arithmetic
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }
        if cfg.patch_size < MIN_PATCH_SIZE || cfg.patch_size % 2 == 0 {
            return Err(FastError::InvalidPatchSize(cfg.patch_size));
        }
        if cfg.pyramid_levels == 0 || !(cfg.scale_factor > 1.0) {
            return Err(FastError::InvalidPyramid {
                levels: cfg.pyramid_levels,
                scale_factor: cfg.scale_factor,
            });
        }
        Ok(Self { cfg })
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &Image) -> FastResult<()> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }
        if width < MIN_IMAGE_SIZE || height < MIN_IMAGE_SIZE {
            return Err(FastError::ImageTooSmall {
                width,
                height,
                min_size: MIN_IMAGE_SIZE,
            });
        }
        let expected_len = width * height;
        if img.pixels.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.pixels.len(),
            });
        }
        Ok(())
    }

    /// Detect keypoints across all pyramid levels, strongest first
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let mut scored = self.detect_keypoints_with_response(img)?;

        scored.sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.cfg.max_keypoints);

        Ok(scored.into_iter().map(|sk| sk.keypoint).collect())
    }

    /// Detect keypoints with response scores, in base-image coordinates
    pub fn detect_keypoints_with_response(&self, img: &Image) -> FastResult<Vec<ScoredKeypoint>> {
        self.validate_image(img)?;

        let scale_levels = ImagePyramid::generate_scale_levels(
            img.width,
            img.height,
            self.cfg.pyramid_levels,
            self.cfg.scale_factor,
        )?;
        let pyramid = ImagePyramid::build(img, &scale_levels);

        let per_level: Vec<Vec<ScoredKeypoint>> = scale_levels
            .par_iter()
            .zip(pyramid.par_iter())
            .map(|(scale_level, level_img)| {
                self.detect_at_level(level_img, scale_level, img.width, img.height)
            })
            .collect();

        for (scale_level, kps) in scale_levels.iter().zip(&per_level) {
            debug!(
                "level {} ({}x{}, scale {:.2}): {} keypoints",
                scale_level.level,
                scale_level.width,
                scale_level.height,
                scale_level.scale,
                kps.len()
            );
        }

        Ok(per_level.into_iter().flatten().collect())
    }

    /// Detect, suppress, refine and orient keypoints on one level, then map
    /// them back to the base image
    pub fn detect_at_level(
        &self,
        level_img: &Image,
        scale_level: &ScaleLevel,
        base_width: usize,
        base_height: usize,
    ) -> Vec<ScoredKeypoint> {
        let raw = CornerDetector::detect(level_img, self.cfg.threshold);
        let suppressed = KeypointRefinement::non_maximum_suppression(&raw, self.cfg.nms_distance);

        let x_ratio = base_width as f32 / scale_level.width as f32;
        let y_ratio = base_height as f32 / scale_level.height as f32;

        suppressed
            .into_iter()
            .map(|sk| {
                let kp = if self.cfg.subpixel_refinement {
                    KeypointRefinement::refine_subpixel(level_img, sk.keypoint)
                } else {
                    sk.keypoint
                };
                let angle = KeypointRefinement::compute_orientation(
                    level_img,
                    kp.x,
                    kp.y,
                    self.cfg.patch_size,
                );
                ScoredKeypoint {
                    keypoint: Keypoint {
                        x: kp.x * x_ratio,
                        y: kp.y * y_ratio,
                        angle,
                        size: self.cfg.patch_size as f32 * scale_level.scale,
                        response: sk.response,
                        octave: scale_level.level as u32,
                    },
                    response: sk.response,
                }
            })
            .collect()
    }

    /// Get detector configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }
}

impl FeatureDetector for FastDetector {
    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>> {
        Ok(self.detect_keypoints(image)?)
    }
}
