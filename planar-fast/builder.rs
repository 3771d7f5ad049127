use crate::detector::FastDetector;
use crate::error::FastResult;
use planar_core::FeatureConfig;

/// Fluent builder for a [`FastDetector`]
#[derive(Debug, Clone, Default)]
pub struct DetectorBuilder {
    config: FeatureConfig,
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing feature configuration
    pub fn from_config(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Set the FAST threshold (1-127)
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the patch size for orientation calculation
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    /// Set pyramid depth and the scale step between levels
    pub fn pyramid(mut self, levels: usize, scale_factor: f32) -> Self {
        self.config.pyramid_levels = levels;
        self.config.scale_factor = scale_factor;
        self
    }

    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.config.nms_distance = distance;
        self
    }

    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.config.subpixel_refinement = enable;
        self
    }

    pub fn max_keypoints(mut self, max_keypoints: usize) -> Self {
        self.config.max_keypoints = max_keypoints;
        self
    }

    /// Build the detector, validating the configuration
    pub fn build(self) -> FastResult<FastDetector> {
        FastDetector::new(self.config)
    }
}
