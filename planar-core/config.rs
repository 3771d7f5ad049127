use crate::error::{CoreError, CoreResult};

/// Smallest descriptor patch; BRIEF keeps its tests two pixels inside a radius of at least 3
pub const MIN_PATCH_SIZE: usize = 7;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Descriptor computed around each keypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DescriptorKind {
    /// 4x4 cells of 8-bin gradient orientation histograms, 128 values
    #[default]
    Gradient,
    /// 256 steered intensity comparisons
    Brief,
}

impl DescriptorKind {
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorKind::Gradient => "gradient",
            DescriptorKind::Brief => "brief",
        }
    }
}

/// Keypoint detection and description settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    /// FAST intensity threshold, the detector sensitivity (1-127)
    pub threshold: u8,
    /// Side of the square patch used for orientation and descriptors (odd)
    pub patch_size: usize,
    pub pyramid_levels: usize,
    pub scale_factor: f32,
    pub nms_distance: f32,
    pub subpixel_refinement: bool,
    /// Strongest keypoints kept per image
    pub max_keypoints: usize,
    pub descriptor: DescriptorKind,
    /// Gaussian smoothing applied before descriptor sampling
    pub blur_sigma: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            pyramid_levels: 4,
            scale_factor: 1.2,
            nms_distance: 3.0,
            subpixel_refinement: true,
            max_keypoints: 1000,
            descriptor: DescriptorKind::Gradient,
            blur_sigma: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Matches below `good_match_factor * min_distance` are kept
    pub good_match_factor: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            good_match_factor: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HomographyConfig {
    /// Maximum forward reprojection error of an inlier, in pixels
    pub reprojection_threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
    /// Refit the best model on all of its inliers
    pub refine: bool,
}

impl Default for HomographyConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0,
            refine: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    /// Seed of the match subsampling shuffle
    pub seed: u64,
    /// Number of matches kept in the pruned views
    pub sample_size: usize,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            seed: 9,
            sample_size: 20,
            window_width: 800,
            window_height: 600,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub matching: MatchConfig,
    pub homography: HomographyConfig,
    pub display: DisplayConfig,
    pub n_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            matching: MatchConfig::default(),
            homography: HomographyConfig::default(),
            display: DisplayConfig::default(),
            n_threads: num_cpus::get().max(1),
        }
    }
}

impl PipelineConfig {
    /// Fewer, stronger keypoints on a shallow pyramid
    pub fn fast_preset() -> Self {
        let mut cfg = Self::default();
        cfg.features.threshold = 30;
        cfg.features.pyramid_levels = 2;
        cfg.features.max_keypoints = 500;
        cfg.features.subpixel_refinement = false;
        cfg.homography.max_iterations = 500;
        cfg
    }

    /// More keypoints, deeper pyramid and a longer RANSAC budget
    pub fn precision_preset() -> Self {
        let mut cfg = Self::default();
        cfg.features.threshold = 12;
        cfg.features.pyramid_levels = 6;
        cfg.features.nms_distance = 2.0;
        cfg.features.max_keypoints = 3000;
        cfg.homography.max_iterations = 5000;
        cfg.homography.confidence = 0.999;
        cfg
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PipelineConfig: threshold={}, patch={}, levels={}x{:.2}, max_kp={}, descriptor={}, factor={:.1}, reproj={:.1}px, ransac_iters={}, seed={}, sample={}, threads={}",
            self.features.threshold,
            self.features.patch_size,
            self.features.pyramid_levels,
            self.features.scale_factor,
            self.features.max_keypoints,
            self.features.descriptor.name(),
            self.matching.good_match_factor,
            self.homography.reprojection_threshold,
            self.homography.max_iterations,
            self.display.seed,
            self.display.sample_size,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> CoreResult<()> {
        let f = &self.features;
        if f.threshold == 0 || f.threshold > 127 {
            return Err(CoreError::InvalidConfig(format!(
                "threshold {} must be 1-127",
                f.threshold
            )));
        }
        if f.patch_size < MIN_PATCH_SIZE || f.patch_size % 2 == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "patch_size {} must be odd and >= {}",
                f.patch_size, MIN_PATCH_SIZE
            )));
        }
        if f.pyramid_levels == 0 {
            return Err(CoreError::InvalidConfig("pyramid_levels must be > 0".into()));
        }
        if !(f.scale_factor > 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "scale_factor {} must be > 1",
                f.scale_factor
            )));
        }
        if f.max_keypoints == 0 {
            return Err(CoreError::InvalidConfig("max_keypoints must be > 0".into()));
        }
        if !(self.matching.good_match_factor > 0.0) {
            return Err(CoreError::InvalidConfig(
                "good_match_factor must be positive".into(),
            ));
        }
        let h = &self.homography;
        if !(h.reprojection_threshold > 0.0) {
            return Err(CoreError::InvalidConfig(
                "reprojection_threshold must be positive".into(),
            ));
        }
        if h.max_iterations == 0 {
            return Err(CoreError::InvalidConfig("max_iterations must be > 0".into()));
        }
        if !(h.confidence > 0.0 && h.confidence < 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "confidence {} must be in (0, 1)",
                h.confidence
            )));
        }
        if self.display.sample_size == 0 {
            return Err(CoreError::InvalidConfig("sample_size must be > 0".into()));
        }
        if self.n_threads == 0 {
            return Err(CoreError::InvalidConfig("n_threads must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

#[cfg(feature = "serde")]
impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigFileError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
