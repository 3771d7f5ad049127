pub mod config;
pub mod error;

pub use config::{
    DescriptorKind, DisplayConfig, FeatureConfig, HomographyConfig, MatchConfig, PipelineConfig,
    MIN_PATCH_SIZE,
};
pub use error::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Image {
    /// Wrap a pixel buffer, checking it matches the dimensions
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageSize { width, height });
        }
        let expected_len = width * height;
        if pixels.len() != expected_len {
            return Err(CoreError::InvalidImageData {
                expected_len,
                actual_len: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Uniform image, mostly useful in tests
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Pixel lookup with coordinates clamped to the border
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.pixels[cy * self.width + cx]
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Image-plane coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Key-point ≙ corner location with sub-pixel precision, orientation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in radians
    pub angle: f32,
    /// Diameter of the describing patch in base-image pixels
    pub size: f32,
    pub response: f32,
    /// Pyramid level the point was detected on
    pub octave: u32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            size: 31.0,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn point(&self) -> Point2 {
        Point2::new(self.x as f64, self.y as f64)
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type BinaryDescriptor = [u8; 32];

/// Appearance of the patch around one keypoint
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// Bit string compared by Hamming distance
    Binary(BinaryDescriptor),
    /// Real vector compared by Euclidean distance
    Real(Vec<f32>),
}

impl Descriptor {
    /// Number of bits or components
    pub fn dimension(&self) -> usize {
        match self {
            Descriptor::Binary(bits) => bits.len() * 8,
            Descriptor::Real(values) => values.len(),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Descriptor::Binary(_))
    }
}

/// Association of one query keypoint with one train keypoint
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

impl FeatureMatch {
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }

    /// Match pairing index `i` with itself, used for already aligned point lists
    pub fn identity(i: usize) -> Self {
        Self::new(i, i, 0.0)
    }
}

/// 3x3 projective transform with the inlier mask of the correspondences it was fitted on
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    /// Row-major matrix
    pub matrix: [[f64; 3]; 3],
    pub inlier_mask: Vec<bool>,
}

impl Homography {
    pub fn new(matrix: [[f64; 3]; 3], inlier_mask: Vec<bool>) -> Self {
        Self {
            matrix,
            inlier_mask,
        }
    }

    /// Map a point through the transform; `None` when it lands at infinity
    pub fn apply(&self, p: Point2) -> Option<Point2> {
        let m = &self.matrix;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        ))
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().flatten().all(|v| v.is_finite())
    }

    pub fn inlier_count(&self) -> usize {
        self.inlier_mask.iter().filter(|&&inlier| inlier).count()
    }

    pub fn to_f32_row_major(&self) -> [f32; 9] {
        let mut out = [0.0f32; 9];
        for (i, v) in self.matrix.iter().flatten().enumerate() {
            out[i] = *v as f32;
        }
        out
    }
}

/// Finds salient, repeatable image locations
pub trait FeatureDetector: Send + Sync {
    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>>;
}

/// Computes one descriptor per keypoint; the output is index-aligned with the input
pub trait DescriptorExtractor: Send + Sync {
    fn compute(&self, image: &Image, keypoints: &[Keypoint]) -> CoreResult<Vec<Descriptor>>;
}

/// Finds, for every query descriptor, its single nearest train descriptor
pub trait DescriptorMatcher: Send + Sync {
    fn match_descriptors(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> CoreResult<Vec<FeatureMatch>>;
}

/// Fits a projective transform mapping `src` onto `dst`, tolerating outliers
pub trait HomographyEstimator: Send + Sync {
    fn estimate(&self, src: &[Point2], dst: &[Point2]) -> CoreResult<Homography>;
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
