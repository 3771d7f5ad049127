use planar_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FastError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },

    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },

    #[error("Invalid threshold: {0} (must be 1-127)")]
    InvalidThreshold(u8),

    #[error("Invalid patch size {0} (must be odd and >= 7)")]
    InvalidPatchSize(usize),

    #[error("Image {width}x{height} too small (minimum {min_size}x{min_size})")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_size: usize,
    },

    #[error("Invalid pyramid: {levels} levels with scale factor {scale_factor}")]
    InvalidPyramid { levels: usize, scale_factor: f32 },
}

pub type FastResult<T> = Result<T, FastError>;

impl From<FastError> for CoreError {
    fn from(err: FastError) -> Self {
        CoreError::backend("detection", err)
    }
}
