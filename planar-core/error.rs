use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },

    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },

    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Need at least {required} point correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("Degenerate configuration: {0}")]
    Degenerate(String),

    #[error("No consensus model found after {iterations} iterations")]
    NoConsensus { iterations: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{stage} backend failed: {source}")]
    Backend {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CoreError {
    /// Wrap a backend-specific error for the named pipeline stage
    pub fn backend<E>(stage: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Backend {
            stage,
            source: Box::new(err),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
