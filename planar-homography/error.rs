use planar_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("Point list length mismatch: {src} source vs {dst} destination")]
    LengthMismatch { src: usize, dst: usize },

    #[error("Degenerate configuration: {0}")]
    Degenerate(String),

    #[error("No model with enough inliers after {iterations} iterations")]
    NoConsensus { iterations: usize },
}

pub type HomographyResult<T> = Result<T, HomographyError>;

impl From<HomographyError> for CoreError {
    fn from(err: HomographyError) -> Self {
        match err {
            HomographyError::InsufficientCorrespondences { required, actual } => {
                CoreError::InsufficientCorrespondences { required, actual }
            }
            HomographyError::LengthMismatch { src, dst } => {
                CoreError::LengthMismatch { left: src, right: dst }
            }
            HomographyError::Degenerate(msg) => CoreError::Degenerate(msg),
            HomographyError::NoConsensus { iterations } => CoreError::NoConsensus { iterations },
        }
    }
}
