use planar_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("match list is empty")]
    EmptyMatches,

    #[error("{matches} matches for {queries} query descriptors (expected one per query)")]
    LengthMismatch { matches: usize, queries: usize },

    #[error("cannot compare a {query}-dimensional descriptor with a {train}-dimensional one")]
    IncompatibleDescriptors { query: usize, train: usize },

    #[error("cannot sample {required} items from a list of {available}")]
    InsufficientSamples { required: usize, available: usize },
}

pub type MatchResult<T> = Result<T, MatchError>;

impl From<MatchError> for CoreError {
    fn from(err: MatchError) -> Self {
        CoreError::backend("matching", err)
    }
}
