//! Matching stage: nearest-neighbour descriptor matching, the
//! `factor × min distance` good-match filter, and the seeded subsampler used
//! to pick the matches shown in the pruned views.

pub mod error;
pub mod filter;
pub mod matcher;
pub mod sample;

pub use error::{MatchError, MatchResult};
pub use filter::{DistanceStats, FilteredMatches, GoodMatchFilter};
pub use matcher::{descriptor_distance, euclidean_distance, hamming_distance, BruteForceMatcher};
pub use sample::{shuffled_indices, DisplaySampler};
