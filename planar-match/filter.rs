use crate::error::{MatchError, MatchResult};
use log::debug;
use planar_core::FeatureMatch;

/// Smallest and largest match distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStats {
    pub min: f32,
    pub max: f32,
}

impl DistanceStats {
    pub fn compute(matches: &[FeatureMatch]) -> MatchResult<Self> {
        let first = matches.first().ok_or(MatchError::EmptyMatches)?;
        Ok(matches.iter().fold(
            Self {
                min: first.distance,
                max: first.distance,
            },
            |acc, m| Self {
                min: acc.min.min(m.distance),
                max: acc.max.max(m.distance),
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredMatches {
    pub stats: DistanceStats,
    pub threshold: f32,
    pub good: Vec<FeatureMatch>,
}

/// Keeps matches whose distance is below `factor` times the smallest distance
#[derive(Debug, Clone, Copy)]
pub struct GoodMatchFilter {
    factor: f32,
}

impl Default for GoodMatchFilter {
    fn default() -> Self {
        Self { factor: 3.0 }
    }
}

impl GoodMatchFilter {
    pub fn new(factor: f32) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Filter `matches`, which must hold exactly one entry per query descriptor.
    ///
    /// A match is kept when `distance < factor * min`, or when it is itself a
    /// minimum-distance match; the second rule only matters when `min == 0`.
    pub fn apply(&self, matches: &[FeatureMatch], query_count: usize) -> MatchResult<FilteredMatches> {
        if matches.len() != query_count {
            return Err(MatchError::LengthMismatch {
                matches: matches.len(),
                queries: query_count,
            });
        }
        let stats = DistanceStats::compute(matches)?;
        let threshold = self.factor * stats.min;

        let good: Vec<FeatureMatch> = matches
            .iter()
            .filter(|m| m.distance < threshold || m.distance <= stats.min)
            .copied()
            .collect();

        debug!(
            "kept {} of {} matches (min {:.1}, max {:.1}, threshold {:.1})",
            good.len(),
            matches.len(),
            stats.min,
            stats.max,
            threshold
        );

        Ok(FilteredMatches {
            stats,
            threshold,
            good,
        })
    }
}
