use crate::error::{MatchError, MatchResult};
use log::debug;
use planar_core::{BinaryDescriptor, CoreResult, Descriptor, DescriptorMatcher, FeatureMatch};
use rayon::prelude::*;

/// Number of differing bits between two binary descriptors
#[inline]
pub fn hamming_distance(a: &BinaryDescriptor, b: &BinaryDescriptor) -> u32 {
    a.chunks_exact(8)
        .zip(b.chunks_exact(8))
        .map(|(x, y)| {
            let mut xa = [0u8; 8];
            let mut ya = [0u8; 8];
            xa.copy_from_slice(x);
            ya.copy_from_slice(y);
            (u64::from_le_bytes(xa) ^ u64::from_le_bytes(ya)).count_ones()
        })
        .sum()
}

/// L2 distance between two equally long real-valued descriptors
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Hamming distance for binary pairs, Euclidean distance for real pairs.
///
/// Descriptors of different kinds or lengths are not comparable.
pub fn descriptor_distance(a: &Descriptor, b: &Descriptor) -> MatchResult<f32> {
    match (a, b) {
        (Descriptor::Binary(x), Descriptor::Binary(y)) => Ok(hamming_distance(x, y) as f32),
        (Descriptor::Real(x), Descriptor::Real(y)) if x.len() == y.len() => {
            Ok(euclidean_distance(x, y))
        }
        _ => Err(MatchError::IncompatibleDescriptors {
            query: a.dimension(),
            train: b.dimension(),
        }),
    }
}

/// Exact nearest-neighbour matcher.
///
/// Every query descriptor is matched to its single closest train descriptor;
/// ties resolve to the lowest train index.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceMatcher;

impl BruteForceMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn nearest(&self, query: &Descriptor, train: &[Descriptor]) -> MatchResult<Option<(usize, f32)>> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, candidate) in train.iter().enumerate() {
            let d = descriptor_distance(query, candidate)?;
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((idx, d)),
            }
            if d == 0.0 {
                break;
            }
        }
        Ok(best)
    }

    pub fn match_all(&self, query: &[Descriptor], train: &[Descriptor]) -> MatchResult<Vec<FeatureMatch>> {
        if train.is_empty() {
            return Ok(Vec::new());
        }
        let matches = query
            .par_iter()
            .enumerate()
            .filter_map(|(query_idx, q)| match self.nearest(q, train) {
                Ok(best) => best.map(|(train_idx, d)| Ok(FeatureMatch::new(query_idx, train_idx, d))),
                Err(e) => Some(Err(e)),
            })
            .collect::<MatchResult<Vec<FeatureMatch>>>()?;
        debug!("matched {} query descriptors against {}", matches.len(), train.len());
        Ok(matches)
    }
}

impl DescriptorMatcher for BruteForceMatcher {
    fn match_descriptors(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
    ) -> CoreResult<Vec<FeatureMatch>> {
        Ok(self.match_all(query, train)?)
    }
}
