use crate::error::{MatchError, MatchResult};
use planar_core::DisplayConfig;
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform draw from `0..bound` using multiply-and-reject on 64-bit output.
///
/// Written out by hand so the drawn sequence only depends on the generator,
/// not on the sampling strategy of the `rand` version in use.
fn bounded(rng: &mut Xoshiro256PlusPlus, bound: u64) -> u64 {
    let threshold = bound.wrapping_neg() % bound;
    loop {
        let m = u128::from(rng.next_u64()) * u128::from(bound);
        if (m as u64) >= threshold {
            return (m >> 64) as u64;
        }
    }
}

/// Seeded permutation of `0..len`.
///
/// Fisher-Yates from the last index down to 1, each position swapped with a
/// uniform partner in `0..=i`. Same `(len, seed)` gives the same output on
/// every platform.
pub fn shuffled_indices(len: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for i in (1..len).rev() {
        let j = bounded(&mut rng, i as u64 + 1) as usize;
        indices.swap(i, j);
    }
    indices
}

/// Picks the subset of matches drawn in the pruned views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySampler {
    seed: u64,
    size: usize,
}

impl Default for DisplaySampler {
    fn default() -> Self {
        Self::from_config(&DisplayConfig::default())
    }
}

impl DisplaySampler {
    pub fn new(seed: u64, size: usize) -> Self {
        Self { seed, size }
    }

    pub fn from_config(cfg: &DisplayConfig) -> Self {
        Self::new(cfg.seed, cfg.sample_size)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// First `size` entries of the seeded permutation of `0..len`
    pub fn sample_indices(&self, len: usize) -> MatchResult<Vec<usize>> {
        if len < self.size {
            return Err(MatchError::InsufficientSamples {
                required: self.size,
                available: len,
            });
        }
        let mut indices = shuffled_indices(len, self.seed);
        indices.truncate(self.size);
        Ok(indices)
    }

    /// Clone the sampled items of `items`, in sample order
    pub fn sample<T: Clone>(&self, items: &[T]) -> MatchResult<Vec<T>> {
        Ok(self
            .sample_indices(items.len())?
            .into_iter()
            .map(|i| items[i].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_permutation(indices: &[usize], len: usize) -> bool {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted == (0..len).collect::<Vec<_>>()
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        assert_eq!(shuffled_indices(100, 9), shuffled_indices(100, 9));
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        for len in [0, 1, 2, 17, 250] {
            assert!(is_permutation(&shuffled_indices(len, 9), len));
        }
    }

    #[test]
    fn test_different_seed_differs() {
        assert_ne!(shuffled_indices(100, 9), shuffled_indices(100, 10));
    }

    #[test]
    fn test_shuffle_moves_elements() {
        let identity: Vec<usize> = (0..100).collect();
        assert_ne!(shuffled_indices(100, 9), identity);
    }

    #[test]
    fn test_bounded_stays_in_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for bound in [1u64, 2, 3, 7, 1000, u64::MAX] {
            for _ in 0..100 {
                assert!(bounded(&mut rng, bound) < bound);
            }
        }
    }

    #[test]
    fn test_sample_is_prefix_of_shuffle() {
        let sampler = DisplaySampler::new(9, 20);
        let sample = sampler.sample_indices(64).unwrap();
        assert_eq!(sample.len(), 20);
        assert_eq!(sample[..], shuffled_indices(64, 9)[..20]);
    }

    #[test]
    fn test_exact_size_returns_full_permutation() {
        let sample = DisplaySampler::new(9, 20).sample_indices(20).unwrap();
        assert!(is_permutation(&sample, 20));
    }

    #[test]
    fn test_short_list_is_error() {
        assert_eq!(
            DisplaySampler::default().sample_indices(19),
            Err(MatchError::InsufficientSamples {
                required: 20,
                available: 19
            })
        );
    }

    #[test]
    fn test_sample_items() {
        let items: Vec<char> = "abcdefghijklmnopqrstuvwxyz".chars().collect();
        let sampler = DisplaySampler::new(3, 5);
        let picked = sampler.sample(&items).unwrap();
        let expected: Vec<char> = sampler
            .sample_indices(items.len())
            .unwrap()
            .into_iter()
            .map(|i| items[i])
            .collect();
        assert_eq!(picked, expected);
    }

    proptest! {
        #[test]
        fn sample_is_distinct_and_in_range(len in 20usize..500, seed in any::<u64>()) {
            let sampler = DisplaySampler::new(seed, 20);
            let sample = sampler.sample_indices(len).unwrap();
            prop_assert_eq!(sample.len(), 20);
            prop_assert!(sample.iter().all(|&i| i < len));
            let mut sorted = sample.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), 20);
            prop_assert_eq!(&sample, &sampler.sample_indices(len).unwrap());
        }

        #[test]
        fn short_lists_always_fail(len in 0usize..20) {
            prop_assert!(DisplaySampler::default().sample_indices(len).is_err());
        }
    }
}
