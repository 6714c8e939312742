//! Deterministic utilities for reproducible training
//!
//! Every random decision of the trainer (split, bootstrap, feature subsets,
//! hyperparameter draws) goes through [`LcgRng`], and per-tree streams are
//! derived with [`mix_seed`], so a fixed seed yields the same bundle on every
//! platform and regardless of thread scheduling.

use std::num::Wrapping;

/// 64-bit linear congruential generator (Knuth's MMIX constants)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // Burn one step so nearby seeds diverge immediately
        rng.next_u64();
        rng
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        // Low bits of an LCG are weak; fold the high half in
        let x = self.state.0;
        x ^ (x >> 33)
    }

    /// Uniform value in `[0, max)`; `0` when `max == 0`
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    /// Uniform value in `[0.0, 1.0)`
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }

    /// `k` distinct values from `0..n` in draw order
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_range(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }

    /// `n` draws with replacement from `0..n`
    pub fn bootstrap(&mut self, n: usize) -> Vec<usize> {
        (0..n).map(|_| self.next_range(n)).collect()
    }
}

/// Derive an independent seed for stream `stream` of `seed` (splitmix64)
pub fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Deterministic ordering among equally good split candidates.
///
/// Lower sorts first: the feature examined earlier at this node wins, then
/// the smaller threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub draw_order: usize,
    pub threshold_rank: usize,
}

impl SplitTieBreaker {
    pub fn new(draw_order: usize, threshold_rank: usize) -> Self {
        Self {
            draw_order,
            threshold_rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..1000 {
            assert!(rng.next_range(10) < 10);
            let unit = rng.next_unit();
            assert!((0.0..1.0).contains(&unit));
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = LcgRng::new(7);
        let mut items: Vec<usize> = (0..50).collect();
        rng.shuffle(&mut items);
        assert_ne!(items, (0..50).collect::<Vec<_>>());
        items.sort_unstable();
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_indices_distinct() {
        let mut rng = LcgRng::new(3);
        let mut sample = rng.sample_indices(216, 10);
        assert_eq!(sample.len(), 10);
        sample.sort_unstable();
        sample.dedup();
        assert_eq!(sample.len(), 10);

        assert_eq!(rng.sample_indices(4, 10).len(), 4);
    }

    #[test]
    fn test_bootstrap_range() {
        let mut rng = LcgRng::new(11);
        let draws = rng.bootstrap(20);
        assert_eq!(draws.len(), 20);
        assert!(draws.iter().all(|&i| i < 20));
    }

    #[test]
    fn test_mix_seed_streams_differ() {
        assert_eq!(mix_seed(42, 0), mix_seed(42, 0));
        assert_ne!(mix_seed(42, 0), mix_seed(42, 1));
        assert_ne!(mix_seed(42, 0), mix_seed(43, 0));
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 5);
        let t2 = SplitTieBreaker::new(0, 6);
        let t3 = SplitTieBreaker::new(1, 0);

        assert!(t1 < t2);
        assert!(t2 < t3);
    }
}
