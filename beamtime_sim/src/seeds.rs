//! Deterministic per-worker random streams.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Derives one independent ChaCha8 stream per worker from a master seed.
///
/// Streams are:
/// - Deterministic: same master seed, same streams
/// - Distinct: each worker gets its own seed
/// - Isolated: changing the worker count doesn't change existing workers' seeds
pub struct DeterministicSeedProvider {
    /// Master seed
    master_seed: u64,
    
    /// Cache of derived seeds by worker index
    seed_cache: HashMap<usize, u64>,
}

impl DeterministicSeedProvider {
    /// Creates a new provider with the given master seed.
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            seed_cache: HashMap::new(),
        }
    }
    
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }
    
    /// Seed of a worker's stream:
    /// `master_seed * golden + worker * prime`
    pub fn worker_seed(&mut self, worker: usize) -> u64 {
        let master_seed = self.master_seed;
        *self.seed_cache.entry(worker).or_insert_with(|| {
            master_seed
                .wrapping_mul(0x9e3779b97f4a7c15)  // Golden ratio prime
                .wrapping_add((worker as u64).wrapping_mul(0x517cc1b727220a95))
        })
    }
    
    /// Fresh random stream for a worker.
    pub fn worker_rng(&mut self, worker: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.worker_seed(worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    
    #[test]
    fn test_deterministic_worker_streams() {
        let mut provider1 = DeterministicSeedProvider::new(42);
        let mut provider2 = DeterministicSeedProvider::new(42);
        
        let a: u64 = provider1.worker_rng(3).gen();
        let b: u64 = provider2.worker_rng(3).gen();
        assert_eq!(a, b);
    }
    
    #[test]
    fn test_different_workers_different_seeds() {
        let mut provider = DeterministicSeedProvider::new(42);
        
        let seed0 = provider.worker_seed(0);
        let seed1 = provider.worker_seed(1);
        let seed2 = provider.worker_seed(2);
        
        assert_ne!(seed0, seed1);
        assert_ne!(seed1, seed2);
        assert_ne!(seed0, seed2);
    }
    
    #[test]
    fn test_seed_isolation() {
        // Asking for more workers shouldn't change existing seeds
        let mut provider1 = DeterministicSeedProvider::new(42);
        let mut provider2 = DeterministicSeedProvider::new(42);
        
        let seeds1: Vec<u64> = (0..3).map(|w| provider1.worker_seed(w)).collect();
        let _extra: Vec<u64> = (0..10).rev().map(|w| provider2.worker_seed(w)).collect();
        
        for (w, seed) in seeds1.iter().enumerate() {
            assert_eq!(*seed, provider2.worker_seed(w));
        }
    }
}
