//! Seeded random number generation.
//!
//! Every pipeline owns exactly one RNG, created here and passed by `&mut`
//! to the generator and then the injector. The ChaCha8 stream for a seed
//! is fixed across platforms and crate releases.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The RNG type threaded through generation and injection.
pub type FactoryRng = ChaCha8Rng;

/// Use the configured seed, or draw a fresh one from the thread RNG.
///
/// The returned seed is always reported so that unseeded runs can be
/// reproduced.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random())
}

/// Create the pipeline RNG for a seed.
pub fn seeded_rng(seed: u64) -> FactoryRng {
    ChaCha8Rng::seed_from_u64(seed)
}
