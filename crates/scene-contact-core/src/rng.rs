use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Independent random streams consumed by the environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RngStream {
    /// Farthest-point sampling start points during plan compilation.
    Sampling = 1,
    /// Random plan assignment to scene grid cells.
    Layout = 2,
    /// Spawn yaw on episode reset.
    Spawn = 3,
}

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive a sub-RNG for a specific purpose, ensuring independent streams.
pub fn derive_rng(base_seed: u64, stream: RngStream) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(
        base_seed.wrapping_add(stream as u64 * crate::constants::RNG_DERIVATION_PRIME),
    )
}
