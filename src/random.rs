use rand::rand_core::impls::{fill_bytes_via_next, next_u64_via_u32};
use rand::{Rng, RngCore, random};

const MULTIPLIER_A: i64 = 1103515245;
const INCREMENT_C: i64 = 12345;
const DEFAULT_SEED: i64 = 3819201;

/// Source of randomness for playouts, root noise and temperature sampling.
///
/// Implementors are also [`RngCore`], so `rand` distributions can draw from them.
pub trait RandomGenerator: Default + RngCore {
    fn next(&mut self) -> i32;
    fn next_range(&mut self, from: i32, to: i32) -> i32;

    /// A number in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    fn get_random_from_vec<'a, K>(&mut self, vec: &'a [K]) -> &'a K {
        &vec[self.next_range(0, vec.len() as i32) as usize]
    }
}

/// Thread-local `rand` generator.
#[derive(Debug, Default)]
pub struct StandardRandomGenerator;

impl RandomGenerator for StandardRandomGenerator {
    fn next(&mut self) -> i32 {
        random()
    }

    fn next_range(&mut self, from: i32, to: i32) -> i32 {
        rand::rng().random_range(from..to)
    }

    fn next_unit(&mut self) -> f64 {
        rand::rng().random()
    }
}

impl RngCore for StandardRandomGenerator {
    fn next_u32(&mut self) -> u32 {
        rand::rng().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        rand::rng().next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand::rng().fill_bytes(dst)
    }
}

/// Seeded linear congruential generator; the same seed replays the same search.
#[derive(Debug, Clone)]
pub struct CustomNumberGenerator {
    seed: i64,
}

impl Default for CustomNumberGenerator {
    fn default() -> Self {
        CustomNumberGenerator::new(DEFAULT_SEED)
    }
}

impl RandomGenerator for CustomNumberGenerator {
    fn next(&mut self) -> i32 {
        self.seed = (self.seed * MULTIPLIER_A + INCREMENT_C) % (i32::MAX as i64);
        self.seed as i32
    }

    fn next_range(&mut self, from: i32, to: i32) -> i32 {
        (self.next() % (to - from)).abs() + from
    }

    fn next_unit(&mut self) -> f64 {
        (self.next() as f64).abs() / i32::MAX as f64
    }
}

impl RngCore for CustomNumberGenerator {
    fn next_u32(&mut self) -> u32 {
        self.next().unsigned_abs()
    }

    fn next_u64(&mut self) -> u64 {
        next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        fill_bytes_via_next(self, dst)
    }
}

impl CustomNumberGenerator {
    pub const fn new(seed: i64) -> Self {
        Self { seed }
    }
}
