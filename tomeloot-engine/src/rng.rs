//! Deterministic random streams for replayable reward resolution.
//!
//! Engine functions accept any `RngCore`; this module supplies the seeded,
//! domain-separated streams callers use in production and in replays.
use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::constants::{STREAM_OPEN, STREAM_SESSION};
use crate::numbers::usize_to_f64;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    /// Seed a ChaCha stream directly from a 64-bit seed.
    #[must_use]
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::wrap(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Wrap an existing generator.
    #[must_use]
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Stream used by the session orchestrator.
#[must_use]
pub fn session_stream(user_seed: u64) -> CountingRng<ChaCha20Rng> {
    CountingRng::from_seed_u64(derive_stream_seed(user_seed, STREAM_SESSION))
}

/// Stream used when opening boxes, kept apart so opening order never shifts session rolls.
#[must_use]
pub fn open_stream(user_seed: u64) -> CountingRng<ChaCha20Rng> {
    CountingRng::from_seed_u64(derive_stream_seed(user_seed, STREAM_OPEN))
}

/// Derive a per-domain seed from the user-visible seed with HMAC-SHA256.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Map a single 32-bit draw onto the open unit interval.
///
/// Exactly one `next_u32` is consumed per call so draw counts stay predictable.
pub fn unit_draw<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    let sample = rng.next_u32();
    let denom = f64::from(u32::MAX) + 1.0;
    ((f64::from(sample) + 0.5) / denom).clamp(0.0, 1.0)
}

/// Bernoulli trial against `chance`, consuming one draw.
pub fn roll_chance<R: RngCore + ?Sized>(chance: f64, rng: &mut R) -> bool {
    unit_draw(rng) < chance
}

/// Uniform index into a collection of `len` items, consuming one draw.
/// Returns `None` for an empty collection without drawing.
pub fn pick_index<R: RngCore + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let scaled = (unit_draw(rng) * usize_to_f64(len)).floor();
    let idx = num_traits::cast::<f64, usize>(scaled).unwrap_or(0);
    Some(idx.min(len - 1))
}

#[cfg(test)]
pub(crate) mod testing {
    use rand::RngCore;

    /// Fixed-output generator that records how many draws were requested.
    pub(crate) struct StubRng {
        pub value: u32,
        pub calls: u32,
    }

    impl StubRng {
        pub(crate) const fn new(value: u32) -> Self {
            Self { value, calls: 0 }
        }

        /// A generator whose unit draws land on `ratio`, within one part in 2^32.
        pub(crate) fn at_ratio(ratio: f64) -> Self {
            let scaled = (ratio.clamp(0.0, 1.0) * f64::from(u32::MAX)).floor();
            Self::new(num_traits::cast::<f64, u32>(scaled).unwrap_or(u32::MAX))
        }
    }

    impl RngCore for StubRng {
        fn next_u32(&mut self) -> u32 {
            self.calls = self.calls.saturating_add(1);
            self.value
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let value = self.next_u32().to_le_bytes();
            for (idx, byte) in dest.iter_mut().enumerate() {
                *byte = value[idx % value.len()];
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }
}
