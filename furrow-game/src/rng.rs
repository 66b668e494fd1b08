//! Seeded random streams, one per simulation domain.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sha2::Sha256;

use crate::constants::RNG_STREAM_HARVEST;

/// Deterministic bundle of RNG streams derived from a single user seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    harvest: CountingRng<SmallRng>,
}

impl RngBundle {
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            harvest: CountingRng::new(derive_stream_seed(seed, RNG_STREAM_HARVEST)),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream used for harvest yields.
    pub const fn harvest_mut(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.harvest
    }

    #[must_use]
    pub const fn harvest_draws(&self) -> u64 {
        self.harvest.draws()
    }
}

/// RNG wrapper that counts draws so runs can be compared for determinism.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
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

/// HMAC-SHA256 keyed by the user seed over a domain tag; first eight digest bytes.
pub(crate) fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        // HMAC accepts keys of any length.
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    for (slot, byte) in seed_bytes.iter_mut().zip(digest.iter()) {
        *slot = *byte;
    }
    u64::from_le_bytes(seed_bytes)
}
