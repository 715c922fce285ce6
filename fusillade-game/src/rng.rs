//! Deterministic bundle of RNG streams segregated by simulation domain.
//!
//! Volley fire and melee resolution each draw from their own stream, so
//! inserting a roll in one domain cannot shift every later roll in the
//! other. Stream seeds are derived from the user seed with
//! domain-separated HMAC-SHA256.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::cell::{RefCell, RefMut};

/// Deterministic bundle of per-domain RNG streams.
#[derive(Debug, Clone)]
pub struct RngBundle {
    volley: RefCell<CountingRng<ChaCha20Rng>>,
    melee: RefCell<CountingRng<ChaCha20Rng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            volley: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"volley"))),
            melee: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"melee"))),
        }
    }

    /// Access the volley RNG stream.
    #[must_use]
    pub fn volley(&self) -> RefMut<'_, CountingRng<ChaCha20Rng>> {
        self.volley.borrow_mut()
    }

    /// Access the melee RNG stream.
    #[must_use]
    pub fn melee(&self) -> RefMut<'_, CountingRng<ChaCha20Rng>> {
        self.melee.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
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
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(&user_seed.to_le_bytes())
        .expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn streams_are_domain_separated() {
        let bundle = RngBundle::from_user_seed(0xBEEF);
        let volley: u64 = bundle.volley().random();
        let melee: u64 = bundle.melee().random();
        assert_ne!(volley, melee, "domains must not share a stream");
    }

    #[test]
    fn same_seed_reproduces_draws() {
        let first = RngBundle::from_user_seed(1234);
        let second = RngBundle::from_user_seed(1234);
        let a: [u64; 4] = std::array::from_fn(|_| first.melee().random());
        let b: [u64; 4] = std::array::from_fn(|_| second.melee().random());
        assert_eq!(a, b);
    }

    #[test]
    fn draw_counter_tracks_usage() {
        let bundle = RngBundle::from_user_seed(9);
        assert_eq!(bundle.volley().draws(), 0);
        let _: u32 = bundle.volley().random();
        let _: u32 = bundle.volley().random();
        assert_eq!(bundle.volley().draws(), 2);
    }
}
