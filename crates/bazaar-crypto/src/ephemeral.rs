//! # Ephemeral Key Provider
//!
//! Hands out single-use signing key pairs for gift-wrap envelopes. A provider
//! is an ordinary value owned by the caller of a send operation; there is no
//! process-wide key cache. It remembers the public half of every key it has
//! issued and refuses to issue one twice, so key reuse is observable in tests
//! rather than assumed away.

use std::collections::HashSet;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey};
use crate::error::CryptoError;

/// Draws tolerated before a repeating RNG is reported as broken.
const MAX_DRAWS: usize = 8;

/// Source of single-use key pairs.
pub struct EphemeralKeyProvider<R = OsRng> {
    rng: R,
    issued: HashSet<Ed25519PublicKey>,
}

impl EphemeralKeyProvider<OsRng> {
    /// Provider backed by the operating system CSPRNG.
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }
}

impl Default for EphemeralKeyProvider<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> EphemeralKeyProvider<R> {
    /// Provider backed by a caller-supplied CSPRNG.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
        }
    }

    /// Issue a fresh key pair. Ownership passes to the caller, who drops it
    /// once the envelope is signed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyError`] if the RNG keeps producing keys this
    /// provider has already issued.
    pub fn next_key(&mut self) -> Result<Ed25519KeyPair, CryptoError> {
        for _ in 0..MAX_DRAWS {
            let kp = Ed25519KeyPair::generate_with(&mut self.rng);
            if self.issued.insert(kp.public_key()) {
                return Ok(kp);
            }
        }
        Err(CryptoError::KeyError(format!(
            "ephemeral RNG repeated an issued key {MAX_DRAWS} times in a row"
        )))
    }

    /// Number of keys issued so far.
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Whether `public_key` was issued by this provider.
    pub fn has_issued(&self, public_key: &Ed25519PublicKey) -> bool {
        self.issued.contains(public_key)
    }
}

impl<R> std::fmt::Debug for EphemeralKeyProvider<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyProvider")
            .field("issued", &self.issued.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// An RNG that always yields zero bytes.
    struct StuckRng;

    impl RngCore for StuckRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for StuckRng {}

    #[test]
    fn keys_are_never_repeated() {
        let mut provider = EphemeralKeyProvider::new();
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let kp = provider.next_key().unwrap();
            assert!(seen.insert(kp.public_key()));
            assert!(provider.has_issued(&kp.public_key()));
        }
        assert_eq!(provider.issued_count(), 64);
    }

    #[test]
    fn stuck_rng_is_refused_after_first_key() {
        let mut provider = EphemeralKeyProvider::with_rng(StuckRng);
        assert!(provider.next_key().is_ok());
        let err = provider.next_key().unwrap_err();
        assert!(matches!(err, CryptoError::KeyError(_)));
        assert_eq!(provider.issued_count(), 1);
    }

    #[test]
    fn independent_providers_share_no_state() {
        let mut a = EphemeralKeyProvider::with_rng(rand::rngs::StdRng::seed_from_u64(1));
        let b = EphemeralKeyProvider::with_rng(rand::rngs::StdRng::seed_from_u64(1));
        let k = a.next_key().unwrap();
        assert!(!b.has_issued(&k.public_key()));
    }

    #[test]
    fn debug_shows_only_count() {
        let mut provider = EphemeralKeyProvider::new();
        provider.next_key().unwrap();
        assert_eq!(format!("{provider:?}"), "EphemeralKeyProvider { issued: 1 }");
    }
}
