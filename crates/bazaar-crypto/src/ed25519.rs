//! # Ed25519 Identity Keys and Signatures
//!
//! Every party in the marketplace is identified by an Ed25519 public key.
//! The same key signs events and, after conversion to its Montgomery form,
//! takes part in X25519 key agreement (see [`crate::exchange`]).
//!
//! ## Security Invariant
//!
//! - Signing input is a `&ContentDigest`: event ids and ecash secret hashes
//!   are always digested before they are signed, never signed as raw text.
//! - `Ed25519KeyPair` does not implement `Serialize` and its `Debug` output
//!   is redacted. The secret seed leaves the type only as a `Zeroizing`
//!   hex string for the key file written by `bazaar keygen`.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as lowercase hex strings.

use bazaar_core::ContentDigest;
use ed25519_dalek::{Signer, Verifier};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair: a real identity or a single-use ephemeral key.
///
/// The wrapped `SigningKey` zeroizes its secret on drop.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey impls
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Create a public key from raw 32 bytes. No curve check is performed;
    /// use [`Self::to_verifying_key`] to validate.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "public key hex must be 64 chars, got {}",
                s.len()
            )));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key hex: {e}")))?;
        Ok(Self(arr))
    }

    /// Convert to an `ed25519_dalek::VerifyingKey`, rejecting bytes that do
    /// not decompress to a curve point.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Ed25519PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature impls
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        if s.len() != 128 {
            return Err(CryptoError::VerificationFailed(format!(
                "signature hex must be 128 chars, got {}",
                s.len()
            )));
        }
        let mut arr = [0u8; 64];
        hex::decode_to_slice(s, &mut arr)
            .map_err(|e| CryptoError::VerificationFailed(format!("invalid signature hex: {e}")))?;
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair impls
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair from the operating system CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rngs::OsRng)
    }

    /// Generate a key pair from a caller-supplied CSPRNG.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let signing_key = ed25519_dalek::SigningKey::generate(rng);
        Self { signing_key }
    }

    /// Create a key pair from a raw 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Parse a key pair from a 64-character hex seed.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(s.trim(), &mut *seed)
            .map_err(|e| CryptoError::KeyError(format!("invalid secret key hex: {e}")))?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the secret seed as hex. The returned buffer zeroizes on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    /// Get the public key from this key pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a 32-byte digest (an event id or a hashed ecash secret).
    pub fn sign_digest(&self, digest: &ContentDigest) -> Ed25519Signature {
        let sig = self.signing_key.sign(digest.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }

    /// X25519 secret scalar bytes derived from the signing seed.
    pub(crate) fn x25519_secret(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_scalar_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify an Ed25519 signature over a digest.
///
/// Returns `Err(CryptoError::KeyError)` when the public key is not a curve
/// point and `Err(CryptoError::VerificationFailed)` when the signature does
/// not match.
pub fn verify_digest(
    digest: &ContentDigest,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(digest.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::sha256_raw;
    use rand::SeedableRng;

    #[test]
    fn sign_and_verify_digest() {
        let kp = Ed25519KeyPair::generate();
        let digest = sha256_raw(b"event commitment");
        let sig = kp.sign_digest(&digest);
        verify_digest(&digest, &sig, &kp.public_key()).expect("valid signature should verify");
    }

    #[test]
    fn verify_wrong_key_fails() {
        let kp1 = Ed25519KeyPair::generate();
        let kp2 = Ed25519KeyPair::generate();
        let digest = sha256_raw(b"x");
        let sig = kp1.sign_digest(&digest);
        assert!(matches!(
            verify_digest(&digest, &sig, &kp2.public_key()),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn verify_wrong_digest_fails() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign_digest(&sha256_raw(b"original"));
        assert!(verify_digest(&sha256_raw(b"tampered"), &sig, &kp.public_key()).is_err());
    }

    #[test]
    fn deterministic_from_seed() {
        let kp1 = Ed25519KeyPair::from_seed(&[42u8; 32]);
        let kp2 = Ed25519KeyPair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        let d = sha256_raw(b"deterministic");
        assert_eq!(kp1.sign_digest(&d), kp2.sign_digest(&d));
    }

    #[test]
    fn seeded_rng_generation_is_reproducible() {
        let mut a = rand::rngs::StdRng::seed_from_u64(7);
        let mut b = rand::rngs::StdRng::seed_from_u64(7);
        assert_eq!(
            Ed25519KeyPair::generate_with(&mut a).public_key(),
            Ed25519KeyPair::generate_with(&mut b).public_key()
        );
    }

    #[test]
    fn secret_hex_round_trip() {
        let kp = Ed25519KeyPair::generate();
        let hex = kp.secret_hex();
        assert_eq!(hex.len(), 64);
        let restored = Ed25519KeyPair::from_secret_hex(&hex).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
        assert!(Ed25519KeyPair::from_secret_hex("abcd").is_err());
    }

    #[test]
    fn public_key_hex_and_serde() {
        let pk = Ed25519KeyPair::generate().public_key();
        assert_eq!(Ed25519PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2);
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn signature_hex_and_serde() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign_digest(&sha256_raw(b"y"));
        assert_eq!(Ed25519Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 128 + 2);
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(Ed25519PublicKey::from_hex("not-hex").is_err());
        assert!(Ed25519PublicKey::from_hex(&"zz".repeat(32)).is_err());
        assert!(Ed25519Signature::from_hex("aabb").is_err());
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let kp = Ed25519KeyPair::generate();
        assert_eq!(format!("{kp:?}"), "Ed25519KeyPair(<private>)");
        let pk_debug = format!("{:?}", kp.public_key());
        assert!(pk_debug.starts_with("Ed25519PublicKey("));
        assert!(pk_debug.ends_with("...)"));
    }
}
