//! X25519 Key Agreement
//!
//! Derives the symmetric conversation key shared by two Ed25519 identities.
//! Each identity's signing seed maps to an X25519 scalar and each public key
//! maps to its Montgomery form, so `conversation_key(a, B) == conversation_key(b, A)`.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey};
use crate::error::CryptoError;

/// Size of a conversation key in bytes.
pub const CONVERSATION_KEY_SIZE: usize = 32;

const HKDF_SALT: &[u8] = b"bazaar-v1";
const HKDF_INFO: &[u8] = b"bazaar:conversation-key";

/// Symmetric key shared by exactly two parties.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ConversationKey([u8; CONVERSATION_KEY_SIZE]);

impl ConversationKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CONVERSATION_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConversationKey(<secret>)")
    }
}

/// Derive the conversation key between our key pair and a peer's public key.
///
/// Fails with [`CryptoError::Encryption`] when the peer key is not a valid
/// Ed25519 point or when the agreement is non-contributory (low-order point).
pub fn conversation_key(
    own: &Ed25519KeyPair,
    peer: &Ed25519PublicKey,
) -> Result<ConversationKey, CryptoError> {
    let peer_vk = peer
        .to_verifying_key()
        .map_err(|e| CryptoError::Encryption(format!("malformed peer public key {peer}: {e}")))?;
    let peer_x = X25519Public::from(peer_vk.to_montgomery().to_bytes());

    let secret = StaticSecret::from(*own.x25519_secret());
    let shared = secret.diffie_hellman(&peer_x);
    if !shared.was_contributory() {
        return Err(CryptoError::Encryption(format!(
            "non-contributory key agreement with {peer}"
        )));
    }

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());
    let mut okm = [0u8; CONVERSATION_KEY_SIZE];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|e| CryptoError::Encryption(format!("key derivation failed: {e}")))?;
    Ok(ConversationKey(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreement_is_symmetric() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let ab = conversation_key(&alice, &bob.public_key()).unwrap();
        let ba = conversation_key(&bob, &alice.public_key()).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn different_peers_different_keys() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let carol = Ed25519KeyPair::generate();
        let ab = conversation_key(&alice, &bob.public_key()).unwrap();
        let ac = conversation_key(&alice, &carol.public_key()).unwrap();
        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn self_conversation_key_is_stable() {
        let alice = Ed25519KeyPair::from_seed(&[9u8; 32]);
        let k1 = conversation_key(&alice, &alice.public_key()).unwrap();
        let k2 = conversation_key(&alice, &alice.public_key()).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn identity_point_is_rejected() {
        // The Edwards identity (0, 1) is a valid encoding of a low-order point.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let alice = Ed25519KeyPair::generate();
        let err = conversation_key(&alice, &Ed25519PublicKey::from_bytes(identity)).unwrap_err();
        assert!(matches!(err, CryptoError::Encryption(_)));
    }

    #[test]
    fn debug_is_redacted() {
        let alice = Ed25519KeyPair::generate();
        let k = conversation_key(&alice, &alice.public_key()).unwrap();
        assert_eq!(format!("{k:?}"), "ConversationKey(<secret>)");
    }
}
