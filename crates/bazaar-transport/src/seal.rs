//! # Sealing
//!
//! A seal binds a rumor to its real author: the rumor JSON is encrypted to
//! one recipient under the author's identity key and the ciphertext is signed
//! by that same key. Seals carry no tags, so nothing about the conversation
//! leaks even to a relay that somehow sees the seal.

use bazaar_core::{EventKind, Tags, UnixTimestamp};
use bazaar_crypto::{encrypt_to, Ed25519KeyPair, Ed25519PublicKey};

use crate::error::TransportError;
use crate::event::{Rumor, SignedEvent};

/// A signed, encrypted rumor (kind 13).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seal(SignedEvent);

impl Seal {
    /// The underlying signed event.
    pub fn event(&self) -> &SignedEvent {
        &self.0
    }

    /// The real author's public key.
    pub fn signer(&self) -> &Ed25519PublicKey {
        &self.0.pubkey
    }

    /// Unwrap into the signed event.
    pub fn into_event(self) -> SignedEvent {
        self.0
    }
}

/// Encrypt `rumor` to `recipient` and sign the result with `sender`.
///
/// The rumor's author is not checked against `sender`: the recipient's
/// unwrap step is where that binding is enforced.
///
/// # Errors
///
/// [`TransportError::Crypto`] wrapping `CryptoError::Encryption` when the
/// recipient key is malformed.
pub fn seal(
    rumor: &Rumor,
    sender: &Ed25519KeyPair,
    recipient: &Ed25519PublicKey,
) -> Result<Seal, TransportError> {
    let plaintext = serde_json::to_string(rumor)?;
    let content = encrypt_to(sender, recipient, &plaintext)?;
    let event = SignedEvent::sign(
        sender,
        UnixTimestamp::now(),
        EventKind::Seal,
        Tags::new(),
        content,
    )?;
    Ok(Seal(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_crypto::{decrypt_from, CryptoError};

    fn rumor_from(author: &Ed25519KeyPair) -> Rumor {
        Rumor::new(
            author.public_key(),
            UnixTimestamp::now(),
            EventKind::RumorDm,
            Tags::new(),
            "hello",
        )
        .unwrap()
    }

    #[test]
    fn seal_is_signed_by_sender_and_decryptable_by_recipient() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let rumor = rumor_from(&alice);
        let sealed = seal(&rumor, &alice, &bob.public_key()).unwrap();

        assert_eq!(sealed.event().kind, EventKind::Seal);
        assert_eq!(sealed.signer(), &alice.public_key());
        assert!(sealed.event().tags.is_empty());
        sealed.event().verify().unwrap();

        let json = decrypt_from(&bob, &alice.public_key(), &sealed.event().content).unwrap();
        assert_eq!(Rumor::from_json(&json).unwrap(), rumor);
    }

    #[test]
    fn malformed_recipient_is_encryption_error() {
        let alice = Ed25519KeyPair::generate();
        let mut low_order = [0u8; 32];
        low_order[0] = 1;
        let err = seal(
            &rumor_from(&alice),
            &alice,
            &Ed25519PublicKey::from_bytes(low_order),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Crypto(CryptoError::Encryption(_))
        ));
    }
}
