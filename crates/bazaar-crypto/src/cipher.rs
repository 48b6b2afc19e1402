//! ChaCha20-Poly1305 Payload Encryption
//!
//! Payload layout, base64 encoded as a whole:
//!
//! ```text
//! version (1 byte, 0x01) || nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey};
use crate::error::CryptoError;
use crate::exchange::{conversation_key, ConversationKey};

/// Current payload format version.
pub const PAYLOAD_VERSION: u8 = 0x01;

/// Size of the nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Encrypt a UTF-8 plaintext under a conversation key.
pub fn encrypt(key: &ConversationKey, plaintext: &str) -> Result<String, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("aead encrypt: {e}")))?;

    let mut out = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
    out.push(PAYLOAD_VERSION);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt a payload produced by [`encrypt`].
pub fn decrypt(key: &ConversationKey, payload: &str) -> Result<String, CryptoError> {
    let raw = STANDARD
        .decode(payload.trim())
        .map_err(|e| CryptoError::Encoding(format!("payload is not base64: {e}")))?;
    if raw.len() < 1 + NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Encoding(format!(
            "payload too short: {} bytes",
            raw.len()
        )));
    }
    if raw[0] != PAYLOAD_VERSION {
        return Err(CryptoError::Encoding(format!(
            "unsupported payload version {}",
            raw[0]
        )));
    }

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&raw[1..1 + NONCE_SIZE]);
    let plaintext = cipher
        .decrypt(nonce, &raw[1 + NONCE_SIZE..])
        .map_err(|_| CryptoError::Decryption("authentication tag mismatch".into()))?;

    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Encoding(format!("plaintext is not UTF-8: {e}")))
}

/// Encrypt `plaintext` from `sender` so that only `recipient` (or the sender
/// again) can read it.
pub fn encrypt_to(
    sender: &Ed25519KeyPair,
    recipient: &Ed25519PublicKey,
    plaintext: &str,
) -> Result<String, CryptoError> {
    let key = conversation_key(sender, recipient)?;
    encrypt(&key, plaintext)
}

/// Decrypt a payload that `counterparty` encrypted to `own`.
///
/// Key-agreement failures surface as [`CryptoError::Decryption`]: on the
/// receiving side a bad counterparty key means the payload is unreadable.
pub fn decrypt_from(
    own: &Ed25519KeyPair,
    counterparty: &Ed25519PublicKey,
    payload: &str,
) -> Result<String, CryptoError> {
    let key = conversation_key(own, counterparty).map_err(|e| match e {
        CryptoError::Encryption(msg) => CryptoError::Decryption(msg),
        other => other,
    })?;
    decrypt(&key, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_between_parties() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let payload = encrypt_to(&alice, &bob.public_key(), "Hello, Bob!").unwrap();
        let plain = decrypt_from(&bob, &alice.public_key(), &payload).unwrap();
        assert_eq!(plain, "Hello, Bob!");
    }

    #[test]
    fn sender_can_read_own_payload() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let payload = encrypt_to(&alice, &bob.public_key(), "note to self").unwrap();
        let plain = decrypt_from(&alice, &bob.public_key(), &payload).unwrap();
        assert_eq!(plain, "note to self");
    }

    #[test]
    fn third_party_cannot_decrypt() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let eve = Ed25519KeyPair::generate();
        let payload = encrypt_to(&alice, &bob.public_key(), "secret").unwrap();
        assert!(matches!(
            decrypt_from(&eve, &alice.public_key(), &payload),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn ciphertext_differs_each_time() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let a = encrypt_to(&alice, &bob.public_key(), "same").unwrap();
        let b = encrypt_to(&alice, &bob.public_key(), "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_payload_fails() {
        let alice = Ed25519KeyPair::generate();
        let bob = Ed25519KeyPair::generate();
        let payload = encrypt_to(&alice, &bob.public_key(), "amount=500").unwrap();
        let mut raw = STANDARD.decode(&payload).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = STANDARD.encode(raw);
        assert!(matches!(
            decrypt_from(&bob, &alice.public_key(), &tampered),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn framing_errors() {
        let alice = Ed25519KeyPair::generate();
        let key = conversation_key(&alice, &alice.public_key()).unwrap();
        assert!(matches!(decrypt(&key, "***"), Err(CryptoError::Encoding(_))));
        assert!(matches!(
            decrypt(&key, &STANDARD.encode([1u8; 8])),
            Err(CryptoError::Encoding(_))
        ));
        let mut wrong_version = vec![0x02u8];
        wrong_version.extend_from_slice(&[0u8; NONCE_SIZE + TAG_SIZE]);
        assert!(matches!(
            decrypt(&key, &STANDARD.encode(wrong_version)),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let alice = Ed25519KeyPair::generate();
        let key = conversation_key(&alice, &alice.public_key()).unwrap();
        let payload = encrypt(&key, "").unwrap();
        assert_eq!(decrypt(&key, &payload).unwrap(), "");
    }
}
