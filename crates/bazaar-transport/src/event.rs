//! # Event Model
//!
//! A [`Rumor`] is the logical message: id-committed but unsigned, so it can
//! never be published on its own without a seal around it. A
//! [`SignedEvent`] is anything that goes on the wire: seals, gift wraps,
//! and public dispute markers.
//!
//! ## Event Id
//!
//! `id = SHA-256(JCS([0, pubkey_hex, created_at, kind, tags, content]))`,
//! hex encoded. Signatures are Ed25519 over the 32 id bytes.

use bazaar_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, DigestAlgorithm, EventId,
    EventKind, Tags, UnixTimestamp,
};
use bazaar_crypto::{verify_digest, CryptoError, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Compute the id committed to by an event's fields.
pub fn compute_event_id(
    pubkey: &Ed25519PublicKey,
    created_at: UnixTimestamp,
    kind: EventKind,
    tags: &Tags,
    content: &str,
) -> Result<EventId, CanonicalizationError> {
    let commitment = (0u8, pubkey, created_at, kind, tags, content);
    let canonical = CanonicalBytes::new(&commitment)?;
    Ok(EventId::from_bytes(&sha256_digest(&canonical).bytes))
}

fn id_digest(id: &EventId) -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, id.to_bytes())
}

/// The unsigned logical message carried inside a seal.
///
/// Immutable once constructed: fields are private and the id is recomputed
/// on construction, so a `Rumor` in hand always matches its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumor {
    id: EventId,
    pubkey: Ed25519PublicKey,
    created_at: UnixTimestamp,
    kind: EventKind,
    tags: Tags,
    content: String,
}

impl Rumor {
    /// Build a rumor and commit to its id.
    pub fn new(
        author: Ed25519PublicKey,
        created_at: UnixTimestamp,
        kind: EventKind,
        tags: Tags,
        content: impl Into<String>,
    ) -> Result<Self, CanonicalizationError> {
        let content = content.into();
        let id = compute_event_id(&author, created_at, kind, &tags, &content)?;
        Ok(Self {
            id,
            pubkey: author,
            created_at,
            kind,
            tags,
            content,
        })
    }

    /// Parse a rumor from decrypted JSON, rejecting a forged id.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let rumor: Self = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let expected = compute_event_id(
            &rumor.pubkey,
            rumor.created_at,
            rumor.kind,
            &rumor.tags,
            &rumor.content,
        )
        .map_err(|e| e.to_string())?;
        if expected != rumor.id {
            return Err(format!(
                "rumor id {} does not match content (expected {expected})",
                rumor.id
            ));
        }
        Ok(rumor)
    }

    /// Event id.
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Author public key.
    pub fn author(&self) -> &Ed25519PublicKey {
        &self.pubkey
    }

    /// Creation time claimed by the author.
    pub fn created_at(&self) -> UnixTimestamp {
        self.created_at
    }

    /// Event kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Ordered tags.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Message body.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An event as it travels between relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    /// Event id (hex SHA-256 of the commitment).
    pub id: EventId,
    /// Signer public key.
    pub pubkey: Ed25519PublicKey,
    /// Creation time.
    pub created_at: UnixTimestamp,
    /// Event kind.
    pub kind: EventKind,
    /// Ordered tags.
    pub tags: Tags,
    /// Body; ciphertext for seals and wraps.
    pub content: String,
    /// Ed25519 signature over the id bytes.
    pub sig: Ed25519Signature,
}

impl SignedEvent {
    /// Compute the id and sign it.
    pub fn sign(
        signer: &Ed25519KeyPair,
        created_at: UnixTimestamp,
        kind: EventKind,
        tags: Tags,
        content: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let pubkey = signer.public_key();
        let content = content.into();
        let id = compute_event_id(&pubkey, created_at, kind, &tags, &content)?;
        let sig = signer.sign_digest(&id_digest(&id));
        Ok(Self {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig,
        })
    }

    /// Check that the id commits to the fields and the signature verifies.
    pub fn verify(&self) -> Result<(), CryptoError> {
        let expected = compute_event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))?;
        if expected != self.id {
            return Err(CryptoError::VerificationFailed(format!(
                "id does not match content (expected {expected})"
            )));
        }
        verify_digest(&id_digest(&self.id), &self.sig, &self.pubkey)
    }

    /// Public keys named in `p` tags, skipping malformed entries.
    pub fn recipients(&self) -> impl Iterator<Item = Ed25519PublicKey> + '_ {
        self.tags
            .all("p")
            .filter_map(|t| t.value())
            .filter_map(|v| Ed25519PublicKey::from_hex(v).ok())
    }
}
