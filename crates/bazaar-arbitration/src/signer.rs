//! # Escrow Redemption Signer
//!
//! The arbiter releases escrowed ecash by signing each proof's secret. The
//! resulting [`RedemptionShare`] is a cooperative share: the winning party
//! presents it, together with the proofs, to a settlement step outside this
//! crate.
//!
//! The signed message for a proof is `SHA-256(secret as UTF-8)`. Ed25519 is
//! deterministic, so signing the same proofs with the same key always yields
//! the same share.

use bazaar_core::{sha256_raw, OrderId};
use bazaar_crypto::{
    verify_digest, CryptoError, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature,
};
use serde::{Deserialize, Serialize};

use crate::ecash::EcashProof;
use crate::error::ArbitrationError;

/// Proofs plus one arbiter signature per proof, index-aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionShare {
    /// The escrowed proofs, unchanged.
    pub inputs: Vec<EcashProof>,
    /// Hex Ed25519 signatures; `signatures[i]` covers `inputs[i].secret`.
    pub signatures: Vec<String>,
}

/// Sign every proof secret with the arbiter's key.
///
/// `order_id` only labels the error when `proofs` is empty.
///
/// # Errors
///
/// [`ArbitrationError::NoEscrow`] when `proofs` is empty.
pub fn sign_partial(
    order_id: &OrderId,
    proofs: &[EcashProof],
    arbiter: &Ed25519KeyPair,
) -> Result<RedemptionShare, ArbitrationError> {
    if proofs.is_empty() {
        return Err(ArbitrationError::NoEscrow {
            order_id: order_id.clone(),
        });
    }
    let signatures = proofs
        .iter()
        .map(|p| arbiter.sign_digest(&sha256_raw(p.secret.as_bytes())).to_hex())
        .collect();
    Ok(RedemptionShare {
        inputs: proofs.to_vec(),
        signatures,
    })
}

/// Check every signature in `share` against `arbiter`.
///
/// # Errors
///
/// [`ArbitrationError::Crypto`] on a count mismatch, malformed signature, or
/// failed verification.
pub fn verify_redemption_share(
    share: &RedemptionShare,
    arbiter: &Ed25519PublicKey,
) -> Result<(), ArbitrationError> {
    if share.inputs.len() != share.signatures.len() {
        return Err(CryptoError::VerificationFailed(format!(
            "{} proofs but {} signatures",
            share.inputs.len(),
            share.signatures.len()
        ))
        .into());
    }
    for (proof, sig_hex) in share.inputs.iter().zip(&share.signatures) {
        let sig = Ed25519Signature::from_hex(sig_hex)?;
        verify_digest(&sha256_raw(proof.secret.as_bytes()), &sig, arbiter)?;
    }
    Ok(())
}
