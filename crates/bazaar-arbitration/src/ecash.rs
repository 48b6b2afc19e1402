//! # Ecash Tokens
//!
//! Serialized form: `cashuA` followed by base64 (url-safe or standard,
//! padding optional) of a JSON document:
//!
//! ```text
//! { "token": [ { "mint": "...", "proofs": [ { "id", "amount", "secret", "C" } ] } ],
//!   "memo": "...", "unit": "sat" }
//! ```
//!
//! Proofs are opaque here. Nothing in this crate splits, spends, or rewrites
//! them; the arbiter only signs over their secrets.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use bazaar_state::ECASH_TOKEN_PREFIX;
use serde::{Deserialize, Serialize};

use crate::error::ArbitrationError;

/// One bearer proof of value issued by a mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EcashProof {
    /// Keyset id.
    pub id: String,
    /// Denomination.
    pub amount: u64,
    /// Secret the mint committed to.
    pub secret: String,
    /// Mint's blind signature, hex.
    #[serde(rename = "C")]
    pub c: String,
}

/// Proofs from a single mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintProofs {
    /// Mint URL.
    pub mint: String,
    /// Proofs issued by `mint`.
    pub proofs: Vec<EcashProof>,
}

/// A decoded ecash token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcashToken {
    /// Proof groups, one per mint.
    pub token: Vec<MintProofs>,
    /// Free-form memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Currency unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl EcashToken {
    /// Decode a `cashuA…` string.
    ///
    /// # Errors
    ///
    /// [`ArbitrationError::InvalidToken`] on a missing prefix, bad base64, or
    /// JSON that does not describe a token.
    pub fn decode(serialized: &str) -> Result<Self, ArbitrationError> {
        let body = serialized
            .trim()
            .strip_prefix(ECASH_TOKEN_PREFIX)
            .ok_or_else(|| ArbitrationError::InvalidToken("missing cashuA prefix".into()))?;
        let body = body.trim_end_matches('=');
        let json = URL_SAFE_NO_PAD
            .decode(body)
            .or_else(|_| STANDARD_NO_PAD.decode(body))
            .map_err(|e| ArbitrationError::InvalidToken(format!("base64: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| ArbitrationError::InvalidToken(format!("json: {e}")))
    }

    /// Serialize to a `cashuA…` string.
    pub fn encode(&self) -> Result<String, ArbitrationError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| ArbitrationError::InvalidToken(format!("json: {e}")))?;
        Ok(format!("{ECASH_TOKEN_PREFIX}{}", URL_SAFE.encode(json)))
    }

    /// Every proof across all mints, in token order.
    pub fn proofs(&self) -> Vec<EcashProof> {
        self.token
            .iter()
            .flat_map(|m| m.proofs.iter().cloned())
            .collect()
    }

    /// Sum of proof amounts.
    pub fn total_amount(&self) -> u64 {
        self.token
            .iter()
            .flat_map(|m| &m.proofs)
            .fold(0u64, |acc, p| acc.saturating_add(p.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn sample() -> EcashToken {
        EcashToken {
            token: vec![MintProofs {
                mint: "https://mint.example".into(),
                proofs: vec![
                    EcashProof {
                        id: "009a1f293253e41e".into(),
                        amount: 2,
                        secret: "407915bc212be61a77e3e6d2aeb4c727".into(),
                        c: "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                            .into(),
                    },
                    EcashProof {
                        id: "009a1f293253e41e".into(),
                        amount: 8,
                        secret: "fe15109314e61d7756b0f8ee0f23a624".into(),
                        c: "029e8e5050b890a7d6c0968db16bc1d5d5fa040ea1de284f6ec69d61299f671059"
                            .into(),
                    },
                ],
            }],
            memo: Some("escrow".into()),
            unit: Some("sat".into()),
        }
    }

    #[test]
    fn encoded_token_decodes() {
        let token = sample();
        let s = token.encode().unwrap();
        assert!(s.starts_with("cashuA"));
        assert_eq!(EcashToken::decode(&s).unwrap(), token);
        assert_eq!(token.total_amount(), 10);
        assert_eq!(token.proofs().len(), 2);
    }

    #[test]
    fn accepts_standard_alphabet_without_padding() {
        let json = serde_json::to_vec(&sample()).unwrap();
        let s = format!("cashuA{}", STANDARD.encode(json));
        let unpadded = s.trim_end_matches('=');
        assert_eq!(EcashToken::decode(unpadded).unwrap(), sample());
    }

    #[test]
    fn proof_field_c_is_uppercase_on_the_wire() {
        let v = serde_json::to_value(&sample().token[0].proofs[0]).unwrap();
        assert!(v.get("C").is_some());
        assert!(v.get("c").is_none());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "cashuB abc", "cashuA!!!!", "cashuAeyJmb28iOjF9"] {
            assert!(
                matches!(EcashToken::decode(bad), Err(ArbitrationError::InvalidToken(_))),
                "{bad}"
            );
        }
    }
}
