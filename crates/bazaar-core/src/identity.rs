//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers that correlate messages: event ids,
//! order ids, and product addresses. You cannot pass an `OrderId` where an
//! `EventId` is expected, even though an order id frequently *is* the id of
//! the first message that mentioned it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of a signed or unsigned event: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventId(String);

impl EventId {
    /// Parse an event id, rejecting anything that is not 64 lowercase hex chars.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if is_lower_hex(s, 64) {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidEventId(s.to_string()))
        }
    }

    /// Build an event id from a 32-byte digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Access the hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to raw bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Length and alphabet were checked at construction.
        if let Ok(raw) = hex::decode(&self.0) {
            out.copy_from_slice(&raw);
        }
        out
    }
}

impl TryFrom<String> for EventId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation key for an order: the `order` tag, or the id of the message
/// that first described it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Create an order id. Empty or whitespace-bearing ids are rejected.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidOrderId(s));
        }
        Ok(Self(s))
    }

    /// Access the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EventId> for OrderId {
    fn from(id: &EventId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl TryFrom<String> for OrderId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a replaceable product listing: `kind:pubkey:dTag`.
///
/// The pubkey component is the seller's identity key in hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductAddress {
    kind: u32,
    pubkey: String,
    d_tag: String,
}

impl ProductAddress {
    /// Listing event kind.
    pub fn kind(&self) -> u32 {
        self.kind
    }

    /// Seller public key, lowercase hex.
    pub fn pubkey(&self) -> &str {
        &self.pubkey
    }

    /// Listing identifier within the seller's namespace.
    pub fn d_tag(&self) -> &str {
        &self.d_tag
    }
}

impl FromStr for ProductAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidProductAddress {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = s.splitn(3, ':');
        let (Some(kind), Some(pubkey), Some(d_tag)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected kind:pubkey:dTag"));
        };
        let kind = kind
            .parse::<u32>()
            .map_err(|_| invalid("kind is not an unsigned integer"))?;
        let pubkey = pubkey.to_ascii_lowercase();
        if !is_lower_hex(&pubkey, 64) {
            return Err(invalid("pubkey is not 64 hex characters"));
        }
        if d_tag.is_empty() {
            return Err(invalid("empty d tag"));
        }
        Ok(Self {
            kind,
            pubkey,
            d_tag: d_tag.to_string(),
        })
    }
}

impl TryFrom<String> for ProductAddress {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductAddress> for String {
    fn from(addr: ProductAddress) -> Self {
        addr.to_string()
    }
}

impl std::fmt::Display for ProductAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.pubkey, self.d_tag)
    }
}

/// Validate that a string is a non-negative decimal number (`"500"`, `"0.25"`).
pub fn is_valid_decimal(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut has_dot = false;
    let mut has_digit = false;
    for c in s.chars() {
        if c == '.' {
            if has_dot {
                return false;
            }
            has_dot = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else {
            return false;
        }
    }
    has_digit
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PK: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn event_id_accepts_lower_hex() {
        let id = EventId::parse(PK).unwrap();
        assert_eq!(id.as_str(), PK);
        assert_eq!(EventId::from_bytes(&id.to_bytes()), id);
    }

    #[test]
    fn event_id_rejects_uppercase_and_short() {
        assert!(EventId::parse(&PK.to_uppercase()).is_err());
        assert!(EventId::parse("abcd").is_err());
    }

    #[test]
    fn event_id_serde_validates() {
        let json = format!("\"{PK}\"");
        let id: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), json);
        assert!(serde_json::from_str::<EventId>("\"nothex\"").is_err());
    }

    #[test]
    fn order_id_rejects_empty_and_whitespace() {
        assert!(OrderId::new("o1").is_ok());
        assert!(OrderId::new("").is_err());
        assert!(OrderId::new("o 1").is_err());
    }

    #[test]
    fn product_address_parses_components() {
        let addr: ProductAddress = format!("30402:{PK}:red-scarf").parse().unwrap();
        assert_eq!(addr.kind(), 30402);
        assert_eq!(addr.pubkey(), PK);
        assert_eq!(addr.d_tag(), "red-scarf");
        assert_eq!(addr.to_string(), format!("30402:{PK}:red-scarf"));
    }

    #[test]
    fn product_address_d_tag_may_contain_colons() {
        let addr: ProductAddress = format!("30402:{PK}:a:b").parse().unwrap();
        assert_eq!(addr.d_tag(), "a:b");
    }

    #[test]
    fn product_address_rejects_bad_shapes() {
        assert!("30402".parse::<ProductAddress>().is_err());
        assert!(format!("x:{PK}:d").parse::<ProductAddress>().is_err());
        assert!("30402:abc:d".parse::<ProductAddress>().is_err());
        assert!(format!("30402:{PK}:").parse::<ProductAddress>().is_err());
    }

    #[test]
    fn decimal_validation() {
        assert!(is_valid_decimal("500"));
        assert!(is_valid_decimal("0.25"));
        assert!(is_valid_decimal("0"));
        assert!(!is_valid_decimal(""));
        assert!(!is_valid_decimal("-5"));
        assert!(!is_valid_decimal("1.2.3"));
        assert!(!is_valid_decimal("."));
        assert!(!is_valid_decimal("12abc"));
    }
}
