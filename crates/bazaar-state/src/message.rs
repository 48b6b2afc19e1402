//! # Qualifying Messages
//!
//! A single parser turns a decrypted rumor into a typed
//! [`QualifyingMessage`]. Tag lists are scanned exactly once, here; the
//! merge step in [`crate::order`] only ever sees structured fields.
//!
//! ## Extraction rules
//!
//! | Field | Source | Default |
//! |-------|--------|---------|
//! | order id | `order` | rumor id |
//! | product | `a`, else `item` (`kind:pubkey:dTag`) | none |
//! | seller | product address pubkey | none |
//! | buyer | `b`, else author when author is not the seller | none |
//! | amount | `amount` value, currency in 3rd slot | required on payment / change; currency `sats` |
//! | quantity | `quantity`, positive integer | none (reads as 1) |
//! | status | `status` | by subject |
//! | payment | `payment` = `[type, reference, proof]` | none |
//! | ecash token | `payment` of type `ecash`, else first `cashuA…` word in content | none |

use bazaar_core::{
    is_valid_decimal, EventId, OrderId, ProductAddress, Subject, TagError, Tags, UnixTimestamp,
};
use bazaar_crypto::Ed25519PublicKey;
use bazaar_transport::Rumor;
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// Prefix of a serialized ecash token.
pub const ECASH_TOKEN_PREFIX: &str = "cashuA";

/// Currency assumed when an `amount` tag names none.
pub const DEFAULT_CURRENCY: &str = "sats";

/// A decimal amount with its currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Non-negative decimal string, e.g. `"500"`.
    pub value: String,
    /// Currency unit, e.g. `"sats"`.
    pub currency: String,
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Where the message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    /// Rumor id.
    pub rumor_id: EventId,
    /// Rumor author.
    pub author: Ed25519PublicKey,
    /// Rumor timestamp.
    pub created_at: UnixTimestamp,
}

/// Fields every qualifying message may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCommon {
    /// Provenance.
    pub meta: MessageMeta,
    /// Correlation key.
    pub order_id: OrderId,
    /// Product listing address.
    pub product: Option<ProductAddress>,
    /// Seller, derived from the product address.
    pub seller: Option<Ed25519PublicKey>,
    /// Buyer.
    pub buyer: Option<Ed25519PublicKey>,
    /// Status asserted by this message (explicit or subject default).
    pub status: OrderStatus,
    /// Order amount.
    pub amount: Option<Amount>,
    /// Number of units.
    pub quantity: Option<u32>,
    /// Product title.
    pub title: Option<String>,
    /// Bulk pricing option.
    pub bulk: Option<String>,
    /// Variant: size.
    pub size: Option<String>,
    /// Variant: volume.
    pub volume: Option<String>,
    /// Variant: weight.
    pub weight: Option<String>,
    /// Arbiter holding the escrow.
    pub escrow: Option<Ed25519PublicKey>,
    /// Donation amount.
    pub donation_amount: Option<String>,
    /// Donation percentage.
    pub donation_percentage: Option<String>,
}

/// Payment method and proof carried by payment-related messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentInfo {
    /// Method type (`ecash`, `lightning`, ...).
    pub method: Option<String>,
    /// Method-specific reference (invoice, token, address).
    pub reference: Option<String>,
    /// Proof of payment (preimage, txid).
    pub proof: Option<String>,
    /// Serialized ecash token, when one was found.
    pub ecash_token: Option<String>,
}

/// Delivery details carried by info and shipping messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
    /// Delivery address.
    pub address: Option<String>,
    /// Pickup location.
    pub pickup: Option<String>,
    /// Carrier tracking number.
    pub tracking: Option<String>,
    /// Carrier name.
    pub carrier: Option<String>,
    /// Estimated arrival.
    pub eta: Option<String>,
}

/// A rumor that feeds order reconciliation, parsed by subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualifyingMessage {
    /// `order-payment`: amount required.
    Payment {
        /// Shared fields.
        common: OrderCommon,
        /// Payment details.
        payment: PaymentInfo,
    },
    /// `order-info`: buyer delivery details.
    Info {
        /// Shared fields.
        common: OrderCommon,
        /// Delivery details.
        shipping: ShippingDetails,
    },
    /// `payment-change`: amount required.
    Change {
        /// Shared fields.
        common: OrderCommon,
        /// Revised payment details.
        payment: PaymentInfo,
    },
    /// `order-receipt`: seller acknowledgement.
    Receipt {
        /// Shared fields.
        common: OrderCommon,
    },
    /// `shipping-info`: shipping update.
    Shipping {
        /// Shared fields.
        common: OrderCommon,
        /// Tracking details.
        shipping: ShippingDetails,
    },
    /// `order-completed`: buyer confirms completion.
    Completion {
        /// Shared fields.
        common: OrderCommon,
    },
}

impl QualifyingMessage {
    /// Parse a rumor.
    ///
    /// Returns `Ok(None)` when the rumor's subject is absent or does not feed
    /// order reconciliation, and `Err` when it qualifies but is malformed.
    pub fn parse(rumor: &Rumor) -> Result<Option<Self>, TagError> {
        let tags = rumor.tags();
        let Some(subject) = tags.subject().filter(Subject::is_order_subject) else {
            return Ok(None);
        };

        let common = parse_common(rumor, subject)?;
        let message = match subject {
            Subject::OrderPayment => Self::Payment {
                common,
                payment: parse_payment(tags, rumor.content()),
            },
            Subject::PaymentChange => Self::Change {
                common,
                payment: parse_payment(tags, rumor.content()),
            },
            Subject::OrderInfo => Self::Info {
                common,
                shipping: parse_shipping(tags),
            },
            Subject::ShippingInfo => Self::Shipping {
                common,
                shipping: parse_shipping(tags),
            },
            Subject::OrderReceipt => Self::Receipt { common },
            Subject::OrderCompleted => Self::Completion { common },
            Subject::ListingInquiry | Subject::DisputeMessage => return Ok(None),
        };
        Ok(Some(message))
    }

    /// Shared fields.
    pub fn common(&self) -> &OrderCommon {
        match self {
            Self::Payment { common, .. }
            | Self::Info { common, .. }
            | Self::Change { common, .. }
            | Self::Receipt { common }
            | Self::Shipping { common, .. }
            | Self::Completion { common } => common,
        }
    }

    /// Subject this message was parsed from.
    pub fn subject(&self) -> Subject {
        match self {
            Self::Payment { .. } => Subject::OrderPayment,
            Self::Info { .. } => Subject::OrderInfo,
            Self::Change { .. } => Subject::PaymentChange,
            Self::Receipt { .. } => Subject::OrderReceipt,
            Self::Shipping { .. } => Subject::ShippingInfo,
            Self::Completion { .. } => Subject::OrderCompleted,
        }
    }

    /// Payment details, for payment and change messages.
    pub fn payment(&self) -> Option<&PaymentInfo> {
        match self {
            Self::Payment { payment, .. } | Self::Change { payment, .. } => Some(payment),
            _ => None,
        }
    }

    /// Delivery details, for info and shipping messages.
    pub fn shipping(&self) -> Option<&ShippingDetails> {
        match self {
            Self::Info { shipping, .. } | Self::Shipping { shipping, .. } => Some(shipping),
            _ => None,
        }
    }
}

/// Status a subject implies when the message carries no `status` tag.
pub fn default_status(subject: Subject) -> OrderStatus {
    match subject {
        Subject::OrderReceipt => OrderStatus::Confirmed,
        Subject::ShippingInfo => OrderStatus::Shipped,
        Subject::OrderCompleted => OrderStatus::Completed,
        _ => OrderStatus::Pending,
    }
}

/// First whitespace-delimited word of `content` that looks like an ecash token.
pub fn find_ecash_token(content: &str) -> Option<&str> {
    content
        .split(|c: char| c.is_whitespace() || c == '"' || c == '\'')
        .find(|word| word.starts_with(ECASH_TOKEN_PREFIX) && word.len() > ECASH_TOKEN_PREFIX.len())
}

fn parse_common(rumor: &Rumor, subject: Subject) -> Result<OrderCommon, TagError> {
    let tags = rumor.tags();

    let order_id = match non_empty(tags.value("order")) {
        Some(raw) => OrderId::new(raw)
            .map_err(|e| TagError::invalid("order", raw, e.to_string()))?,
        None => OrderId::from(rumor.id()),
    };

    let product = match non_empty(tags.value("a")).map(|v| ("a", v)).or_else(|| {
        non_empty(tags.value("item")).map(|v| ("item", v))
    }) {
        Some((tag, raw)) => Some(
            raw.parse::<ProductAddress>()
                .map_err(|e| TagError::invalid(tag, raw, e.to_string()))?,
        ),
        None => None,
    };
    let seller = match &product {
        Some(addr) => Some(parse_pubkey("a", addr.pubkey())?),
        None => None,
    };

    let buyer = match non_empty(tags.value("b")) {
        Some(raw) => Some(parse_pubkey("b", raw)?),
        None => match seller {
            Some(seller) if seller != *rumor.author() => Some(*rumor.author()),
            _ => None,
        },
    };

    let amount = match tags.find("amount") {
        Some(tag) => {
            let value = tag.value().unwrap_or("");
            if !is_valid_decimal(value) {
                return Err(TagError::invalid(
                    "amount",
                    value,
                    "expected a non-negative decimal",
                ));
            }
            let currency = non_empty(tag.get(2)).unwrap_or(DEFAULT_CURRENCY);
            Some(Amount {
                value: value.to_string(),
                currency: currency.to_string(),
            })
        }
        None => None,
    };
    if amount.is_none() && matches!(subject, Subject::OrderPayment | Subject::PaymentChange) {
        return Err(TagError::missing(subject.as_str(), "amount"));
    }

    let quantity = match non_empty(tags.value("quantity")) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                return Err(TagError::invalid(
                    "quantity",
                    raw,
                    "expected a positive integer",
                ))
            }
        },
        None => None,
    };

    let status = match non_empty(tags.value("status")) {
        Some(raw) => OrderStatus::parse(raw)?,
        None => default_status(subject),
    };

    let escrow = match non_empty(tags.value("escrow")) {
        Some(raw) => Some(parse_pubkey("escrow", raw)?),
        None => None,
    };

    Ok(OrderCommon {
        meta: MessageMeta {
            rumor_id: rumor.id().clone(),
            author: *rumor.author(),
            created_at: rumor.created_at(),
        },
        order_id,
        product,
        seller,
        buyer,
        status,
        amount,
        quantity,
        title: text(tags, "title"),
        bulk: text(tags, "bulk"),
        size: text(tags, "size"),
        volume: text(tags, "volume"),
        weight: text(tags, "weight"),
        escrow,
        donation_amount: decimal(tags, "donation_amount")?,
        donation_percentage: decimal(tags, "donation_percentage")?,
    })
}

fn parse_payment(tags: &Tags, content: &str) -> PaymentInfo {
    let mut info = PaymentInfo::default();
    if let Some(tag) = tags.find("payment") {
        info.method = non_empty(tag.get(1)).map(str::to_string);
        info.reference = non_empty(tag.get(2)).map(str::to_string);
        info.proof = non_empty(tag.get(3)).map(str::to_string);
    }
    info.ecash_token = match (info.method.as_deref(), info.reference.as_deref()) {
        (Some("ecash"), Some(reference)) if reference.starts_with(ECASH_TOKEN_PREFIX) => {
            Some(reference.to_string())
        }
        _ => find_ecash_token(content).map(str::to_string),
    };
    info
}

fn parse_shipping(tags: &Tags) -> ShippingDetails {
    ShippingDetails {
        address: text(tags, "address"),
        pickup: text(tags, "pickup"),
        tracking: text(tags, "tracking"),
        carrier: text(tags, "carrier"),
        eta: text(tags, "eta"),
    }
}

fn parse_pubkey(tag: &str, raw: &str) -> Result<Ed25519PublicKey, TagError> {
    Ed25519PublicKey::from_hex(raw).map_err(|e| TagError::invalid(tag, raw, e.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text(tags: &Tags, key: &str) -> Option<String> {
    non_empty(tags.value(key)).map(str::to_string)
}

fn decimal(tags: &Tags, key: &str) -> Result<Option<String>, TagError> {
    match non_empty(tags.value(key)) {
        Some(raw) if is_valid_decimal(raw) => Ok(Some(raw.to_string())),
        Some(raw) => Err(TagError::invalid(key, raw, "expected a non-negative decimal")),
        None => Ok(None),
    }
}
