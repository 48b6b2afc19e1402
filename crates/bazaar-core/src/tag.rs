//! # Tags: Ordered Key/Value Tuples on Events
//!
//! A tag is a non-empty list of strings whose first element is its key
//! (`["order", "o1"]`, `["payment", "ecash", "cashuA...", "proof"]`). Tags keep
//! their wire order because they participate in event-id hashing.

use serde::{Deserialize, Serialize};

/// A single tag: key followed by zero or more values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Vec<String>);

impl Tag {
    /// Build a tag from a key and its values.
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = vec![key.into()];
        parts.extend(values.into_iter().map(Into::into));
        Self(parts)
    }

    /// Shorthand for a two-element tag.
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self(vec![key.into(), value.into()])
    }

    /// The tag key, or `""` for an empty tag received from the wire.
    pub fn key(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    /// The first value, if any.
    pub fn value(&self) -> Option<&str> {
        self.get(1)
    }

    /// Element at `index` (0 is the key).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// All values after the key.
    pub fn values(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// Raw elements.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Tag {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

/// Ordered list of tags with typed lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// Empty tag list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a tag, preserving order.
    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    /// Builder-style append.
    pub fn with(mut self, tag: Tag) -> Self {
        self.0.push(tag);
        self
    }

    /// First tag whose key matches.
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.0.iter().find(|t| t.key() == key)
    }

    /// First value of the first tag whose key matches.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(Tag::value)
    }

    /// Every tag whose key matches, in order.
    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.0.iter().filter(move |t| t.key() == key)
    }

    /// The `subject` tag, parsed. Unknown subjects yield `None`.
    pub fn subject(&self) -> Option<Subject> {
        self.value("subject").and_then(Subject::parse)
    }

    /// Iterate over all tags.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Value of the `subject` tag on a marketplace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subject {
    /// Buyer question about a listing.
    ListingInquiry,
    /// Payment for an order.
    OrderPayment,
    /// Shipping or contact details for an order.
    OrderInfo,
    /// Seller-requested change to the payment.
    PaymentChange,
    /// Seller acknowledgement of an order.
    OrderReceipt,
    /// Shipping update.
    ShippingInfo,
    /// Buyer confirms the order is complete.
    OrderCompleted,
    /// Message inside a dispute thread.
    DisputeMessage,
}

impl Subject {
    /// All subjects in wire order.
    pub const ALL: [Subject; 8] = [
        Self::ListingInquiry,
        Self::OrderPayment,
        Self::OrderInfo,
        Self::PaymentChange,
        Self::OrderReceipt,
        Self::ShippingInfo,
        Self::OrderCompleted,
        Self::DisputeMessage,
    ];

    /// Wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingInquiry => "listing-inquiry",
            Self::OrderPayment => "order-payment",
            Self::OrderInfo => "order-info",
            Self::PaymentChange => "payment-change",
            Self::OrderReceipt => "order-receipt",
            Self::ShippingInfo => "shipping-info",
            Self::OrderCompleted => "order-completed",
            Self::DisputeMessage => "dispute-message",
        }
    }

    /// Parse a wire string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|subject| subject.as_str() == s)
    }

    /// Whether messages with this subject feed order reconciliation.
    pub fn is_order_subject(&self) -> bool {
        matches!(
            self,
            Self::OrderPayment
                | Self::OrderInfo
                | Self::PaymentChange
                | Self::OrderReceipt
                | Self::ShippingInfo
                | Self::OrderCompleted
        )
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tags {
        Tags::new()
            .with(Tag::pair("subject", "order-payment"))
            .with(Tag::pair("order", "o1"))
            .with(Tag::new("amount", ["500", "sats"]))
            .with(Tag::pair("p", "aa"))
            .with(Tag::pair("p", "bb"))
    }

    #[test]
    fn value_returns_first_match() {
        let tags = sample();
        assert_eq!(tags.value("order"), Some("o1"));
        assert_eq!(tags.value("p"), Some("aa"));
        assert_eq!(tags.value("missing"), None);
    }

    #[test]
    fn all_returns_every_match_in_order() {
        let tags = sample();
        let ps: Vec<_> = tags.all("p").filter_map(Tag::value).collect();
        assert_eq!(ps, vec!["aa", "bb"]);
    }

    #[test]
    fn positional_access() {
        let tags = sample();
        let amount = tags.find("amount").unwrap();
        assert_eq!(amount.get(2), Some("sats"));
        assert_eq!(amount.values(), &["500".to_string(), "sats".to_string()]);
    }

    #[test]
    fn empty_tag_has_empty_key() {
        let tag = Tag::from(Vec::<String>::new());
        assert_eq!(tag.key(), "");
        assert!(tag.values().is_empty());
    }

    #[test]
    fn subject_parsing() {
        assert_eq!(sample().subject(), Some(Subject::OrderPayment));
        for subject in Subject::ALL {
            assert_eq!(Subject::parse(subject.as_str()), Some(subject));
        }
        assert_eq!(Subject::parse("gossip"), None);
    }

    #[test]
    fn order_subjects() {
        let qualifying: Vec<_> = Subject::ALL
            .into_iter()
            .filter(Subject::is_order_subject)
            .collect();
        assert_eq!(qualifying.len(), 6);
        assert!(!Subject::ListingInquiry.is_order_subject());
        assert!(!Subject::DisputeMessage.is_order_subject());
    }

    #[test]
    fn serializes_as_array_of_arrays() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"[["subject","order-payment"],["order","o1"]"#));
        let back: Tags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}
