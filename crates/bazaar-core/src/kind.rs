//! Event kinds understood by the messaging core.

use serde::{Deserialize, Serialize};

/// Numeric event kind.
///
/// Known kinds get named variants; anything else round-trips through
/// [`EventKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum EventKind {
    /// Inner signed layer holding an encrypted rumor.
    Seal,
    /// Plain multi-purpose direct message.
    RumorDm,
    /// Outer gift-wrap envelope signed by an ephemeral key.
    Wrap,
    /// Opens a dispute thread between buyer, seller, and arbiter.
    DisputeOpen,
    /// Public marker announcing a dispute ruling.
    DisputeResolution,
    /// Any kind this crate does not interpret.
    Other(u32),
}

impl EventKind {
    /// The wire number for this kind.
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Seal => 13,
            Self::RumorDm => 14,
            Self::Wrap => 1059,
            Self::DisputeOpen => 7301,
            Self::DisputeResolution => 7302,
            Self::Other(n) => n,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seal => "seal",
            Self::RumorDm => "rumor-dm",
            Self::Wrap => "wrap",
            Self::DisputeOpen => "dispute-open",
            Self::DisputeResolution => "dispute-resolution",
            Self::Other(_) => "other",
        }
    }
}

impl From<u32> for EventKind {
    fn from(n: u32) -> Self {
        match n {
            13 => Self::Seal,
            14 => Self::RumorDm,
            1059 => Self::Wrap,
            7301 => Self::DisputeOpen,
            7302 => Self::DisputeResolution,
            other => Self::Other(other),
        }
    }
}

impl From<EventKind> for u32 {
    fn from(kind: EventKind) -> Self {
        kind.as_u32()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Other(n) => write!(f, "kind:{n}"),
            known => f.write_str(known.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_round_trip_through_u32() {
        for kind in [
            EventKind::Seal,
            EventKind::RumorDm,
            EventKind::Wrap,
            EventKind::DisputeOpen,
            EventKind::DisputeResolution,
        ] {
            assert_eq!(EventKind::from(kind.as_u32()), kind);
        }
    }

    #[test]
    fn unknown_kind_is_other() {
        assert_eq!(EventKind::from(30402), EventKind::Other(30402));
        assert_eq!(EventKind::Other(30402).to_string(), "kind:30402");
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&EventKind::Wrap).unwrap(), "1059");
        let k: EventKind = serde_json::from_str("13").unwrap();
        assert_eq!(k, EventKind::Seal);
    }
}
