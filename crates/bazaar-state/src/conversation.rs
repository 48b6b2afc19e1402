//! Direct-message threads, grouped by counterparty.

use std::collections::{BTreeMap, HashMap};

use bazaar_core::{EventId, EventKind, UnixTimestamp};
use bazaar_crypto::Ed25519PublicKey;
use bazaar_transport::Rumor;
use parking_lot::RwLock;

type Thread = BTreeMap<(UnixTimestamp, EventId), Rumor>;

/// Summary line for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// The other party.
    pub counterparty: Ed25519PublicKey,
    /// Messages in the thread.
    pub messages: usize,
    /// Timestamp of the newest message.
    pub last_message_at: UnixTimestamp,
}

/// Decrypted direct messages for one identity, grouped by counterparty.
///
/// Threads are ordered by `(created_at, id)`; re-delivery of a rumor already
/// in its thread is a no-op.
#[derive(Debug)]
pub struct ConversationIndex {
    own: Ed25519PublicKey,
    threads: RwLock<HashMap<Ed25519PublicKey, Thread>>,
}

impl ConversationIndex {
    /// Empty index for `own`.
    pub fn new(own: Ed25519PublicKey) -> Self {
        Self {
            own,
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// Add a rumor. Returns `false` for non-DM kinds, rumors with no
    /// identifiable counterparty, and duplicates.
    pub fn ingest(&self, rumor: &Rumor) -> bool {
        if rumor.kind() != EventKind::RumorDm {
            return false;
        }
        let Some(counterparty) = self.counterparty(rumor) else {
            return false;
        };
        let key = (rumor.created_at(), rumor.id().clone());
        let mut threads = self.threads.write();
        let thread = threads.entry(counterparty).or_default();
        if thread.contains_key(&key) {
            return false;
        }
        thread.insert(key, rumor.clone());
        true
    }

    /// Conversations, most recently active first.
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        let threads = self.threads.read();
        let mut out: Vec<ConversationSummary> = threads
            .iter()
            .filter_map(|(pk, thread)| {
                let ((last, _), _) = thread.last_key_value()?;
                Some(ConversationSummary {
                    counterparty: *pk,
                    messages: thread.len(),
                    last_message_at: *last,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.counterparty.cmp(&b.counterparty))
        });
        out
    }

    /// Messages exchanged with `counterparty`, oldest first.
    pub fn messages(&self, counterparty: &Ed25519PublicKey) -> Vec<Rumor> {
        self.threads
            .read()
            .get(counterparty)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    fn counterparty(&self, rumor: &Rumor) -> Option<Ed25519PublicKey> {
        if *rumor.author() != self.own {
            return Some(*rumor.author());
        }
        rumor
            .tags()
            .all("p")
            .filter_map(|t| t.value())
            .find_map(|v| Ed25519PublicKey::from_hex(v).ok())
    }
}
