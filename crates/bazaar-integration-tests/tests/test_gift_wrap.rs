//! Cross-crate tests for gift-wrapped messaging.
//!
//! Exercises seal, wrap, and unwrap together with the outbox and an
//! in-memory relay: round trips, sender self-copies, envelope privacy, and
//! rejection of forged or misaddressed envelopes.

use bazaar_core::{EventKind, Tag, Tags, UnixTimestamp};
use bazaar_crypto::{Ed25519KeyPair, EphemeralKeyProvider};
use bazaar_transport::{
    seal, try_unwrap, unwrap, unwrap_all, wrap, EventFilter, MemoryRelay, Outbox, Rumor,
    Transport, UnwrapError, WrapPolicy,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dm(author: &Ed25519KeyPair, to: &Ed25519KeyPair, content: &str) -> Rumor {
    Rumor::new(
        author.public_key(),
        UnixTimestamp::now(),
        EventKind::RumorDm,
        Tags::new()
            .with(Tag::pair("p", to.public_key().to_hex()))
            .with(Tag::pair("subject", "listing-inquiry")),
        content,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn outbox_round_trip_reaches_recipient_and_sender() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let relay = MemoryRelay::new();
    let mut keys = EphemeralKeyProvider::new();
    let rumor = dm(&alice, &bob, "still for sale?");

    let receipt = Outbox::new(WrapPolicy::new(3_600))
        .send(&relay, &mut keys, &rumor, &alice, &bob.public_key())
        .unwrap();
    assert_eq!(receipt.rumor_id, *rumor.id());
    assert_eq!(receipt.envelope_ids.len(), 2);

    let bob_inbox = relay.fetch(&EventFilter::inbox(bob.public_key())).unwrap();
    assert_eq!(unwrap_all(&bob_inbox, &bob), vec![rumor.clone()]);

    let alice_inbox = relay.fetch(&EventFilter::inbox(alice.public_key())).unwrap();
    assert_eq!(unwrap_all(&alice_inbox, &alice), vec![rumor]);
}

#[test]
fn envelopes_hide_the_sender() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let relay = MemoryRelay::new();
    let mut keys = EphemeralKeyProvider::new();
    let rumor = dm(&alice, &bob, "hello");
    let before = UnixTimestamp::now();
    Outbox::new(WrapPolicy::new(172_800))
        .send(&relay, &mut keys, &rumor, &alice, &bob.public_key())
        .unwrap();
    let after = UnixTimestamp::now();

    let events = relay.events();
    let mut signers = std::collections::HashSet::new();
    for e in &events {
        assert_eq!(e.kind, EventKind::Wrap);
        assert_ne!(e.pubkey, alice.public_key());
        assert!(keys.has_issued(&e.pubkey));
        assert!(signers.insert(e.pubkey));
        assert_eq!(e.tags.len(), 1);
        assert_eq!(e.tags.value("p").map(str::len), Some(64));
        assert!(!e.content.contains("hello"));
        assert!(e.created_at <= after);
        assert!(e.created_at >= before.saturating_sub(172_800));
    }
}

#[test]
fn self_copy_can_be_disabled() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let relay = MemoryRelay::new();
    let mut keys = EphemeralKeyProvider::new();
    let rumor = dm(&alice, &bob, "one copy");

    Outbox::new(WrapPolicy::new(0))
        .with_self_copy(false)
        .send(&relay, &mut keys, &rumor, &alice, &bob.public_key())
        .unwrap();
    assert_eq!(relay.len(), 1);
    let alice_inbox = relay.fetch(&EventFilter::inbox(alice.public_key())).unwrap();
    assert!(alice_inbox.is_empty());
}

#[test]
fn duplicate_envelopes_collapse_to_one_rumor() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let rumor = dm(&alice, &bob, "twice");
    let mut keys = EphemeralKeyProvider::new();
    let policy = WrapPolicy::new(60);

    let envelopes: Vec<_> = (0..3)
        .map(|_| {
            let sealed = seal(&rumor, &alice, &bob.public_key()).unwrap();
            wrap(&sealed, keys.next_key().unwrap(), &bob.public_key(), &policy)
                .unwrap()
                .into_event()
        })
        .collect();
    assert_ne!(envelopes[0].id, envelopes[1].id);
    assert_eq!(unwrap_all(&envelopes, &bob), vec![rumor]);
}

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

#[test]
fn seal_signed_by_someone_else_is_an_identity_mismatch() {
    let alice = Ed25519KeyPair::generate();
    let mallory = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let forged = dm(&alice, &bob, "send the goods to mallory");
    let mut keys = EphemeralKeyProvider::new();

    let sealed = seal(&forged, &mallory, &bob.public_key()).unwrap();
    let envelope = wrap(
        &sealed,
        keys.next_key().unwrap(),
        &bob.public_key(),
        &WrapPolicy::new(0),
    )
    .unwrap()
    .into_event();

    let err = try_unwrap(&envelope, &bob).unwrap_err();
    assert!(matches!(err, UnwrapError::IdentityMismatch { .. }));
    assert!(unwrap(&envelope, &bob).is_none());
}

#[test]
fn envelope_for_someone_else_does_not_open() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let eve = Ed25519KeyPair::generate();
    let mut keys = EphemeralKeyProvider::new();
    let envelopes = Outbox::new(WrapPolicy::new(0))
        .with_self_copy(false)
        .envelopes(&mut keys, &dm(&alice, &bob, "private"), &alice, &bob.public_key())
        .unwrap();

    let err = try_unwrap(&envelopes[0], &eve).unwrap_err();
    assert!(err.is_decryption());
    assert!(unwrap_all(&envelopes, &eve).is_empty());
}

#[test]
fn tampered_envelope_is_rejected() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let mut keys = EphemeralKeyProvider::new();
    let mut envelope = Outbox::new(WrapPolicy::new(0))
        .with_self_copy(false)
        .envelopes(&mut keys, &dm(&alice, &bob, "x"), &alice, &bob.public_key())
        .unwrap()
        .remove(0);
    envelope.created_at = envelope.created_at.saturating_sub(1);

    assert!(matches!(
        try_unwrap(&envelope, &bob),
        Err(UnwrapError::InvalidSignature { layer: "wrap", .. })
    ));
}

#[test]
fn relay_rejects_unsigned_events() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let mut keys = EphemeralKeyProvider::new();
    let mut envelope = Outbox::new(WrapPolicy::new(0))
        .envelopes(&mut keys, &dm(&alice, &bob, "x"), &alice, &bob.public_key())
        .unwrap()
        .remove(0);
    envelope.content.push('A');

    let relay = MemoryRelay::new();
    assert!(relay.publish(&envelope).is_err());
    assert!(relay.is_empty());
}

#[test]
fn outbox_refuses_rumor_from_another_author() {
    let alice = Ed25519KeyPair::generate();
    let bob = Ed25519KeyPair::generate();
    let mut keys = EphemeralKeyProvider::new();
    let rumor = dm(&alice, &bob, "not yours");
    let result = Outbox::default().envelopes(&mut keys, &rumor, &bob, &alice.public_key());
    assert!(result.is_err());
    assert_eq!(keys.issued_count(), 0);
}
