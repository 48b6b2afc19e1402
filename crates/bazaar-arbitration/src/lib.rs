//! # bazaar-arbitration: Dispute Resolution
//!
//! Escrowed marketplace payments are ecash tokens held pending a dispute.
//! This crate tracks disputes and lets the designated arbiter release the
//! escrow to one side:
//!
//! - **Ecash** (`ecash.rs`): `cashuA` token codec and the opaque proof type.
//!
//! - **Signer** (`signer.rs`): one arbiter signature per proof secret,
//!   bundled with the unchanged proofs as a [`RedemptionShare`].
//!
//! - **Dispute** (`dispute.rs`): `Open → Ruled → Closed` lifecycle with an
//!   ordered, de-duplicated message thread and a transition log.
//!
//! - **Manager** (`manager.rs`): routes rumors into threads, resolves the
//!   order's escrow from payment history, and runs the ruling workflow.
//!
//! ## Crate Policy
//!
//! - The redemption share only ever travels gift-wrapped to the winner.
//!   The public `dispute-resolution` marker carries the outcome, never the
//!   share.
//! - Rulings are final. The public marker is published before the share
//!   leaves, so a ruling is never released without a durable record.

pub mod dispute;
pub mod ecash;
pub mod error;
pub mod manager;
pub mod signer;

pub use dispute::{Dispute, DisputeState, Participants, Party, Ruling, TransitionRecord};
pub use ecash::{EcashProof, EcashToken, MintProofs};
pub use error::ArbitrationError;
pub use manager::{
    resolve_escrow_token, DisputeIngest, DisputeManager, RulingContext, RulingReceipt,
};
pub use signer::{sign_partial, verify_redemption_share, RedemptionShare};
