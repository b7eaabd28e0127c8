//! Attachment upload flow: per-file coordinators over one shared session.
//!
//! This crate holds the transfer logic only. The session is reached
//! through the [`TransferLink`] trait, implemented for
//! [`vaultdrop_session::SessionChannel`] and by test doubles.
//!
//! # Flow
//!
//! 1. **Handshake**: announce path, size and hashes; wait for accept/reject
//! 2. **Stream**: send chunks stop-and-wait, retrying timed-out chunks
//! 3. **Finish**: the final chunk's ack completes the transfer
//!
//! The [`BatchOrchestrator`] runs one coordinator per file and returns
//! outcomes in submission order.

pub mod coordinator;
pub mod error;
pub mod link;
pub mod orchestrator;
pub mod reporter;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use coordinator::TransferCoordinator;
pub use error::{BatchError, TransferFailure};
pub use link::TransferLink;
pub use orchestrator::BatchOrchestrator;
pub use types::{BatchConfig, BatchEntry, TransferEvent, TransferOutcome, TransferPolicy, TransferState};
