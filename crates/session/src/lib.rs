//! Session channel to the vault sync service.
//!
//! One authenticated WebSocket per batch, shared by every transfer. A
//! single write pump owns the socket's sink; the read pump demultiplexes
//! inbound frames to transfers by `transferId` through the [`RouteTable`].

mod client;
pub mod error;
mod pumps;
pub(crate) mod reconnection;
pub mod routes;
pub mod types;

pub use client::SessionChannel;
pub use error::SessionError;
pub use reconnection::connect_with_retry;
pub use routes::{RouteEvent, RouteTable, TransferRoute};
pub use types::{ConnectionState, ReconnectConfig, SessionConfig};
