//! Network Module
//!
//! Blocking TCP transport to a Barbershop server.
//!
//! ## Architecture
//! - `Transport` trait: the only surface the protocol engine uses
//! - `Connection`: lazy-connecting TCP implementation
//! - `ConnectionManager`: one shared connection per endpoint

mod transport;
mod connection;
mod manager;

pub use transport::{Endpoint, Transport, MAX_LINE_LEN};
pub use connection::{Connection, SocketOptions};
pub use manager::{ConnectionManager, SharedConnection};
