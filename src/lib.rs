//! # Barbershop
//!
//! A blocking client for the Barbershop priority counter server:
//! - Inline text commands (`UPDATE 5001 1\r\n`)
//! - Sentinel-tagged replies (`+ - : $ *`), decoded recursively
//! - Lazy connect, one automatic reconnect-and-resend on transport failure
//! - Per-command coercion of replies into application values
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Barbershop (client)                       │
//! │        execute(name, bytes, options) ── retry once           │
//! └──────────┬──────────────────────┬───────────────────────────┘
//!            │ encode               │ coerce
//!            ▼                      ▼
//!   ┌─────────────────┐    ┌──────────────────┐
//!   │    protocol     │    │     response     │
//!   │ Command, Reply, │    │ CoercionTable,   │
//!   │ ReplyDecoder    │    │ Value            │
//!   └────────┬────────┘    └──────────────────┘
//!            │ send / read_line / read_exact
//!            ▼
//!   ┌─────────────────┐
//!   │     network     │
//!   │ Transport, TCP  │
//!   │ Connection      │
//!   └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use barbershop::Barbershop;
//!
//! let client = Barbershop::connect("localhost", 8002);
//! client.update(5001, 1)?;
//! let next = client.next()?;
//! println!("next item: {}", next);
//! # Ok::<(), barbershop::BarbershopError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod protocol;
pub mod response;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BarbershopError, Result};
pub use config::{Config, DEFAULT_HOST, DEFAULT_PORT};
pub use client::{Barbershop, Pipeline};
pub use network::{Connection, ConnectionManager, Endpoint, Transport};
pub use protocol::{Command, DecodeMode, Reply};
pub use response::{CoercionTable, InfoValue, Options, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
