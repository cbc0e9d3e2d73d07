//! Transport seam
//!
//! The execution driver and reply decoder only ever talk to a `Transport`,
//! so the TCP connection can be swapped for an in-memory one in tests.

use std::fmt;

use bytes::Bytes;

use crate::error::Result;

/// Longest reply line a transport accepts (64 KB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Identifies a server: one Transport exists per endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A blocking byte stream to one endpoint
///
/// ## State Machine
/// ```text
///   Disconnected ──connect()/send()──▶ Connected
///        ▲                                │
///        └──── disconnect() / I/O error ──┘
/// ```
pub trait Transport {
    /// The endpoint this transport talks to
    fn endpoint(&self) -> &Endpoint;

    /// Whether a live stream is currently held
    fn is_connected(&self) -> bool;

    /// Open the stream; no-op when already connected
    fn connect(&mut self) -> Result<()>;

    /// Close the stream; no-op when already disconnected
    fn disconnect(&mut self);

    /// Write all bytes, connecting first if needed
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one line including its terminator
    ///
    /// Returns an empty buffer when the peer closed the stream. A line
    /// longer than `MAX_LINE_LEN` is a connection failure and disconnects.
    fn read_line(&mut self) -> Result<Bytes>;

    /// Read exactly `len` bytes
    fn read_exact(&mut self, len: usize) -> Result<Bytes>;
}
