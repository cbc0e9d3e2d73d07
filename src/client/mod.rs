//! Client Module
//!
//! The execution driver: encode, send, decode, retry once, coerce.
//!
//! ## Responsibilities
//! - Serialize a command into the inline wire format
//! - Drive one request through send and reply decoding
//! - Reconnect and resend once when the transport fails
//! - Apply the per-command coercion rule to the decoded reply

mod pipeline;

use std::fmt::Display;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, DEFAULT_MAX_REPLY_DEPTH};
use crate::error::Result;
use crate::network::{Connection, ConnectionManager, Endpoint, Transport};
use crate::protocol::{read_info_body, Command, DecodeMode, ReplyDecoder};
use crate::response::{rules, CoercionTable, Options, Value, STANDARD_RULES};

pub use pipeline::Pipeline;

/// Client handle for one Barbershop server
///
/// ## Concurrency Model
///
/// The transport sits behind a mutex that is held for a whole
/// send/decode cycle (including the retry), so replies can never be read
/// by the wrong caller. Clients built from the same `ConnectionManager`
/// and endpoint share that mutex.
pub struct Barbershop<T: Transport = Connection> {
    /// The transport, possibly shared with other clients
    connection: Arc<Mutex<T>>,

    /// Command name to coercion rule
    rules: Arc<CoercionTable>,

    /// Bound on multi-bulk nesting
    max_reply_depth: usize,
}

impl Barbershop<Connection> {
    /// Create a client with its own (lazily opened) connection
    pub fn new(config: Config) -> Self {
        let max_reply_depth = config.max_reply_depth;
        Self::with_transport(Connection::from_config(&config)).with_max_reply_depth(max_reply_depth)
    }

    /// Create a client for `host:port` with default settings
    pub fn connect(host: impl Into<String>, port: u16) -> Self {
        Self::new(Config::builder().host(host).port(port).build())
    }

    /// Create a client using the manager's connection for `endpoint`
    pub fn from_manager(manager: &ConnectionManager, endpoint: &Endpoint) -> Self {
        Self::from_shared(manager.get_connection(endpoint))
    }
}

impl<T: Transport> Barbershop<T> {
    /// Create a client that exclusively owns `transport`
    pub fn with_transport(transport: T) -> Self {
        Self::from_shared(Arc::new(Mutex::new(transport)))
    }

    /// Create a client over an already shared transport
    pub fn from_shared(connection: Arc<Mutex<T>>) -> Self {
        Self {
            connection,
            rules: Arc::clone(&STANDARD_RULES),
            max_reply_depth: DEFAULT_MAX_REPLY_DEPTH,
        }
    }

    /// Replace the coercion table
    pub fn with_rules(mut self, rules: Arc<CoercionTable>) -> Self {
        self.rules = rules;
        self
    }

    /// Bound multi-bulk nesting (at least 1)
    pub fn with_max_reply_depth(mut self, max_reply_depth: usize) -> Self {
        self.max_reply_depth = max_reply_depth.max(1);
        self
    }

    /// The underlying transport
    pub fn connection(&self) -> &Arc<Mutex<T>> {
        &self.connection
    }

    pub fn rules(&self) -> &CoercionTable {
        &self.rules
    }

    pub fn host(&self) -> String {
        self.connection.lock().endpoint().host.clone()
    }

    pub fn port(&self) -> u16 {
        self.connection.lock().endpoint().port
    }

    /// Close the socket; the next command reconnects
    pub fn disconnect(&self) {
        self.connection.lock().disconnect();
    }

    // =========================================================================
    // Command Execution
    // =========================================================================

    /// Send pre-encoded bytes and return the coerced reply
    ///
    /// A connection failure on the first attempt forces a disconnect and
    /// exactly one full resend; the second failure is what the caller sees.
    /// Server errors and malformed replies are never retried.
    pub fn execute(&self, command_name: &str, encoded: &[u8], options: &Options) -> Result<Value> {
        let decoder = self.decoder(DecodeMode::Strict);
        let reply = self.with_retry(command_name, encoded, |conn| {
            decoder.decode(conn, command_name)
        })?;
        self.rules.apply(command_name, reply, options)
    }

    /// Run one send/read cycle under the transport lock, retrying once
    fn with_retry<R, F>(&self, command_name: &str, encoded: &[u8], mut read: F) -> Result<R>
    where
        F: FnMut(&mut T) -> Result<R>,
    {
        let mut conn = self.connection.lock();
        let result = match round_trip(&mut *conn, command_name, encoded, &mut read) {
            Err(e) if e.is_connection_failure() => {
                tracing::warn!("{} failed ({}), reconnecting and retrying once", command_name, e);
                conn.disconnect();
                round_trip(&mut *conn, command_name, encoded, &mut read)
            }
            other => other,
        };
        result.map_err(|e| e.with_command(command_name))
    }

    /// Encode and execute a command
    pub fn execute_command(&self, command: &Command, options: &Options) -> Result<Value> {
        let encoded = command.encode()?;
        self.execute(command.name(), &encoded, options)
    }

    /// Execute pre-split tokens; the first token is the command name
    pub fn format_inline<I, A>(&self, tokens: I) -> Result<Value>
    where
        I: IntoIterator<Item = A>,
        A: Display,
    {
        let command = Command::from_args(tokens)?;
        self.execute_command(&command, &Options::default())
    }

    /// Start a batch of commands sent in one write
    pub fn pipeline(&self) -> Pipeline<'_, T> {
        Pipeline::new(self)
    }

    fn decoder(&self, mode: DecodeMode) -> ReplyDecoder {
        ReplyDecoder::new(mode).with_max_depth(self.max_reply_depth)
    }

    // =========================================================================
    // Barbershop Commands
    // =========================================================================

    /// Add `amount` to an item's score, creating the item if needed
    pub fn update(&self, item: impl Display, amount: i64) -> Result<Value> {
        self.run(Command::new("UPDATE").arg(item).arg(amount))
    }

    /// Pop the highest-scored item (`-1` when empty)
    pub fn next(&self) -> Result<Value> {
        self.run(Command::new("NEXT"))
    }

    /// Show the highest-scored item without removing it
    pub fn peek(&self) -> Result<Value> {
        self.run(Command::new("PEEK"))
    }

    /// Show one item's score (`-1` when unknown)
    pub fn score(&self, item: impl Display) -> Result<Value> {
        self.run(Command::new("SCORE").arg(item))
    }

    /// Server statistics
    ///
    /// The server answers INFO with bare `key:value` lines rather than a
    /// framed reply, so the body is read line by line before parsing.
    pub fn info(&self) -> Result<Value> {
        let encoded = Command::new("INFO").encode()?;
        let body = self.with_retry("INFO", &encoded, |conn| read_info_body(conn, "INFO"))?;
        Ok(Value::Info(rules::parse_info(&body)))
    }

    /// `true` when the server answers `PONG`
    pub fn ping(&self) -> Result<Value> {
        self.run(Command::new("PING"))
    }

    fn run(&self, command: Command) -> Result<Value> {
        self.execute_command(&command, &Options::default())
    }
}

/// One send followed by one read
fn round_trip<T, R, F>(transport: &mut T, command_name: &str, encoded: &[u8], read: &mut F) -> Result<R>
where
    T: Transport + ?Sized,
    F: FnMut(&mut T) -> Result<R>,
{
    tracing::trace!("Sending {} ({} bytes) to {}", command_name, encoded.len(), transport.endpoint());
    transport.send(encoded)?;
    read(transport)
}
