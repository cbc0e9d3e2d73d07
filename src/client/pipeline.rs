//! Pipeline
//!
//! Queues commands, writes them in one call, then drains one reply per
//! command in lockstep. Per-command failures are captured in place so a bad
//! reply never shifts the replies behind it.

use bytes::BytesMut;

use crate::error::Result;
use crate::network::Transport;
use crate::protocol::{Command, DecodeMode};
use crate::response::{Options, Value};
use super::Barbershop;

/// A batch of commands bound to one client
pub struct Pipeline<'a, T: Transport> {
    client: &'a Barbershop<T>,
    commands: Vec<(Command, Options)>,
}

impl<'a, T: Transport> Pipeline<'a, T> {
    pub(super) fn new(client: &'a Barbershop<T>) -> Self {
        Self {
            client,
            commands: Vec::new(),
        }
    }

    /// Queue a command with default options
    pub fn command(self, command: Command) -> Self {
        self.command_with(command, Options::default())
    }

    /// Queue a command with explicit coercion options
    pub fn command_with(mut self, command: Command, options: Options) -> Self {
        self.commands.push((command, options));
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Send every queued command and collect one value per command
    ///
    /// Server errors and coercion failures become `Value::Error` at their
    /// position. A connection failure or a malformed reply (which drops the
    /// connection) aborts the batch without resending: some commands may
    /// already have been applied.
    pub fn execute(self) -> Result<Vec<Value>> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut buf = BytesMut::new();
        for (command, _) in &self.commands {
            buf.extend_from_slice(&command.encode()?);
        }

        let decoder = self.client.decoder(DecodeMode::Pipeline);
        let mut conn = self.client.connection.lock();
        tracing::trace!(
            "Sending pipeline of {} commands ({} bytes) to {}",
            self.commands.len(),
            buf.len(),
            conn.endpoint()
        );
        conn.send(&buf)?;

        let mut values = Vec::with_capacity(self.commands.len());
        for (command, options) in &self.commands {
            let value = match decoder.decode(&mut *conn, command.name()) {
                Ok(reply) => self
                    .client
                    .rules
                    .apply(command.name(), reply, options)
                    .unwrap_or_else(Value::Error),
                // Once the connection is gone the replies behind this one
                // are lost too; report the cause instead of "not connected"
                Err(e) if e.is_connection_failure() || !conn.is_connected() => {
                    return Err(e.with_command(command.name()));
                }
                Err(e) => Value::Error(e),
            };
            values.push(value);
        }
        Ok(values)
    }
}
