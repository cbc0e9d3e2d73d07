//! Command definitions
//!
//! A command is its name plus ordered arguments, encoded as one inline line.

use std::fmt::Display;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BarbershopError, Result};

/// Line terminator for requests and replies
pub const CRLF: &[u8] = b"\r\n";

/// An inline command
///
/// The name doubles as the first wire token and as the key for reply
/// coercion lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Build a command from pre-split tokens; the first token is the name
    pub fn from_args<I, A>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: Display,
    {
        let mut tokens = tokens.into_iter();
        let name = tokens
            .next()
            .ok_or_else(|| BarbershopError::InvalidData("empty command".to_string()))?;
        Ok(tokens.fold(Command::new(name.to_string()), |cmd, token| cmd.arg(token)))
    }

    /// Append an argument rendered through its `Display` form
    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Encode to the inline wire format: space-joined tokens plus CRLF
    ///
    /// Tokens containing a line terminator would split the frame and are
    /// rejected.
    pub fn encode(&self) -> Result<Bytes> {
        if self.name.is_empty() {
            return Err(BarbershopError::InvalidData("empty command name".to_string()));
        }

        let len = self.name.len() + self.args.iter().map(|a| a.len() + 1).sum::<usize>();
        let mut buf = BytesMut::with_capacity(len + CRLF.len());

        for (idx, token) in std::iter::once(&self.name).chain(&self.args).enumerate() {
            if token.contains(['\r', '\n']) {
                return Err(BarbershopError::InvalidData(format!(
                    "{}: argument {} contains a line terminator",
                    self.name, idx
                )));
            }
            if idx > 0 {
                buf.put_u8(b' ');
            }
            buf.put_slice(token.as_bytes());
        }
        buf.put_slice(CRLF);

        Ok(buf.freeze())
    }
}
