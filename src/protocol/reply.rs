//! Reply definitions
//!
//! The universal decoded shape of a server reply, before any
//! command-specific coercion.

use bytes::Bytes;

use crate::error::BarbershopError;

/// Sentinel bytes that open every reply line
pub mod sentinel {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const MULTI_BULK: u8 = b'*';
}

/// A decoded reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `$-1` or `*-1`
    Nil,

    /// `+` line
    SimpleString(String),

    /// `:` line
    Integer(i64),

    /// `$N` followed by N raw bytes; the length is `bytes.len()`
    BulkString(Bytes),

    /// `*N` followed by N nested replies
    MultiBulk(Vec<Reply>),

    /// A server error captured inside a multi-bulk in pipeline mode
    Error(BarbershopError),
}

impl Reply {
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Text of a status or bulk reply, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::SimpleString(s) => Some(s.as_str()),
            Reply::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Nil => "nil",
            Reply::SimpleString(_) => "status",
            Reply::Integer(_) => "integer",
            Reply::BulkString(_) => "bulk",
            Reply::MultiBulk(_) => "multi-bulk",
            Reply::Error(_) => "error",
        }
    }
}
