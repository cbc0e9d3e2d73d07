//! Protocol codec
//!
//! Recursive-descent decoder for sentinel-tagged replies.
//!
//! ## Wire Format
//!
//! ```text
//! +OK\r\n                       status        -> SimpleString("OK")
//! -ERR no such key\r\n          error         -> Err(Response("no such key"))
//! :42\r\n                       integer       -> Integer(42)
//! $5\r\nhello\r\n               bulk          -> BulkString("hello")
//! $-1\r\n                       null bulk     -> Nil
//! *2\r\n:1\r\n:2\r\n            multi-bulk    -> MultiBulk([Integer(1), Integer(2)])
//! *-1\r\n                       null multi    -> Nil
//! ```
//!
//! Every byte the server declares is consumed, so the next reply on the
//! connection starts exactly where this one ended. When that cannot be
//! guaranteed (a malformed header, an oversized bulk, an aborted
//! multi-bulk) the transport is disconnected before the error is returned.

use bytes::Bytes;

use crate::config::DEFAULT_MAX_REPLY_DEPTH;
use crate::error::{BarbershopError, Result};
use crate::network::Transport;
use super::reply::{sentinel, Reply};

/// Largest bulk payload the decoder will allocate for (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Prefix the server puts in front of generic error messages
const ERR_PREFIX: &str = "ERR ";

/// The field the server writes last in an INFO body
const INFO_LAST_FIELD: &str = "pools";

/// Upper bound on bare INFO lines read before giving up
const MAX_INFO_LINES: usize = 64;

/// How element-level failures inside a multi-bulk are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// First failure aborts the whole decode
    #[default]
    Strict,

    /// Server errors inside a multi-bulk are captured as `Reply::Error`
    /// and decoding continues, so the stream stays in lockstep with what
    /// the server declared
    Pipeline,
}

/// Reads one reply from a transport
#[derive(Debug, Clone, Copy)]
pub struct ReplyDecoder {
    mode: DecodeMode,
    max_depth: usize,
}

impl ReplyDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            max_depth: DEFAULT_MAX_REPLY_DEPTH,
        }
    }

    /// Bound multi-bulk nesting; deeper replies are rejected
    ///
    /// A bound of 0 would reject every multi-bulk, so it is raised to 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decode one complete reply
    ///
    /// `command` labels errors; it does not influence parsing.
    pub fn decode<T: Transport + ?Sized>(&self, transport: &mut T, command: &str) -> Result<Reply> {
        self.decode_at(transport, command, 0)
    }

    fn decode_at<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        command: &str,
        depth: usize,
    ) -> Result<Reply> {
        let raw = transport.read_line()?;
        let line = trim_line_end(&raw);
        if line.is_empty() {
            transport.disconnect();
            let endpoint = transport.endpoint();
            return Err(BarbershopError::connection_closed(
                &endpoint.host,
                endpoint.port,
                "socket closed on remote end",
            ));
        }

        let (tag, payload) = (line[0], &line[1..]);
        tracing::trace!("{} reply header {:?}", command, String::from_utf8_lossy(line));

        self.decode_tagged(transport, command, tag, payload, depth)
            .map_err(|e| drop_if_malformed(transport, e))
    }

    fn decode_tagged<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        command: &str,
        tag: u8,
        payload: &[u8],
        depth: usize,
    ) -> Result<Reply> {
        match tag {
            sentinel::ERROR => Err(server_error(command, payload)),
            sentinel::STATUS => Ok(Reply::SimpleString(
                String::from_utf8_lossy(payload).into_owned(),
            )),
            sentinel::INTEGER => Ok(Reply::Integer(parse_integer(command, payload)?)),
            sentinel::BULK => match parse_length(command, payload)? {
                None => Ok(Reply::Nil),
                Some(len) => self.read_bulk(transport, command, len),
            },
            sentinel::MULTI_BULK => match parse_length(command, payload)? {
                None => Ok(Reply::Nil),
                Some(count) => self.read_multi_bulk(transport, command, count, depth),
            },
            other => Err(BarbershopError::invalid_response(
                command,
                format!("unknown reply type {:?}", other as char),
            )),
        }
    }

    fn read_bulk<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        command: &str,
        len: usize,
    ) -> Result<Reply> {
        if len > MAX_BULK_LEN {
            return Err(BarbershopError::invalid_response(
                command,
                format!("bulk length {} exceeds {}", len, MAX_BULK_LEN),
            ));
        }

        let data = if len == 0 {
            Bytes::new()
        } else {
            transport.read_exact(len)?
        };
        if data.len() != len {
            transport.disconnect();
            let endpoint = transport.endpoint();
            return Err(BarbershopError::connection_closed(
                &endpoint.host,
                endpoint.port,
                format!("short bulk read: expected {} bytes, got {}", len, data.len()),
            ));
        }

        // The terminator after the payload is not part of the value
        transport.read_exact(2)?;
        Ok(Reply::BulkString(data))
    }

    fn read_multi_bulk<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        command: &str,
        count: usize,
        depth: usize,
    ) -> Result<Reply> {
        if depth >= self.max_depth {
            return Err(BarbershopError::invalid_response(
                command,
                format!("multi-bulk nesting exceeds {}", self.max_depth),
            ));
        }

        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            match self.decode_at(transport, command, depth + 1) {
                Ok(reply) => items.push(reply),
                // A `-` line is complete, so the elements after it are intact
                Err(e) if self.mode == DecodeMode::Pipeline && e.is_response_error() => {
                    tracing::debug!("{} captured element error: {}", command, e);
                    items.push(Reply::Error(e));
                }
                Err(e) => {
                    // The remaining elements are still on the stream
                    transport.disconnect();
                    return Err(e);
                }
            }
        }
        Ok(Reply::MultiBulk(items))
    }
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new(DecodeMode::Strict)
    }
}

/// Decode one reply with the default depth bound
pub fn read_reply<T: Transport + ?Sized>(
    transport: &mut T,
    command: &str,
    mode: DecodeMode,
) -> Result<Reply> {
    ReplyDecoder::new(mode).decode(transport, command)
}

/// Read the body of an INFO reply
///
/// The Barbershop server writes INFO as bare `key:value` lines with no
/// sentinel and no length, ending with the `pools` field. A `$` bulk body
/// (as sent by servers that frame INFO) is accepted too. The text is
/// returned unparsed, one field per line.
pub fn read_info_body<T: Transport + ?Sized>(transport: &mut T, command: &str) -> Result<String> {
    let mut body = String::new();

    for idx in 0..MAX_INFO_LINES {
        let raw = transport.read_line()?;
        let line = trim_line_end(&raw);
        if line.is_empty() {
            transport.disconnect();
            let endpoint = transport.endpoint();
            return Err(BarbershopError::connection_closed(
                &endpoint.host,
                endpoint.port,
                "socket closed on remote end",
            ));
        }

        if idx == 0 {
            match line[0] {
                sentinel::ERROR => return Err(server_error(command, &line[1..])),
                sentinel::BULK => return read_framed_info(transport, command, &line[1..]),
                _ => {}
            }
        }

        let text = String::from_utf8_lossy(line);
        let key = match text.split_once(':') {
            Some((key, _)) => key,
            None => {
                return Err(drop_if_malformed(
                    transport,
                    BarbershopError::invalid_response(
                        command,
                        format!("info line without a colon: {:?}", text),
                    ),
                ))
            }
        };
        let last = key == INFO_LAST_FIELD;
        body.push_str(&text);
        body.push('\n');
        if last {
            return Ok(body);
        }
    }

    Err(drop_if_malformed(
        transport,
        BarbershopError::invalid_response(
            command,
            format!("info body exceeds {} lines", MAX_INFO_LINES),
        ),
    ))
}

fn read_framed_info<T: Transport + ?Sized>(
    transport: &mut T,
    command: &str,
    payload: &[u8],
) -> Result<String> {
    let decoder = ReplyDecoder::default();
    let len = parse_length(command, payload).map_err(|e| drop_if_malformed(transport, e))?;
    let reply = match len {
        None => return Ok(String::new()),
        Some(len) => decoder
            .read_bulk(transport, command, len)
            .map_err(|e| drop_if_malformed(transport, e))?,
    };
    match reply.as_text() {
        Some(text) => Ok(text.to_string()),
        None => Err(BarbershopError::invalid_response(command, "info body is not UTF-8")),
    }
}

/// A malformed reply leaves the rest of it on the stream, so the
/// connection cannot be reused
fn drop_if_malformed<T: Transport + ?Sized>(transport: &mut T, err: BarbershopError) -> BarbershopError {
    if matches!(err, BarbershopError::InvalidResponse { .. }) && transport.is_connected() {
        tracing::warn!("Dropping connection to {}: {}", transport.endpoint(), err);
        transport.disconnect();
    }
    err
}

fn server_error(command: &str, payload: &[u8]) -> BarbershopError {
    let text = String::from_utf8_lossy(payload);
    let message = text.strip_prefix(ERR_PREFIX).unwrap_or(&text);
    BarbershopError::Response {
        command: command.to_string(),
        message: message.to_string(),
    }
}

/// Strip trailing whitespace, including the CRLF terminator
fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |idx| idx + 1);
    &line[..end]
}

fn parse_integer(command: &str, payload: &[u8]) -> Result<i64> {
    std::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            BarbershopError::invalid_response(
                command,
                format!("invalid integer {:?}", String::from_utf8_lossy(payload)),
            )
        })
}

/// Parse a `$`/`*` length; `-1` means nil
fn parse_length(command: &str, payload: &[u8]) -> Result<Option<usize>> {
    match parse_integer(command, payload)? {
        -1 => Ok(None),
        n if n < 0 => Err(BarbershopError::invalid_response(
            command,
            format!("invalid length {}", n),
        )),
        n => usize::try_from(n).map(Some).map_err(|_| {
            BarbershopError::invalid_response(command, format!("length {} out of range", n))
        }),
    }
}
