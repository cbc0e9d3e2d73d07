//! Coercion rules
//!
//! Pure functions turning a decoded reply into the value a command hands
//! back. Each takes the command name only to label errors.

use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;

use crate::error::{BarbershopError, Result};
use crate::protocol::Reply;
use super::{InfoValue, Options, Value};

const OK: &str = "OK";
const PONG: &str = "PONG";
const BGSAVE_STARTED: &str = "Background saving started";

/// Nonzero integers and non-empty strings or lists are true
pub fn truthy(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    let truth = match &reply {
        Reply::Nil => false,
        Reply::Integer(n) => *n != 0,
        Reply::SimpleString(s) => !s.is_empty(),
        Reply::BulkString(data) => !data.is_empty(),
        Reply::MultiBulk(items) => !items.is_empty(),
        Reply::Error(_) => false,
    };
    Ok(Value::Bool(truth))
}

/// Integer replies, or text that parses as one
pub fn integer(command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match &reply {
        Reply::Integer(n) => Ok(Value::Int(*n)),
        _ => match reply.as_text().and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(n) => Ok(Value::Int(n)),
            None => Err(unexpected(command, "an integer", &reply)),
        },
    }
}

/// List pushes: older servers answer `+OK`, newer ones the new length
///
/// Both shapes are accepted: a nonzero integer is returned as is, anything
/// else becomes whether the reply was `OK`.
pub fn ok_or_nonzero(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match reply {
        Reply::Integer(n) if n != 0 => Ok(Value::Int(n)),
        other => Ok(Value::Bool(other.as_text() == Some(OK))),
    }
}

/// Scores: nil stays nil, anything else must parse as a float
pub fn float_or_nil(command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match &reply {
        Reply::Nil => Ok(Value::Nil),
        Reply::Integer(n) => Ok(Value::Float(*n as f64)),
        _ => match reply.as_text().and_then(|s| s.trim().parse::<f64>().ok()) {
            Some(x) => Ok(Value::Float(x)),
            None => Err(unexpected(command, "a float", &reply)),
        },
    }
}

/// True only for an exact `OK`
pub fn equals_ok(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    Ok(Value::Bool(reply.as_text() == Some(OK)))
}

/// True only for an exact `PONG`
pub fn equals_pong(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    Ok(Value::Bool(reply.as_text() == Some(PONG)))
}

pub fn bgsave_started(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    Ok(Value::Bool(reply.as_text() == Some(BGSAVE_STARTED)))
}

/// Non-empty multi-bulk becomes a set; empty or nil replies pass through
///
/// A set cannot hold nil, so a reply with nil members is returned as a
/// list instead of losing them.
pub fn set_members(command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match reply {
        Reply::MultiBulk(items) if !items.is_empty() && !items.iter().any(Reply::is_nil) => {
            let mut members = BTreeSet::new();
            for item in &items {
                let member = member_text(item).ok_or_else(|| unexpected(command, "a set member", item))?;
                members.insert(member);
            }
            Ok(Value::Set(members))
        }
        other => Ok(Value::from(other)),
    }
}

/// With `withscores`, zip a flat member/score list into pairs
pub fn score_pairs(command: &str, reply: Reply, options: &Options) -> Result<Value> {
    let items = match reply {
        Reply::MultiBulk(items) if options.withscores && !items.is_empty() => items,
        other => return Ok(Value::from(other)),
    };

    if items.len() % 2 != 0 {
        return Err(BarbershopError::invalid_response(
            command,
            format!("odd number of elements ({}) in scored range", items.len()),
        ));
    }

    let mut pairs = Vec::with_capacity(items.len() / 2);
    for chunk in items.chunks_exact(2) {
        let member = member_text(&chunk[0])
            .ok_or_else(|| unexpected(command, "a member", &chunk[0]))?;
        let score = match &chunk[1] {
            Reply::Integer(n) => *n as f64,
            other => other
                .as_text()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .ok_or_else(|| unexpected(command, "a score", other))?,
        };
        pairs.push((member, score));
    }
    Ok(Value::Pairs(pairs))
}

/// Parse an INFO body into a field map
pub fn info(command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match reply.as_text() {
        Some(body) => Ok(Value::Info(parse_info(body))),
        None if reply.is_nil() => Ok(Value::Nil),
        None => Err(unexpected(command, "an info body", &reply)),
    }
}

/// Unix epoch seconds to a UTC timestamp; empty or non-numeric is nil
pub fn timestamp(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    let secs = match &reply {
        Reply::Integer(n) => Some(*n),
        _ => reply.as_text().and_then(|s| s.trim().parse::<i64>().ok()),
    };
    Ok(secs
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or(Value::Nil, Value::Timestamp))
}

/// Empty text becomes nil
pub fn non_empty_or_nil(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match reply.as_text() {
        Some("") => Ok(Value::Nil),
        _ => Ok(Value::from(reply)),
    }
}

/// A TTL of -1 (no expiry) becomes nil
pub fn ttl(_command: &str, reply: Reply, _options: &Options) -> Result<Value> {
    match reply {
        Reply::Integer(-1) => Ok(Value::Nil),
        other => Ok(Value::from(other)),
    }
}

/// Parse `key:value` lines
///
/// Integer values become `Int`. Values containing commas are split into
/// `k=v` parts, each typed the same way. Blank lines, `#` section headers
/// and lines without a colon are skipped.
pub fn parse_info(body: &str) -> BTreeMap<String, InfoValue> {
    let mut fields = BTreeMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => {
                tracing::trace!("Skipping info line without a colon: {:?}", line);
                continue;
            }
        };
        fields.insert(key.to_string(), info_value(value));
    }
    fields
}

fn info_value(value: &str) -> InfoValue {
    if let Ok(n) = value.parse::<i64>() {
        return InfoValue::Int(n);
    }
    if !value.contains(',') {
        return InfoValue::Text(value.to_string());
    }

    let parts = value
        .split(',')
        .filter_map(|item| item.split_once('='))
        .map(|(k, v)| {
            let typed = match v.parse::<i64>() {
                Ok(n) => InfoValue::Int(n),
                Err(_) => InfoValue::Text(v.to_string()),
            };
            (k.to_string(), typed)
        })
        .collect();
    InfoValue::Map(parts)
}

fn member_text(reply: &Reply) -> Option<String> {
    match reply {
        Reply::Integer(n) => Some(n.to_string()),
        Reply::BulkString(data) => Some(String::from_utf8_lossy(data).into_owned()),
        Reply::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

fn unexpected(command: &str, wanted: &str, reply: &Reply) -> BarbershopError {
    BarbershopError::invalid_response(
        command,
        format!("expected {}, got {} reply", wanted, reply.kind()),
    )
}
