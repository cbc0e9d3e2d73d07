//! Application values
//!
//! What a command returns to its caller once its reply has been coerced.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::BarbershopError;
use crate::protocol::Reply;

/// One field of an INFO body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    Int(i64),
    Text(String),
    /// A `k=v,k=v` field split into its parts
    Map(BTreeMap<String, InfoValue>),
}

/// A coerced command result
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Bulk payload that is not valid UTF-8
    Bytes(Bytes),
    List(Vec<Value>),
    Set(BTreeSet<String>),
    /// `(member, score)` pairs of a range read with scores
    Pairs(Vec<(String, f64)>),
    Info(BTreeMap<String, InfoValue>),
    Timestamp(DateTime<Utc>),
    /// A per-element or per-command failure captured in pipeline mode
    Error(BarbershopError),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Raw pass-through used when a command has no coercion rule
impl From<Reply> for Value {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Nil => Value::Nil,
            Reply::SimpleString(s) => Value::Text(s),
            Reply::Integer(n) => Value::Int(n),
            Reply::BulkString(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => Value::Text(text),
                Err(_) => Value::Bytes(data),
            },
            Reply::MultiBulk(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Reply::Error(e) => Value::Error(e),
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Int(n) => write!(f, "{}", n),
            InfoValue::Text(s) => write!(f, "{}", s),
            InfoValue::Map(map) => {
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "(nil)"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(data) => write!(f, "{}", String::from_utf8_lossy(data)),
            Value::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", idx + 1, item)?;
                }
                Ok(())
            }
            Value::Set(members) => {
                let joined: Vec<&str> = members.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
            Value::Pairs(pairs) => {
                for (idx, (member, score)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {} {}", idx + 1, member, score)?;
                }
                Ok(())
            }
            Value::Info(fields) => {
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                Ok(())
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Error(e) => write!(f, "(error) {}", e),
        }
    }
}
