//! Coercion table
//!
//! Maps a command name to the rule that post-processes its reply. Several
//! names share one rule. Lookup is by exact name; unknown commands pass the
//! raw reply through.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::protocol::Reply;
use super::rules;
use super::{Options, Value};

/// A pure reply-to-value function
pub type Coercion = fn(&str, Reply, &Options) -> Result<Value>;

/// The standard table, built once and shared by every client
pub static STANDARD_RULES: Lazy<Arc<CoercionTable>> =
    Lazy::new(|| Arc::new(CoercionTable::standard()));

/// Command name to coercion rule
#[derive(Clone, Default)]
pub struct CoercionTable {
    rules: HashMap<String, Coercion>,
}

impl CoercionTable {
    /// An empty table: every command returns its raw reply
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules for the standard command set
    pub fn standard() -> Self {
        Self::new()
            .with_all(
                "AUTH DEL EXISTS EXPIRE HDEL MOVE MSETNX RENAMENX \
                 SADD SISMEMBER SMOVE SETNX SREM ZADD ZREM",
                rules::truthy,
            )
            .with_all(
                "DECRBY INCRBY LLEN SCARD SDIFFSTORE SINTERSTORE SUNIONSTORE \
                 ZCARD ZRANK ZREMRANGEBYSCORE ZREVRANK",
                rules::integer,
            )
            .with_all("LPUSH RPUSH", rules::ok_or_nonzero)
            .with_all("ZSCORE ZINCRBY", rules::float_or_nil)
            .with_all(
                "FLUSHALL FLUSHDB LSET LTRIM MSET RENAME SAVE SELECT SET SHUTDOWN",
                rules::equals_ok,
            )
            .with_all("SDIFF SINTER SMEMBERS SUNION", rules::set_members)
            .with_all("ZRANGE ZRANGEBYSCORE ZREVRANGE", rules::score_pairs)
            .with("BGSAVE", rules::bgsave_started)
            .with("INFO", rules::info)
            .with("LASTSAVE", rules::timestamp)
            .with("PING", rules::equals_pong)
            .with("RANDOMKEY", rules::non_empty_or_nil)
            .with("TTL", rules::ttl)
    }

    /// Register (or replace) the rule for one command
    pub fn register(&mut self, command: impl Into<String>, rule: Coercion) {
        self.rules.insert(command.into(), rule);
    }

    /// Builder form of `register`
    pub fn with(mut self, command: impl Into<String>, rule: Coercion) -> Self {
        self.register(command, rule);
        self
    }

    /// Register one rule under every whitespace-separated name
    pub fn with_all(mut self, commands: &str, rule: Coercion) -> Self {
        for command in commands.split_whitespace() {
            self.register(command, rule);
        }
        self
    }

    pub fn get(&self, command: &str) -> Option<Coercion> {
        self.rules.get(command).copied()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.rules.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Coerce a reply for `command`
    ///
    /// Captured errors are never fed to a rule.
    pub fn apply(&self, command: &str, reply: Reply, options: &Options) -> Result<Value> {
        if let Reply::Error(e) = reply {
            return Ok(Value::Error(e));
        }
        match self.get(command) {
            Some(rule) => rule(command, reply, options),
            None => Ok(Value::from(reply)),
        }
    }
}

impl std::fmt::Debug for CoercionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CoercionTable").field("commands", &names).finish()
    }
}
