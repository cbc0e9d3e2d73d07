//! Response Module
//!
//! Turns decoded replies into application values.
//!
//! ## Flow
//! ```text
//! Reply ──▶ CoercionTable::apply(command) ──▶ Value
//!               │
//!               ├── rule registered: rule(command, reply, options)
//!               └── no rule:         Value::from(reply)
//! ```

mod value;
mod callbacks;
pub mod rules;

pub use value::{InfoValue, Value};
pub use callbacks::{Coercion, CoercionTable, STANDARD_RULES};

/// Per-call options consumed by coercion rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Zip range replies into `(member, score)` pairs
    pub withscores: bool,
}

impl Options {
    pub fn withscores() -> Self {
        Self { withscores: true }
    }
}
