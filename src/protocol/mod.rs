//! Protocol Module
//!
//! Defines the Barbershop wire protocol.
//!
//! ## Request Format
//! ```text
//! UPDATE 5001 1\r\n
//! ```
//! The command name and its arguments, space separated, one line. There is
//! no length prefix on requests.
//!
//! ### Commands understood by the server
//! - `UPDATE <item> <amount>` - add to an item's score
//! - `NEXT`                   - pop the highest-scored item
//! - `PEEK`                   - show the highest-scored item
//! - `SCORE <item>`           - show one item's score
//! - `INFO`                   - server statistics, as bare `key:value` lines
//!
//! ## Reply Format
//! One line whose first byte selects the type:
//! - `+` status, `-` error, `:` integer
//! - `$N` bulk of N bytes followed by CRLF (`$-1` = nil)
//! - `*N` N nested replies (`*-1` = nil)

mod command;
mod reply;
mod codec;

pub use command::{Command, CRLF};
pub use reply::{sentinel, Reply};
pub use codec::{read_info_body, read_reply, DecodeMode, ReplyDecoder, MAX_BULK_LEN};
