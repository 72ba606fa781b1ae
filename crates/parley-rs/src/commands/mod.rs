//! Fixed-pattern commands over the list store.
//!
//! - [`parse`]: the ordered, first-match command table.
//! - [`router`]: dispatch, random picks, and apology conversion.
//!
//! Commands are checked before anything touches the transcript. They are
//! never recorded and never count toward the token budget.

pub mod parse;
pub mod router;

pub use parse::{COMMAND_TABLE, Command, CommandKind, parse_command};
pub use router::{CommandRouter, HELP_TEXT, apology};
