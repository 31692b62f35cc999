#![no_std]
#![doc = include_str!("../README.md")]

//! A character-at-a-time line editor and command dispatcher for `no_std`
//! systems.
//!
//! The crate owns no stream and no thread: feed a [`Terminal`] one input byte
//! at a time and write out whatever it hands back.

pub mod commands;
pub mod editor;
pub mod error;
pub mod escape;
pub mod history;
pub mod parser;
pub mod terminal;
pub mod writer;

pub use commands::{confirm_parameters, CommandHandler, CommandTable, DispatchResult};
pub use error::{ConfigError, EditError, RegisterError, RunError};
pub use history::{History, HistoryConfig};
pub use parser::{CommandParser, ParsedCommand};
pub use terminal::{DefaultTerminal, Terminal, TerminalConfig};
pub use writer::{LineEnd, Output};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{confirm_parameters, CommandHandler};
    pub use crate::terminal::{DefaultTerminal, Terminal, TerminalConfig};
    pub use crate::writer::Output;
}
