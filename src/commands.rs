//! Command registration, lookup and dispatch.

use core::fmt::Write;

use heapless::Vec;

use crate::editor::Completion;
use crate::error::RegisterError;
use crate::parser::CommandParser;
use crate::writer::Output;

/// Name of the built-in command lister
pub const HELP_COMMAND: &str = "help";

/// A registered command's behavior.
///
/// Receives the command token, its parameters (borrowed from the line, valid
/// for the duration of the call) and the output sink.
pub trait CommandHandler {
    fn handle(&self, command: &str, params: &[&str], out: &mut Output<'_>);
}

impl<F> CommandHandler for F
where
    F: Fn(&str, &[&str], &mut Output<'_>),
{
    fn handle(&self, command: &str, params: &[&str], out: &mut Output<'_>) {
        self(command, params, out)
    }
}

#[derive(Clone, Copy)]
enum Action<'a> {
    Help,
    Handler(&'a dyn CommandHandler),
}

/// One registered command. The table borrows all of its strings.
#[derive(Clone, Copy)]
pub struct CommandEntry<'a> {
    name: &'a str,
    action: Action<'a>,
    help: Option<&'a str>,
    hints: Option<&'a [&'a str]>,
}

impl<'a> CommandEntry<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn help(&self) -> Option<&'a str> {
        self.help
    }

    pub fn hints(&self) -> Option<&'a [&'a str]> {
        self.hints
    }
}

/// What [`CommandTable::dispatch`] did with a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// The line held no command token
    Empty,
    /// A registered entry ran
    Handled,
    /// No entry matched and the fallback ran
    Unhandled,
}

/// Fixed-capacity table mapping command names to handlers.
///
/// Lookup is a linear scan and the first entry with a matching name wins, so
/// a later duplicate of a name is never reached.
pub struct CommandTable<'a, const N: usize> {
    entries: Vec<CommandEntry<'a>, N>,
    help_registered: bool,
    fallback: Option<&'a dyn CommandHandler>,
}

impl<'a, const N: usize> CommandTable<'a, N> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            help_registered: false,
            fallback: None,
        }
    }

    /// Add the built-in `help` entry if it is not there yet.
    ///
    /// Called automatically by the first [`register`](Self::register).
    pub fn register_builtins(&mut self) {
        if self.help_registered {
            return;
        }
        self.help_registered = true;
        let entry = CommandEntry {
            name: HELP_COMMAND,
            action: Action::Help,
            help: Some("List available commands"),
            hints: None,
        };
        if self.entries.push(entry).is_err() {
            log::warn!("no room for the built-in help command");
        }
    }

    /// Register a command.
    ///
    /// Nothing is stored when the call fails.
    pub fn register(
        &mut self,
        name: &'a str,
        handler: &'a dyn CommandHandler,
        help: Option<&'a str>,
        hints: Option<&'a [&'a str]>,
    ) -> Result<(), RegisterError> {
        if name.is_empty() || name.contains(CommandParser::is_separator) {
            log::warn!("refusing to register '{}'", name);
            return Err(RegisterError::InvalidName);
        }

        let needed = if self.help_registered { 1 } else { 2 };
        if self.entries.len() + needed > N {
            log::warn!("command table full, cannot register '{}'", name);
            return Err(RegisterError::TableFull);
        }

        self.register_builtins();
        self.entries
            .push(CommandEntry {
                name,
                action: Action::Handler(handler),
                help,
                hints,
            })
            .map_err(|_| RegisterError::TableFull)?;
        log::debug!("registered '{}'", name);
        Ok(())
    }

    /// Replace the action taken for lines whose command matches nothing
    pub fn set_fallback(&mut self, handler: &'a dyn CommandHandler) {
        self.fallback = Some(handler);
    }

    /// Find the first entry named exactly `name`
    pub fn find(&self, name: &str) -> Option<&CommandEntry<'a>> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Tokenize `line` and invoke the matching handler
    pub fn dispatch(&self, line: &str, out: &mut Output<'_>) -> DispatchResult {
        let Some(parsed) = CommandParser::parse(line) else {
            return DispatchResult::Empty;
        };

        match self.find(parsed.command) {
            Some(entry) => {
                log::debug!(
                    "dispatching '{}' with {} params",
                    parsed.command,
                    parsed.param_count()
                );
                match entry.action {
                    Action::Help => self.list(out),
                    Action::Handler(handler) => handler.handle(parsed.command, &parsed.params, out),
                }
                DispatchResult::Handled
            }
            None => {
                log::debug!("unrecognized command '{}'", parsed.command);
                match self.fallback {
                    Some(handler) => handler.handle(parsed.command, &parsed.params, out),
                    None => {
                        out.write_error(format_args!("Unrecognized command: {}", parsed.command))
                    }
                }
                DispatchResult::Unhandled
            }
        }
    }

    /// The only entry whose name starts with `partial`, if exactly one does
    pub fn unique_prefix_match(&self, partial: &str) -> Option<&'a str> {
        let mut matches = self.entries.iter().filter(|e| e.name.starts_with(partial));
        let first = matches.next()?;
        match matches.next() {
            None => Some(first.name),
            Some(_) => None,
        }
    }

    /// Write every entry's name, help and parameter hints
    pub fn list(&self, out: &mut Output<'_>) {
        let width = self.entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        out.writeln("Commands:");
        for entry in &self.entries {
            let _ = write!(out, "  {:<width$}", entry.name, width = width);
            if let Some(hints) = entry.hints {
                for hint in hints {
                    let _ = write!(out, " {}", hint);
                }
            }
            if let Some(help) = entry.help {
                let _ = write!(out, "  {}", help);
            }
            out.new_line();
        }
    }

    /// Iterate over registered entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> Default for CommandTable<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Completion for CommandTable<'_, N> {
    fn complete(&self, partial: &str) -> Option<&str> {
        self.unique_prefix_match(partial)
    }

    fn hints(&self, command: &str) -> Option<&[&str]> {
        self.find(command).and_then(|e| e.hints)
    }
}

/// Check that a handler got at least `expected` parameters.
///
/// Writes a standard diagnostic and returns `false` when it did not.
pub fn confirm_parameters(given: usize, expected: usize, out: &mut Output<'_>) -> bool {
    if given >= expected {
        return true;
    }
    out.write_error(format_args!("Expected {} parameter(s), received {}", expected, given));
    false
}
