use heapless::Vec;

/// Maximum number of parameters passed to a handler
pub const MAX_PARAMS: usize = 8;

/// A tokenized command line.
///
/// Tokens borrow from the line they were parsed from, which in a
/// [`Terminal`](crate::Terminal) stays valid only until the next byte is
/// processed.
#[derive(Debug, Clone)]
pub struct ParsedCommand<'l> {
    /// The command name
    pub command: &'l str,
    /// Command parameters
    pub params: Vec<&'l str, MAX_PARAMS>,
}

impl<'l> ParsedCommand<'l> {
    /// Get the command name
    pub fn name(&self) -> &'l str {
        self.command
    }

    /// Get the number of parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Get a parameter by index
    pub fn param(&self, index: usize) -> Option<&'l str> {
        self.params.get(index).copied()
    }
}

/// Splits a completed line into a command token and parameter tokens
pub struct CommandParser;

impl CommandParser {
    /// Returns `true` for bytes that separate tokens
    pub fn is_separator(c: char) -> bool {
        c == ' ' || c == ','
    }

    /// Parse a command line.
    ///
    /// Tokens are separated by runs of spaces and commas. Parameters past
    /// [`MAX_PARAMS`] are dropped. Returns `None` for a line with no tokens.
    pub fn parse(input: &str) -> Option<ParsedCommand<'_>> {
        let mut tokens = input.split(Self::is_separator).filter(|t| !t.is_empty());
        let command = tokens.next()?;

        let mut params = Vec::new();
        for token in tokens {
            if params.push(token).is_err() {
                log::debug!("dropping parameters beyond {} for '{}'", MAX_PARAMS, command);
                break;
            }
        }

        Some(ParsedCommand { command, params })
    }
}
