use thiserror::Error;

/// Reasons a command registration is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("command table is full")]
    TableFull,
    /// The name is empty or contains a separator, so it could never be dispatched
    #[error("command name cannot be dispatched")]
    InvalidName,
}

/// Reasons a line buffer edit is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("index outside of the line")]
    OutOfRange,
    #[error("line buffer is full")]
    BufferFull,
    /// Only printable ASCII is stored in the line
    #[error("byte is not printable ASCII")]
    NotPrintable,
}

/// Errors from runtime configuration setters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("prompt is longer than the prompt buffer")]
    PromptTooLong,
    #[error("line ending must be one or two bytes")]
    InvalidLineEnd,
}

/// Errors that stop the async input pump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("failed to read from the byte source")]
    Read,
    #[error("failed to write to the byte sink")]
    Write,
}
