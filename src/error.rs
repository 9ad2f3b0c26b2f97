//! Error types for the restaurant simulation.

use thiserror::Error;

/// Why a name did not produce a customer.
///
/// Neither variant is fatal: the restaurant drops the arrival and carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The name has fewer than three distinct characters.
    #[error("name has {distinct} distinct characters, need at least 3")]
    TooFewSymbols { distinct: usize },

    /// A rotation pivoted on a leaf while rebalancing the huffman tree.
    #[error("rebalancing degenerated the huffman tree")]
    DegenerateTree,
}

/// Faults in the command stream. Every variant aborts the remaining stream.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("command `{command}` is missing its argument")]
    MissingArgument { command: &'static str },

    /// A numeric argument did not parse.
    #[error("command `{command}` expects a number, got `{value}`")]
    InvalidNumber {
        command: &'static str,
        value: String,
    },

    #[error("capacity must be at least 1, got {0}")]
    InvalidCapacity(i64),

    /// A store command arrived before `setCapacity`.
    #[error("command `{0}` issued before setCapacity")]
    NotConfigured(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Bad command-line arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing input file")]
    MissingInput,

    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("invalid --weights value: {0}")]
    InvalidWeightMode(String),
}
