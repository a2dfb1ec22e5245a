//! Error types for the accessibility bridge

use std::io;
use thiserror::Error;

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum AcsError {
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Synthesizer error: {0}")]
    Synth(String),

    /// The synthesizer link is gone (child exited, socket closed, write failed).
    /// Speech output stays unavailable until the channel is reopened.
    #[error("Synthesizer channel is broken")]
    ChannelBroken,

    /// A single utterance asked for more index markers than the protocol can carry.
    #[error("Index marker {0} is out of range (markers stop at 99)")]
    MarkerRange(usize),

    #[error("FIFO error: {0}")]
    Fifo(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("System call failed: {0}")]
    Nix(#[from] nix::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, AcsError>;

impl From<String> for AcsError {
    fn from(s: String) -> Self {
        AcsError::Other(s)
    }
}

impl From<&str> for AcsError {
    fn from(s: &str) -> Self {
        AcsError::Other(s.to_string())
    }
}
