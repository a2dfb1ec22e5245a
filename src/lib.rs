//! acsbridge - an accessibility bridge for the console
//!
//! Turns keystrokes, tty output and console switches into synchronized
//! synthesized speech. The reading buffer keeps the text, the sentence
//! extractor cuts it into speakable chunks, and the speech flow controller
//! sends them to a hardware or software synthesizer, following the index
//! markers that come back to keep the reading cursor on the spoken word.

pub mod bridge;
pub mod buffer;
pub mod dict;
pub mod error;
pub mod event;
pub mod fifo;
pub mod input;
pub mod mux;
pub mod platform;
pub mod sentence;
pub mod speech;
pub mod state;
pub mod symbols;
pub mod terminal;

pub use error::{AcsError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "acsbridge";
