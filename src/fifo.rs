//! Message FIFO
//!
//! Other processes talk to the bridge by writing lines to a named pipe:
//! `echo "say build finished" > /tmp/acsbridge.fifo`. Each newline ends one
//! message. The FIFO is opened read-write so it never reports end of file
//! when the last writer goes away.

use crate::{AcsError, Result};
use log::{debug, info, warn};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Longest message kept; anything longer is cut here
const MAX_MESSAGE: usize = 4096;

/// Splits a byte stream into newline-terminated messages
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes and return every message they complete. Blank lines are
    /// dropped; a trailing carriage return is trimmed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut messages = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                let line = std::mem::take(&mut self.partial);
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches('\r');
                if !text.trim().is_empty() {
                    messages.push(text.to_string());
                }
            } else if self.partial.len() < MAX_MESSAGE {
                self.partial.push(b);
            }
        }
        messages
    }

    /// Bytes waiting for their newline
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}

/// A named pipe the bridge listens on
pub struct Fifo {
    file: File,
    path: PathBuf,
    framer: LineFramer,
    /// Set when `start` made the FIFO; only then is it removed on drop
    created: bool,
}

impl Fifo {
    /// Create the FIFO at `path` if needed and open it
    pub fn start(path: &Path) -> Result<Self> {
        let created = match fs::metadata(path) {
            Ok(meta) if meta.file_type().is_fifo() => {
                debug!("Reusing FIFO {:?}", path);
                false
            }
            Ok(_) => {
                return Err(AcsError::Fifo(format!(
                    "{} exists and is not a FIFO",
                    path.display()
                )))
            }
            Err(_) => {
                mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR)
                    .map_err(|e| AcsError::Fifo(format!("cannot create {}: {}", path.display(), e)))?;
                true
            }
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(nix::libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| AcsError::Fifo(format!("cannot open {}: {}", path.display(), e)))?;
        info!("Listening for messages on {:?}", path);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            framer: LineFramer::new(),
            created,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Drain the FIFO and return the complete messages
    pub fn read_messages(&mut self) -> Result<Vec<String>> {
        let mut buf = [0u8; 1024];
        let mut messages = Vec::new();
        loop {
            match self.file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => messages.extend(self.framer.push(&buf[..n])),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(AcsError::Fifo(format!("read failed: {}", e))),
            }
        }
        if !messages.is_empty() {
            debug!("{} FIFO message(s)", messages.len());
        }
        Ok(messages)
    }
}

impl Drop for Fifo {
    fn drop(&mut self) {
        if !self.created {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove {:?}: {}", self.path, e);
        }
    }
}
