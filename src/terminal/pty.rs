//! Pseudo-terminal (PTY) management
//!
//! The console the bridge reads is a pseudo-terminal with a shell in it. We
//! own the master side: the user's keys go in, the shell's output comes out.

use super::util::{set_nonblocking, set_terminal_size};
use crate::{AcsError, Result};
use log::{debug, info};
use nix::unistd::dup;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::io::{FromRawFd, OwnedFd, RawFd};

pub struct Pty {
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,

    /// The program running in the PTY
    child: Box<dyn Child + Send + Sync>,

    /// Duplicated master descriptor for the event loop. It stays valid
    /// after the master is consumed by take_writer().
    fd_owner: OwnedFd,
}

impl Pty {
    /// Create a PTY running `program`, or the user's shell
    pub fn new(program: Option<Vec<String>>, rows: u16, cols: u16) -> Result<Self> {
        let pty_system = native_pty_system();
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        debug!("Creating PTY with size {}x{}", rows, cols);
        let pair = pty_system
            .openpty(size)
            .map_err(|e| AcsError::Pty(format!("Failed to open PTY: {}", e)))?;

        let cmd = match program.as_deref() {
            Some([prog, args @ ..]) => {
                info!("Spawning specified program: {:?}", program);
                let mut cmd = CommandBuilder::new(prog);
                cmd.args(args);
                cmd
            }
            _ => {
                let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
                info!("Spawning default shell: {}", shell);
                CommandBuilder::new(shell)
            }
        };

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| AcsError::Pty(format!("Failed to spawn child: {}", e)))?;

        let original_fd = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| AcsError::Pty("Failed to get PTY file descriptor".to_string()))?;
        let dup_fd = dup(original_fd)
            .map_err(|e| AcsError::Pty(format!("Failed to duplicate fd: {}", e)))?;
        let fd_owner = unsafe { OwnedFd::from_raw_fd(dup_fd) };

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| AcsError::Pty(format!("Failed to get PTY reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| AcsError::Pty(format!("Failed to get PTY writer: {}", e)))?;

        // Every descriptor for the master shares one open file, so the
        // reader sees WouldBlock too
        set_nonblocking(fd_owner.as_raw_fd())?;
        debug!("PTY created successfully with fd {}", fd_owner.as_raw_fd());

        Ok(Self {
            reader,
            writer,
            child,
            fd_owner,
        })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd_owner.as_raw_fd()
    }

    /// Read output from the PTY. WouldBlock means nothing is waiting.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    /// Pass keystrokes through to the program
    pub fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.writer.write(buf) {
                Ok(0) => return Err(AcsError::Pty("PTY closed".to_string())),
                Ok(n) => buf = &buf[n..],
                // The shell is busy; keys are few, so spin until it drains
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Whether the program has exited
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Tell the program the window changed size
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<()> {
        debug!("PTY resize to {}x{}", rows, cols);
        set_terminal_size(self.as_raw_fd(), cols, rows)
    }
}
