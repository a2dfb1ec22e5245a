//! Terminal utilities

use crate::{AcsError, Result};
use log::debug;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use std::os::unix::io::RawFd;

/// Get the terminal size for the given file descriptor
pub fn get_terminal_size(fd: RawFd) -> Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };

    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Ok((ws.ws_col, ws.ws_row))
    } else {
        // Default size if ioctl fails
        Ok((80, 24))
    }
}

/// Tell the terminal behind `fd` its new size
pub fn set_terminal_size(fd: RawFd, cols: u16, rows: u16) -> Result<()> {
    let ws = libc::winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &ws) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(AcsError::Terminal(format!("cannot resize to {}x{}: {}", cols, rows, err)));
    }
    Ok(())
}

/// Set raw mode on a terminal file descriptor
///
/// Raw mode lets the bridge see every keypress, including control
/// characters and escape sequences.
pub fn set_raw_mode(fd: RawFd) -> Result<libc::termios> {
    let original_termios = unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            let err = std::io::Error::last_os_error();
            return Err(AcsError::Terminal(format!("not a terminal: {}", err)));
        }
        termios
    };

    let mut raw_termios = original_termios;

    unsafe {
        libc::cfmakeraw(&mut raw_termios);
        libc::tcsetattr(fd, libc::TCSANOW, &raw_termios);
    }

    Ok(original_termios)
}

/// Restore terminal attributes
pub fn restore_termios(fd: RawFd, termios: &libc::termios) {
    unsafe {
        libc::tcsetattr(fd, libc::TCSANOW, termios);
    }
}

/// Make reads on `fd` return WouldBlock instead of waiting.
/// Returns the flags to put back later.
pub fn set_nonblocking(fd: RawFd) -> Result<OFlag> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(flags)
}

/// Puts a descriptor's file status flags back when dropped.
///
/// Stdin is shared with the shell we were started from, which expects
/// blocking reads once we exit.
pub struct FlagsGuard {
    fd: RawFd,
    flags: OFlag,
}

impl FlagsGuard {
    /// Make `fd` non-blocking until the guard is dropped
    pub fn nonblocking(fd: RawFd) -> Result<Self> {
        let flags = set_nonblocking(fd)?;
        Ok(Self { fd, flags })
    }
}

impl Drop for FlagsGuard {
    fn drop(&mut self) {
        if fcntl(self.fd, FcntlArg::F_SETFL(self.flags)).is_ok() {
            debug!("File flags restored on fd {}", self.fd);
        }
    }
}
