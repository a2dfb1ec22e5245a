//! A console backed by a pseudo-terminal
//!
//! Without the kernel module we sit between the user's terminal and a
//! shell. Keys we want are taken out of stdin, everything else goes to the
//! shell, and the shell's output is shown on stdout and turned into events.

use super::util::FlagsGuard;
use super::{Emulator, Pty};
use crate::event::{EchoKind, KernelEvent, KernelSource, Keystroke, Output, ScreenSnapshot};
use crate::input::keymap::{chord, Chord};
use crate::input::keys::{self, decode_keys};
use crate::Result;
use log::{debug, trace};
use std::collections::{HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

const READ_CHUNK: usize = 4096;

/// Typed characters waiting for their echo
const MAX_TYPED: usize = 64;

/// Turns a byte stream into code points, keeping incomplete sequences for
/// the next read. Bytes that are not UTF-8 are taken as Latin-1.
#[derive(Debug, Default)]
pub struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<u32> {
        self.pending.extend_from_slice(bytes);
        let mut out = Vec::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.extend(s.chars().map(|c| c as u32));
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (good, bad) = rest.split_at(e.valid_up_to());
                    // valid_up_to() guarantees this slice is UTF-8
                    if let Ok(s) = std::str::from_utf8(good) {
                        out.extend(s.chars().map(|c| c as u32));
                    }
                    match e.error_len() {
                        Some(n) => {
                            out.extend(bad[..n].iter().map(|&b| b as u32));
                            rest = &bad[n..];
                        }
                        None => {
                            rest = bad;
                            break;
                        }
                    }
                }
            }
        }
        self.pending = rest.to_vec();
        out
    }
}

pub struct PtyConsole {
    pty: Pty,
    emulator: Emulator,
    stdin_fd: RawFd,
    _stdin_flags: FlagsGuard,
    captured: HashSet<Chord>,
    capture_next: bool,
    typed: VecDeque<u32>,
    decoder: Utf8Stream,
    closed: bool,
}

impl PtyConsole {
    /// Start `program` (or the user's shell) in a PTY of the given size
    pub fn spawn(program: Option<Vec<String>>, cols: u16, rows: u16) -> Result<Self> {
        let pty = Pty::new(program, rows, cols)?;
        let stdin_fd = io::stdin().as_raw_fd();
        let stdin_flags = FlagsGuard::nonblocking(stdin_fd)?;
        Ok(Self {
            pty,
            emulator: Emulator::new(cols, rows),
            stdin_fd,
            _stdin_flags: stdin_flags,
            captured: HashSet::new(),
            capture_next: false,
            typed: VecDeque::new(),
            decoder: Utf8Stream::new(),
            closed: false,
        })
    }

    fn read_stdin(&mut self, events: &mut Vec<KernelEvent>) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        let mut stdin = io::stdin().lock();
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => {
                    debug!("stdin closed");
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    for decoded in decode_keys(&buf[..n]) {
                        self.route_key(decoded.key, &decoded.bytes, events)?;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn route_key(
        &mut self,
        key: Option<Keystroke>,
        bytes: &[u8],
        events: &mut Vec<KernelEvent>,
    ) -> Result<()> {
        if let Some(key) = key {
            if self.capture_next || self.captured.contains(&chord(&key)) {
                self.capture_next = false;
                trace!("Captured {:?}", key);
                events.push(KernelEvent::Keystroke(key));
                return Ok(());
            }
            let typed = match key.code {
                keys::ENTER => Some('\r'),
                keys::TAB => Some('\t'),
                _ => keys::typed_char(&key),
            };
            if let Some(c) = typed {
                if self.typed.len() == MAX_TYPED {
                    self.typed.pop_front();
                }
                self.typed.push_back(c as u32);
            }
        }
        self.pty.write_all(bytes)
    }

    fn read_pty(&mut self, events: &mut Vec<KernelEvent>) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.pty.read(&mut buf) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    let bytes = &buf[..n];
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(bytes)?;
                    stdout.flush()?;
                    self.emulator.process(bytes);
                    for ch in self.decoder.push(bytes) {
                        let echo = self.classify(ch);
                        events.push(KernelEvent::MoreOutput(Output::new(echo, ch)));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if self.pty.has_exited() {
                        self.closed = true;
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // Linux reports EIO once the last slave descriptor closes
                Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => {
                    debug!("PTY hung up");
                    self.closed = true;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn classify(&mut self, ch: u32) -> EchoKind {
        classify_echo(&mut self.typed, ch)
    }
}

/// Match a code point of output against the keys waiting for their echo
pub fn classify_echo(typed: &mut VecDeque<u32>, ch: u32) -> EchoKind {
    match typed.front() {
        Some(&front) if front == ch => {
            typed.pop_front();
            EchoKind::DirectEcho
        }
        Some(_) if ch < 0x20 || ch == ' ' as u32 || ch == 0x7f => EchoKind::IndirectEcho,
        Some(_) => {
            // The program printed something else; stop waiting
            typed.clear();
            EchoKind::Output
        }
        None => EchoKind::Output,
    }
}

impl KernelSource for PtyConsole {
    fn read_events(&mut self) -> Result<Vec<KernelEvent>> {
        let mut events = Vec::new();
        if !self.closed {
            self.read_stdin(&mut events)?;
            self.read_pty(&mut events)?;
        }
        Ok(events)
    }

    fn screen(&self) -> ScreenSnapshot {
        self.emulator.snapshot()
    }

    fn raw_fds(&self) -> Vec<RawFd> {
        vec![self.stdin_fd, self.pty.as_raw_fd()]
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn capture_keys(&mut self, chords: &[(u16, u8)]) {
        self.captured = chords.iter().copied().collect();
        debug!("Capturing {} keys", self.captured.len());
    }

    fn capture_next(&mut self) {
        self.capture_next = true;
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.emulator.resize(cols, rows);
        self.pty.resize(rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_split_across_reads() {
        let mut stream = Utf8Stream::new();
        let bytes = "aé".as_bytes();
        assert_eq!(stream.push(&bytes[..2]), vec!['a' as u32]);
        assert_eq!(stream.push(&bytes[2..]), vec![0xe9]);
    }

    #[test]
    fn test_invalid_bytes_are_latin1() {
        let mut stream = Utf8Stream::new();
        assert_eq!(stream.push(b"x\xe9y"), vec!['x' as u32, 0xe9, 'y' as u32]);
    }

    #[test]
    fn test_classify_echo() {
        let mut typed: VecDeque<u32> = "ab\t".chars().map(|c| c as u32).collect();
        assert_eq!(classify_echo(&mut typed, 'a' as u32), EchoKind::DirectEcho);
        assert_eq!(classify_echo(&mut typed, 'b' as u32), EchoKind::DirectEcho);
        assert_eq!(classify_echo(&mut typed, ' ' as u32), EchoKind::IndirectEcho);
        assert_eq!(classify_echo(&mut typed, ' ' as u32), EchoKind::IndirectEcho);
        assert_eq!(classify_echo(&mut typed, 'z' as u32), EchoKind::Output);
        assert!(typed.is_empty());
        assert_eq!(classify_echo(&mut typed, 'q' as u32), EchoKind::Output);
    }
}
