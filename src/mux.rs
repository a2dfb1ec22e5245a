//! Event multiplexer
//!
//! One blocking wait over the three things that can wake the bridge: the
//! kernel source, input from the synthesizer, and the message FIFO. The wait
//! reports which of them are ready; the caller drains each one completely
//! before waiting again, since mio only reports edges.
//!
//! WSL doesn't support epoll on TTY file descriptors, so there the wait falls
//! back to select().

use crate::platform::is_wsl;
use crate::Result;
use log::{debug, trace};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::fmt;
use std::io;
use std::ops::BitOr;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Token for synthesizer input
const SYNTH: Token = Token(1);
/// Token for the message FIFO
const FIFO: Token = Token(2);
/// Kernel source descriptors get tokens from here up
const KERNEL_BASE: usize = 16;

/// Which sources have something to read
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready(u8);

impl Ready {
    pub const NONE: Ready = Ready(0);
    pub const KERNEL: Ready = Ready(1);
    pub const SYNTH: Ready = Ready(2);
    pub const FIFO: Ready = Ready(4);

    pub fn contains(self, other: Ready) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Ready {
    type Output = Ready;

    fn bitor(self, rhs: Ready) -> Ready {
        Ready(self.0 | rhs.0)
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Ready::KERNEL) {
            names.push("kernel");
        }
        if self.contains(Ready::SYNTH) {
            names.push("synth");
        }
        if self.contains(Ready::FIFO) {
            names.push("fifo");
        }
        write!(f, "Ready({})", names.join("|"))
    }
}

enum Backend {
    Mio { poll: Poll, events: Events },
    Select,
}

pub struct EventMux {
    backend: Backend,
    kernel: Vec<RawFd>,
    synth: Option<RawFd>,
    fifo: Option<RawFd>,
}

impl EventMux {
    /// Create a multiplexer, using select() where epoll won't work
    pub fn new() -> Result<Self> {
        Self::with_select(is_wsl())
    }

    pub fn with_select(use_select: bool) -> Result<Self> {
        let backend = if use_select {
            debug!("Using select() for event loop (WSL mode)");
            Backend::Select
        } else {
            debug!("Using mio::Poll for event loop");
            Backend::Mio {
                poll: Poll::new()?,
                events: Events::with_capacity(128),
            }
        };
        Ok(Self {
            backend,
            kernel: Vec::new(),
            synth: None,
            fifo: None,
        })
    }

    fn register(&self, fd: RawFd, token: Token) -> Result<()> {
        if let Backend::Mio { poll, .. } = &self.backend {
            poll.registry()
                .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
        }
        Ok(())
    }

    fn deregister(&self, fd: RawFd) {
        if let Backend::Mio { poll, .. } = &self.backend {
            // Closing the descriptor already removed it
            if let Err(e) = poll.registry().deregister(&mut SourceFd(&fd)) {
                trace!("Deregistering fd {}: {}", fd, e);
            }
        }
    }

    /// Watch the kernel source's descriptors
    pub fn watch_kernel(&mut self, fds: &[RawFd]) -> Result<()> {
        for fd in std::mem::take(&mut self.kernel) {
            self.deregister(fd);
        }
        for (i, &fd) in fds.iter().enumerate() {
            self.register(fd, Token(KERNEL_BASE + i))?;
        }
        self.kernel = fds.to_vec();
        Ok(())
    }

    /// Watch synthesizer input, or stop watching it
    pub fn watch_synth(&mut self, fd: Option<RawFd>) -> Result<()> {
        if let Some(old) = self.synth.take() {
            self.deregister(old);
        }
        if let Some(fd) = fd {
            self.register(fd, SYNTH)?;
        }
        self.synth = fd;
        Ok(())
    }

    /// Watch the message FIFO, or stop watching it
    pub fn watch_fifo(&mut self, fd: Option<RawFd>) -> Result<()> {
        if let Some(old) = self.fifo.take() {
            self.deregister(old);
        }
        if let Some(fd) = fd {
            self.register(fd, FIFO)?;
        }
        self.fifo = fd;
        Ok(())
    }

    /// Block until a source is ready or `timeout` passes. A wait cut short by
    /// a signal reports nothing ready.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<Ready> {
        let ready = match &mut self.backend {
            Backend::Mio { poll, events } => {
                match poll.poll(events, timeout) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                        debug!("poll() interrupted by signal");
                        return Ok(Ready::NONE);
                    }
                    Err(e) => return Err(e.into()),
                }
                events.iter().fold(Ready::NONE, |ready, event| {
                    ready
                        | match event.token() {
                            SYNTH => Ready::SYNTH,
                            FIFO => Ready::FIFO,
                            Token(t) if t >= KERNEL_BASE => Ready::KERNEL,
                            _ => Ready::NONE,
                        }
                })
            }
            Backend::Select => select_wait(&self.kernel, self.synth, self.fifo, timeout)?,
        };
        trace!("Woke with {:?}", ready);
        Ok(ready)
    }
}

fn select_wait(
    kernel: &[RawFd],
    synth: Option<RawFd>,
    fifo: Option<RawFd>,
    timeout: Option<Duration>,
) -> Result<Ready> {
    use nix::errno::Errno;
    use nix::sys::select::{select, FdSet};
    use nix::sys::time::{TimeVal, TimeValLike};
    use std::os::unix::io::BorrowedFd;

    // The descriptors are owned by the sources, which outlive this call
    let borrow = |fd: RawFd| unsafe { BorrowedFd::borrow_raw(fd) };

    // select() modifies the set, so it is rebuilt on every wait
    let mut read_fds = FdSet::new();
    let mut tagged = Vec::new();
    for &fd in kernel {
        tagged.push((borrow(fd), Ready::KERNEL));
    }
    if let Some(fd) = synth {
        tagged.push((borrow(fd), Ready::SYNTH));
    }
    if let Some(fd) = fifo {
        tagged.push((borrow(fd), Ready::FIFO));
    }
    for (fd, _) in &tagged {
        read_fds.insert(*fd);
    }

    let mut tv = timeout.map(|d| TimeVal::milliseconds(d.as_millis() as i64));
    match select(None, Some(&mut read_fds), None, None, tv.as_mut()) {
        Ok(_) => {}
        Err(Errno::EINTR) => {
            debug!("select() interrupted by signal");
            return Ok(Ready::NONE);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(tagged
        .iter()
        .filter(|(fd, _)| read_fds.contains(*fd))
        .fold(Ready::NONE, |ready, (_, bit)| ready | *bit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{pipe, write};
    use std::os::fd::AsRawFd;

    #[test]
    fn test_ready_bits() {
        let r = Ready::KERNEL | Ready::FIFO;
        assert!(r.contains(Ready::KERNEL));
        assert!(!r.contains(Ready::SYNTH));
        assert!(Ready::NONE.is_empty());
        assert_eq!(r.bits(), 5);
        assert_eq!(format!("{:?}", r), "Ready(kernel|fifo)");
    }

    fn readiness(use_select: bool) {
        let (kernel_r, _kernel_w) = pipe().unwrap();
        let (fifo_r, fifo_w) = pipe().unwrap();
        let mut mux = EventMux::with_select(use_select).unwrap();
        mux.watch_kernel(&[kernel_r.as_raw_fd()]).unwrap();
        mux.watch_fifo(Some(fifo_r.as_raw_fd())).unwrap();

        let idle = mux.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(idle.is_empty());

        write(&fifo_w, b"say hi\n").unwrap();
        let ready = mux.wait(Some(Duration::from_millis(500))).unwrap();
        assert_eq!(ready, Ready::FIFO);
    }

    #[test]
    fn test_wait_with_poll() {
        readiness(false);
    }

    #[test]
    fn test_wait_with_select() {
        readiness(true);
    }

    #[test]
    fn test_unwatched_source_is_quiet() {
        let (synth_r, synth_w) = pipe().unwrap();
        let mut mux = EventMux::with_select(false).unwrap();
        mux.watch_synth(Some(synth_r.as_raw_fd())).unwrap();
        mux.watch_synth(None).unwrap();
        write(&synth_w, b"\x01").unwrap();
        assert!(mux.wait(Some(Duration::from_millis(10))).unwrap().is_empty());
    }
}
