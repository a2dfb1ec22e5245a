//! Byte transports to the synthesizer
//!
//! A hardware unit hangs off a serial port. A software synthesizer is either
//! a server we connect to over a socket or a child process we feed through a
//! pipe. Input is non-blocking so the event loop can drain it completely on
//! each wakeup; output waits a bounded time for the unit to take it.

use crate::terminal::util::set_nonblocking;
use crate::{AcsError, Result};
use log::{debug, info, warn};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::UnixStream;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// How long a write may wait for the unit to accept more bytes
const WRITE_TIMEOUT_MS: u16 = 2000;

/// A bidirectional byte stream to a synthesizer
pub trait SynthLink: Send {
    /// Write every byte, or fail
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever has arrived. `Ok(0)` means the other end closed;
    /// `WouldBlock` means nothing is waiting.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// The descriptor to watch for input
    fn input_fd(&self) -> Option<RawFd>;

    /// Switch between hardware and no flow control (serial only)
    fn set_flow_control(&mut self, _hardware: bool) -> Result<()> {
        Err(AcsError::Synth("flow control applies only to serial links".to_string()))
    }

    fn describe(&self) -> String;
}

/// Where the synthesizer is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkConfig {
    Serial {
        device: String,
        baud: u32,
        hardware_flow: bool,
    },
    /// `host:port`, or a path for a Unix socket
    Socket { address: String },
    /// A program and its arguments
    Pipe { command: Vec<String> },
}

/// Open the link described by `config`
pub fn open_link(config: &LinkConfig) -> Result<Box<dyn SynthLink>> {
    let link: Box<dyn SynthLink> = match config {
        LinkConfig::Serial {
            device,
            baud,
            hardware_flow,
        } => Box::new(SerialLink::open(device, *baud, *hardware_flow)?),
        LinkConfig::Socket { address } => Box::new(SocketLink::connect(address)?),
        LinkConfig::Pipe { command } => Box::new(PipeLink::spawn(command)?),
    };
    info!("Synthesizer link open: {}", link.describe());
    Ok(link)
}

/// Wait until `fd` can take more output
fn wait_writable(fd: BorrowedFd<'_>) -> io::Result<()> {
    let mut fds = [PollFd::new(fd, PollFlags::POLLOUT)];
    let ready = poll(&mut fds, PollTimeout::from(WRITE_TIMEOUT_MS)).map_err(io::Error::from)?;
    if ready == 0 {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "synthesizer is not accepting output",
        ));
    }
    Ok(())
}

/// `write_all` for a non-blocking descriptor
fn write_polled<W: Write + AsFd>(w: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match w.write(bytes) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => wait_writable(w.as_fd())?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    w.flush()
}

fn baud_rate(baud: u32) -> Result<BaudRate> {
    Ok(match baud {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        other => {
            return Err(AcsError::Config(format!(
                "baud rate {} is not a standard rate from 1200 to 115200",
                other
            )))
        }
    })
}

/// An external unit on a serial port, typically /dev/ttyS0
pub struct SerialLink {
    file: File,
    device: String,
}

impl SerialLink {
    pub fn open(device: &str, baud: u32, hardware_flow: bool) -> Result<Self> {
        let speed = baud_rate(baud)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(device)
            .map_err(|e| AcsError::Synth(format!("cannot open {}: {}", device, e)))?;

        let mut tio = termios::tcgetattr(&file)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, speed)?;
        tio.control_flags.insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio)?;
        debug!("Serial port {} at {} baud", device, baud);

        let mut link = Self {
            file,
            device: device.to_string(),
        };
        link.set_flow_control(hardware_flow)?;
        Ok(link)
    }
}

impl SynthLink for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_polled(&mut self.file, bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn input_fd(&self) -> Option<RawFd> {
        Some(self.file.as_raw_fd())
    }

    fn set_flow_control(&mut self, hardware: bool) -> Result<()> {
        let mut tio = termios::tcgetattr(&self.file)?;
        tio.control_flags.set(ControlFlags::CRTSCTS, hardware);
        termios::tcsetattr(&self.file, SetArg::TCSANOW, &tio)?;
        debug!(
            "{} flow control on {}",
            if hardware { "Hardware" } else { "No" },
            self.device
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial {}", self.device)
    }
}

enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

/// A software synthesizer listening on a socket
pub struct SocketLink {
    stream: Stream,
    address: String,
}

impl SocketLink {
    pub fn connect(address: &str) -> Result<Self> {
        let stream = if address.starts_with('/') {
            let s = UnixStream::connect(address)?;
            s.set_nonblocking(true)?;
            Stream::Unix(s)
        } else {
            let s = TcpStream::connect(address)?;
            s.set_nodelay(true)?;
            s.set_nonblocking(true)?;
            Stream::Tcp(s)
        };
        Ok(Self {
            stream,
            address: address.to_string(),
        })
    }
}

impl SynthLink for SocketLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.stream {
            Stream::Tcp(s) => write_polled(s, bytes),
            Stream::Unix(s) => write_polled(s, bytes),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Tcp(s) => s.read(buf),
            Stream::Unix(s) => s.read(buf),
        }
    }

    fn input_fd(&self) -> Option<RawFd> {
        Some(match &self.stream {
            Stream::Tcp(s) => s.as_raw_fd(),
            Stream::Unix(s) => s.as_raw_fd(),
        })
    }

    fn describe(&self) -> String {
        format!("socket {}", self.address)
    }
}

/// A software synthesizer running as our child, spoken to through pipes
pub struct PipeLink {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    program: String,
}

impl PipeLink {
    pub fn spawn(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AcsError::Config("synthesizer command is empty".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AcsError::Synth(format!("cannot start {}: {}", program, e)))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(AcsError::Synth(format!("no pipes to {}", program)));
        };
        set_nonblocking(stdout.as_raw_fd())?;
        debug!("Started {} as pid {}", program, child.id());

        Ok(Self {
            child,
            stdin,
            stdout,
            program: program.clone(),
        })
    }
}

impl SynthLink for PipeLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdin.write_all(bytes)?;
        self.stdin.flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }

    fn input_fd(&self) -> Option<RawFd> {
        Some(self.stdout.as_raw_fd())
    }

    fn describe(&self) -> String {
        format!("pipe to {}", self.program)
    }
}

impl Drop for PipeLink {
    fn drop(&mut self) {
        debug!("Stopping {}", self.program);
        match self.child.kill() {
            Ok(()) => {
                let _ = self.child.wait();
            }
            Err(e) => warn!("Failed to stop {}: {}", self.program, e),
        }
    }
}
