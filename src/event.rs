//! Kernel events and the source that delivers them
//!
//! The bridge does not care whether keystrokes and tty output come from a
//! kernel module or from a pseudo-terminal we own. Either way the source hands
//! us a typed stream of events plus a copy of screen memory for screen mode.

use crate::Result;
use std::os::unix::io::RawFd;

/// Shift state bits carried by a keystroke
pub mod shift {
    pub const SHIFT: u8 = 0x01;
    pub const RALT: u8 = 0x02;
    pub const CTRL: u8 = 0x04;
    pub const LALT: u8 = 0x08;
    /// Either alt key
    pub const ALT: u8 = LALT | RALT;
}

/// Lock LED bits carried by a keystroke
pub mod leds {
    pub const SCROLL_LOCK: u8 = 0x01;
    pub const NUM_LOCK: u8 = 0x02;
    pub const CAPS_LOCK: u8 = 0x04;
}

/// A key captured for the adapter instead of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keystroke {
    /// Key code. Printable keys use their base character; named keys use
    /// the constants in `input::keys`.
    pub code: u16,
    /// Modifier bits from `shift`
    pub shift: u8,
    /// Lock LED bits from `leds`
    pub leds: u8,
}

impl Keystroke {
    pub fn new(code: u16, shift: u8) -> Self {
        Self {
            code,
            shift,
            leds: 0,
        }
    }
}

/// How a character of tty output relates to what the user typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    /// Ordinary program output
    Output,
    /// The echo of a key the user just typed
    DirectEcho,
    /// Output caused by a key but not equal to it, such as spaces for a tab
    IndirectEcho,
}

/// One code point of tty output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub echo: EchoKind,
    pub ch: u32,
}

impl Output {
    pub fn new(echo: EchoKind, ch: u32) -> Self {
        Self { echo, ch }
    }
}

/// Events delivered by the kernel side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelEvent {
    Keystroke(Keystroke),
    MoreOutput(Output),
    ConsoleSwitch { console: u8 },
}

/// A copy of screen memory for the foreground console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    pub rows: u16,
    pub cols: u16,
    /// rows * cols code points, row major
    pub cells: Vec<u32>,
    /// Display attribute per cell; 7 is a normal character
    pub attribs: Vec<u8>,
    /// Visual cursor (col, row)
    pub cursor: (u16, u16),
}

impl ScreenSnapshot {
    /// A blank screen with the cursor in the top left corner
    pub fn blank(cols: u16, rows: u16) -> Self {
        let n = cols as usize * rows as usize;
        Self {
            rows,
            cols,
            cells: vec![' ' as u32; n],
            attribs: vec![7; n],
            cursor: (0, 0),
        }
    }
}

/// Where kernel events come from
pub trait KernelSource {
    /// Events that arrived since the last call, in arrival order.
    /// An empty vector is a normal result for a spurious wakeup.
    fn read_events(&mut self) -> Result<Vec<KernelEvent>>;

    /// Current screen memory of the foreground console
    fn screen(&self) -> ScreenSnapshot;

    /// File descriptors the multiplexer should watch for this source
    fn raw_fds(&self) -> Vec<RawFd>;

    /// The foreground console
    fn console(&self) -> u8 {
        0
    }

    /// True once the source can deliver nothing more, as when the
    /// program behind it has exited
    fn is_closed(&self) -> bool {
        false
    }

    /// Keys to deliver as keystroke events instead of passing to the
    /// console. Each entry is a key code and its normalized modifiers.
    fn capture_keys(&mut self, _chords: &[(u16, u8)]) {}

    /// Capture the next key whatever it is, as for a mark or search prompt
    fn capture_next(&mut self) {}

    /// The window changed size
    fn resize(&mut self, _cols: u16, _rows: u16) -> Result<()> {
        Ok(())
    }
}
