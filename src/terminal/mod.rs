//! The console behind the bridge: a PTY running a shell, and the screen
//! memory kept for it

pub mod cell;
pub mod console;
pub mod emulator;
pub mod pty;
pub mod screen;
pub mod util;
mod performer;

pub use cell::Cell;
pub use console::PtyConsole;
pub use emulator::Emulator;
pub use pty::Pty;
pub use screen::Screen;
pub use util::{get_terminal_size, restore_termios, set_raw_mode};
