//! Terminal emulator using vte
//!
//! Keeps screen memory for the console so screen mode has something to read.

use super::cell::NORMAL_ATTRIB;
use super::{performer::ScreenPerformer, Screen};
use crate::event::ScreenSnapshot;
use log::{debug, trace};
use vte::Parser;

pub struct Emulator {
    pub screen: Screen,

    /// VTE parser for processing ANSI escape sequences
    parser: Parser,

    /// Attribute set by the last SGR sequence
    attrib: u8,
}

impl Emulator {
    pub fn new(cols: u16, rows: u16) -> Self {
        debug!("Creating emulator with {}x{} dimensions", cols, rows);
        Self {
            screen: Screen::new(cols, rows),
            parser: Parser::new(),
            attrib: NORMAL_ATTRIB,
        }
    }

    /// Feed bytes from the PTY into screen memory
    pub fn process(&mut self, bytes: &[u8]) {
        trace!("Processing {} bytes from PTY", bytes.len());
        let mut performer = ScreenPerformer {
            screen: &mut self.screen,
            attrib: &mut self.attrib,
        };
        for &byte in bytes {
            self.parser.advance(&mut performer, byte);
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        debug!("Resizing emulator to {}x{}", cols, rows);
        self.screen.resize(cols, rows);
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.screen.cursor
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        self.screen.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_split_across_reads() {
        let mut emu = Emulator::new(10, 3);
        emu.process(b"ab\x1b[");
        emu.process(b"2;1Hcd");
        let snap = emu.snapshot();
        assert_eq!(snap.cells[0], 'a' as u32);
        assert_eq!(snap.cells[10], 'c' as u32);
        assert_eq!(snap.cursor, (2, 1));
    }
}
