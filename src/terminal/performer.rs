//! VTE Performer implementation
//!
//! Separated from Emulator to avoid borrow checker issues

use super::cell::NORMAL_ATTRIB;
use super::{Cell, Screen};
use log::trace;
use unicode_width::UnicodeWidthChar;
use vte::{Params, Perform};

/// Parameter `i`, or `default` when it is missing or zero
fn param(params: &Params, i: usize, default: u16) -> u16 {
    params
        .iter()
        .nth(i)
        .and_then(|p| p.first().copied())
        .filter(|&n| n != 0)
        .unwrap_or(default)
}

/// Apply one SGR parameter to a VGA style attribute byte
fn apply_sgr(attrib: u8, p: u16) -> u8 {
    // ANSI color order to VGA color order
    const VGA: [u8; 8] = [0, 4, 2, 6, 1, 5, 3, 7];
    match p {
        0 => NORMAL_ATTRIB,
        1 => attrib | 0x08,
        22 => attrib & !0x08,
        // Reverse video swaps foreground and background
        7 => (attrib << 4) | (attrib >> 4),
        30..=37 => (attrib & 0xf8) | VGA[(p - 30) as usize],
        39 => (attrib & 0xf8) | NORMAL_ATTRIB,
        40..=47 => (attrib & 0x0f) | (VGA[(p - 40) as usize] << 4),
        49 => attrib & 0x0f,
        _ => attrib,
    }
}

/// Performer that updates screen memory in response to terminal sequences
pub struct ScreenPerformer<'a> {
    pub screen: &'a mut Screen,
    /// Attribute for newly drawn characters
    pub attrib: &'a mut u8,
}

impl<'a> Perform for ScreenPerformer<'a> {
    /// Print a character to the screen
    ///
    /// Auto-wrap (DECAWM) is always on: when the cursor is past the right
    /// margin and a new character arrives, wrap to the next line first,
    /// scrolling at the bottom.
    fn print(&mut self, c: char) {
        let (cols, rows) = self.screen.size;
        let width = c.width().unwrap_or(1) as u16;
        if width == 0 {
            // Combining marks have no cell of their own
            return;
        }

        if self.screen.cursor.0 >= cols || self.screen.cursor.0 + width > cols {
            self.screen.cursor.0 = 0;
            self.screen.linefeed();
        }

        let (x, y) = self.screen.cursor;
        if y >= rows || x >= cols {
            return;
        }

        let attrib = *self.attrib;
        if let Some(row) = self.screen.buffer.get_mut(y as usize) {
            row[x as usize] = Cell::with_char(c, attrib);
            if width > 1 && (x + 1) < cols {
                row[x as usize + 1] = Cell::wide_continuation(attrib);
            }
        }

        // Allowed to reach cols, one past the last column, so the next
        // character wraps
        self.screen.cursor.0 = x + width;
    }

    /// Execute a control character (e.g., \n, \r, \t)
    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | 0x0b | 0x0c => self.screen.linefeed(),
            b'\r' => self.screen.cursor.0 = 0,
            // Tab stops every 8 columns
            b'\t' => {
                let next = ((self.screen.cursor.0 / 8) + 1) * 8;
                self.screen.cursor.0 = next.min(self.screen.size.0 - 1);
            }
            0x08 => {
                let x = self.screen.cursor.0.min(self.screen.size.0);
                self.screen.cursor.0 = x.saturating_sub(1);
            }
            _ => trace!("Unhandled execute: 0x{:02x}", byte),
        }
    }

    /// Handle CSI sequences: cursor movement, erasing, scrolling, modes
    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        let (cols, rows) = self.screen.size;
        let private = intermediates.first() == Some(&b'?');

        match action {
            'H' | 'f' => {
                let row = param(params, 0, 1) - 1;
                let col = param(params, 1, 1) - 1;
                self.screen.cursor = (col.min(cols - 1), row.min(rows - 1));
            }
            'A' => self.screen.cursor.1 = self.screen.cursor.1.saturating_sub(param(params, 0, 1)),
            'B' => {
                self.screen.cursor.1 = (self.screen.cursor.1 + param(params, 0, 1)).min(rows - 1)
            }
            'C' => {
                self.screen.cursor.0 = (self.screen.cursor.0 + param(params, 0, 1)).min(cols - 1)
            }
            'D' => {
                let x = self.screen.cursor.0.min(cols - 1);
                self.screen.cursor.0 = x.saturating_sub(param(params, 0, 1));
            }
            'E' => {
                self.screen.cursor.0 = 0;
                self.screen.cursor.1 = (self.screen.cursor.1 + param(params, 0, 1)).min(rows - 1);
            }
            'F' => {
                self.screen.cursor.0 = 0;
                self.screen.cursor.1 = self.screen.cursor.1.saturating_sub(param(params, 0, 1));
            }
            'G' | '`' => self.screen.cursor.0 = (param(params, 0, 1) - 1).min(cols - 1),
            'd' => self.screen.cursor.1 = (param(params, 0, 1) - 1).min(rows - 1),

            'J' => match params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0) {
                0 => self.screen.clear_to_end(),
                1 => self.screen.clear_to_start(),
                2 | 3 => self.screen.clear(),
                _ => {}
            },
            'K' => {
                let mode = params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0);
                self.screen.erase_line(mode);
            }
            'X' => {
                let (x, y) = self.screen.cursor;
                let n = param(params, 0, 1) as usize;
                if let Some(row) = self.screen.buffer.get_mut(y as usize) {
                    row.iter_mut().skip(x as usize).take(n).for_each(Cell::clear);
                }
            }

            'S' => self.screen.scroll_up(param(params, 0, 1)),
            'T' => self.screen.scroll_down(param(params, 0, 1)),
            'L' => self.screen.insert_lines(param(params, 0, 1)),
            'M' => self.screen.delete_lines(param(params, 0, 1)),
            'P' => self.screen.delete_chars(param(params, 0, 1)),
            '@' => self.screen.insert_chars(param(params, 0, 1)),
            'r' => self.screen.set_scroll_region(param(params, 0, 1), param(params, 1, rows)),

            's' => self.screen.saved_cursor = Some(self.screen.cursor),
            'u' => {
                if let Some(saved) = self.screen.saved_cursor {
                    self.screen.cursor = saved;
                }
            }

            'm' => {
                if params.is_empty() {
                    *self.attrib = NORMAL_ATTRIB;
                }
                for p in params.iter() {
                    *self.attrib = apply_sgr(*self.attrib, p.first().copied().unwrap_or(0));
                }
            }

            // Alternate screen: full-screen programs save the shell's screen
            'h' | 'l' if private => {
                for p in params.iter() {
                    if matches!(p.first(), Some(47 | 1047 | 1049)) {
                        if action == 'h' {
                            self.screen.enter_alternate();
                        } else {
                            self.screen.leave_alternate();
                        }
                    }
                }
            }

            _ => trace!("Unhandled CSI: {} with {:?}", action, params),
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}
    fn put(&mut self, _byte: u8) {}
    fn unhook(&mut self) {}
    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    /// Handle ESC sequences
    ///
    /// - ESC 7 (DECSC): Save cursor position
    /// - ESC 8 (DECRC): Restore cursor position
    /// - ESC M: Reverse index (move up, scroll down if at top)
    /// - ESC D: Index (move down, scroll up if at bottom)
    /// - ESC E: Next line (CR + LF)
    /// - ESC c: Full reset
    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            trace!("ESC with intermediates {:?} byte {}", intermediates, byte);
            return;
        }

        match byte {
            b'7' => self.screen.saved_cursor = Some(self.screen.cursor),
            b'8' => {
                if let Some(saved) = self.screen.saved_cursor {
                    self.screen.cursor = saved;
                }
            }
            b'M' => self.screen.reverse_linefeed(),
            b'D' => self.screen.linefeed(),
            b'E' => {
                self.screen.cursor.0 = 0;
                self.screen.linefeed();
            }
            b'c' => {
                let (cols, rows) = self.screen.size;
                *self.screen = Screen::new(cols, rows);
                *self.attrib = NORMAL_ATTRIB;
            }
            _ => trace!("Unhandled ESC: 0x{:02x} ('{}')", byte, byte as char),
        }
    }
}
