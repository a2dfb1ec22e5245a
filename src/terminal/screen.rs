//! Terminal screen memory
//!
//! A 2D grid of cells mirroring what the console shows. Screen mode reads
//! from a snapshot of it.

use super::Cell;
use crate::event::ScreenSnapshot;

pub struct Screen {
    /// buffer[y][x] where y is row, x is column
    pub buffer: Vec<Vec<Cell>>,

    /// Current cursor position (x, y) - where new text will be drawn.
    /// x may equal cols, meaning the next character wraps.
    pub cursor: (u16, u16),

    /// Terminal dimensions (cols, rows)
    pub size: (u16, u16),

    /// Scroll region (top, bottom), inclusive
    pub scroll_region: Option<(u16, u16)>,

    /// Cursor saved by ESC 7 or CSI s
    pub saved_cursor: Option<(u16, u16)>,

    /// Primary screen while the alternate screen is up
    saved_buffer: Option<(Vec<Vec<Cell>>, (u16, u16))>,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        let (cols, rows) = (cols.max(1), rows.max(1));
        Self {
            buffer: vec![vec![Cell::new(); cols as usize]; rows as usize],
            cursor: (0, 0),
            size: (cols, rows),
            scroll_region: None,
            saved_cursor: None,
            saved_buffer: None,
        }
    }

    fn blank_row(&self) -> Vec<Cell> {
        vec![Cell::new(); self.size.0 as usize]
    }

    fn region(&self) -> (u16, u16) {
        self.scroll_region.unwrap_or((0, self.size.1 - 1))
    }

    pub fn get_char(&self, x: u16, y: u16) -> Option<char> {
        self.buffer
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .map(|cell| cell.data)
    }

    /// One row as text, trailing blanks removed
    pub fn get_line_trimmed(&self, y: u16) -> String {
        self.buffer
            .get(y as usize)
            .map(|row| {
                row.iter()
                    .filter(|c| !c.is_wide_continuation)
                    .map(|c| c.data)
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .unwrap_or_default()
    }

    /// Resize, keeping what still fits
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let (cols, rows) = (cols.max(1), rows.max(1));
        let mut new_buffer = vec![vec![Cell::new(); cols as usize]; rows as usize];
        for (y, row) in new_buffer.iter_mut().enumerate().take(self.buffer.len()) {
            let copy_cols = (cols as usize).min(self.buffer[y].len());
            row[..copy_cols].copy_from_slice(&self.buffer[y][..copy_cols]);
        }
        self.buffer = new_buffer;
        self.size = (cols, rows);
        self.scroll_region = None;
        self.cursor.0 = self.cursor.0.min(cols - 1);
        self.cursor.1 = self.cursor.1.min(rows - 1);
    }

    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            row.iter_mut().for_each(Cell::clear);
        }
    }

    pub fn clear_to_end(&mut self) {
        let (x, y) = self.cursor;
        if let Some(row) = self.buffer.get_mut(y as usize) {
            row.iter_mut().skip(x as usize).for_each(Cell::clear);
        }
        for row in self.buffer.iter_mut().skip(y as usize + 1) {
            row.iter_mut().for_each(Cell::clear);
        }
    }

    pub fn clear_to_start(&mut self) {
        let (x, y) = self.cursor;
        for row in self.buffer.iter_mut().take(y as usize) {
            row.iter_mut().for_each(Cell::clear);
        }
        if let Some(row) = self.buffer.get_mut(y as usize) {
            row.iter_mut().take(x as usize + 1).for_each(Cell::clear);
        }
    }

    /// Erase in line: 0 to the end, 1 to the start, 2 the whole line
    pub fn erase_line(&mut self, mode: u16) {
        let (x, y) = self.cursor;
        let Some(row) = self.buffer.get_mut(y as usize) else {
            return;
        };
        match mode {
            0 => row.iter_mut().skip(x as usize).for_each(Cell::clear),
            1 => row.iter_mut().take(x as usize + 1).for_each(Cell::clear),
            2 => row.iter_mut().for_each(Cell::clear),
            _ => {}
        }
    }

    /// Content moves up, blank line at the bottom of the region
    pub fn scroll_up(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        for _ in 0..lines.min(bottom - top + 1) {
            self.buffer.remove(top as usize);
            let blank = self.blank_row();
            self.buffer.insert(bottom as usize, blank);
        }
    }

    /// Content moves down, blank line at the top of the region
    pub fn scroll_down(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        for _ in 0..lines.min(bottom - top + 1) {
            self.buffer.remove(bottom as usize);
            let blank = self.blank_row();
            self.buffer.insert(top as usize, blank);
        }
    }

    /// Move down a line, scrolling at the bottom of the region
    pub fn linefeed(&mut self) {
        let (_, bottom) = self.region();
        if self.cursor.1 == bottom {
            self.scroll_up(1);
        } else if self.cursor.1 < self.size.1 - 1 {
            self.cursor.1 += 1;
        }
    }

    /// Move up a line, scrolling at the top of the region
    pub fn reverse_linefeed(&mut self) {
        let (top, _) = self.region();
        if self.cursor.1 == top {
            self.scroll_down(1);
        } else if self.cursor.1 > 0 {
            self.cursor.1 -= 1;
        }
    }

    /// Insert blank lines at the cursor row, within the scroll region
    pub fn insert_lines(&mut self, n: u16) {
        let (top, bottom) = self.region();
        let y = self.cursor.1;
        if y < top || y > bottom {
            return;
        }
        for _ in 0..n.min(bottom - y + 1) {
            self.buffer.remove(bottom as usize);
            let blank = self.blank_row();
            self.buffer.insert(y as usize, blank);
        }
    }

    /// Delete lines at the cursor row, within the scroll region
    pub fn delete_lines(&mut self, n: u16) {
        let (top, bottom) = self.region();
        let y = self.cursor.1;
        if y < top || y > bottom {
            return;
        }
        for _ in 0..n.min(bottom - y + 1) {
            self.buffer.remove(y as usize);
            let blank = self.blank_row();
            self.buffer.insert(bottom as usize, blank);
        }
    }

    pub fn insert_chars(&mut self, n: u16) {
        let (x, y) = self.cursor;
        if let Some(row) = self.buffer.get_mut(y as usize) {
            let x = (x as usize).min(row.len());
            for _ in 0..n {
                row.insert(x, Cell::new());
                row.pop();
            }
        }
    }

    pub fn delete_chars(&mut self, n: u16) {
        let (x, y) = self.cursor;
        if let Some(row) = self.buffer.get_mut(y as usize) {
            let x = x as usize;
            for _ in 0..n {
                if x < row.len() {
                    row.remove(x);
                    row.push(Cell::new());
                }
            }
        }
    }

    /// DECSTBM, 1-based and inclusive. An invalid region resets to the full
    /// screen. The cursor goes home.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let rows = self.size.1;
        let (top, bottom) = (top.max(1) - 1, bottom.min(rows).max(1) - 1);
        self.scroll_region = if top < bottom && (top, bottom) != (0, rows - 1) {
            Some((top, bottom))
        } else {
            None
        };
        self.cursor = (0, 0);
    }

    /// Switch to the alternate screen, keeping the primary one
    pub fn enter_alternate(&mut self) {
        if self.saved_buffer.is_none() {
            self.saved_buffer = Some((self.buffer.clone(), self.cursor));
            self.clear();
        }
    }

    /// Return to the primary screen
    pub fn leave_alternate(&mut self) {
        if let Some((buffer, cursor)) = self.saved_buffer.take() {
            self.buffer = buffer;
            self.cursor = cursor;
        }
    }

    /// Copy of screen memory for the reading buffer
    pub fn snapshot(&self) -> ScreenSnapshot {
        let (cols, rows) = self.size;
        let mut snap = ScreenSnapshot::blank(cols, rows);
        for (y, row) in self.buffer.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let i = y * cols as usize + x;
                // The right half of a wide character reads as a space
                snap.cells[i] = if cell.is_wide_continuation {
                    ' ' as u32
                } else {
                    cell.data as u32
                };
                snap.attribs[i] = cell.attrib;
            }
        }
        snap.cursor = (self.cursor.0.min(cols - 1), self.cursor.1);
        snap
    }
}
