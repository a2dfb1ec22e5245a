//! The reading buffer
//!
//! The reading buffer holds the text the user is going to read. In screen
//! mode it is a copy of screen memory; in line mode it is a log of recent
//! tty output. Either way it is brought up to date before the adapter sees a
//! keystroke, so commands always read current text.
//!
//! Positions are logical stream counters rather than indices. The window
//! `[start, end)` slides forward as old output is evicted, and a position is
//! valid exactly when it lies inside the window. That is how the cursor and
//! the marks "fall off the back" of the log: they become `None`, never a
//! stale index into different text.

mod motion;
pub mod postprocess;

pub use motion::TokenKind;

use crate::event::{Output, ScreenSnapshot};
use log::{debug, trace};
use postprocess::{Edit, LogFilter, PostProcess};
use std::collections::VecDeque;
use std::fmt;

/// Number of bookmarks
pub const NUM_MARKS: usize = 30;

/// Default size of the line mode log, in code points
pub const DEFAULT_CAPACITY: usize = 50_000;

/// A position in the reading buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(pub u64);

impl Pos {
    /// The position `n` cells further on
    pub fn offset(self, n: usize) -> Pos {
        Pos(self.0 + n as u64)
    }

    /// Number of cells from `origin` forward to this position
    pub fn distance_from(self, origin: Pos) -> usize {
        self.0.saturating_sub(origin.0) as usize
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// What the reading buffer mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// A log of tty output
    Line,
    /// A copy of screen memory
    Screen,
}

/// Text snapshot, reading cursor, and bookmarks for one console
pub struct ReadingBuffer {
    mode: BufferMode,

    /// Line mode capacity in code points
    capacity: usize,

    cells: VecDeque<u32>,

    /// Display attribute per cell, screen mode only
    attribs: Vec<u8>,

    /// Logical position of `cells[0]`
    base: u64,

    /// Screen width, screen mode only
    cols: u16,

    cursor: Option<Pos>,

    /// Scratch cursor for navigation in progress
    temp: Option<Pos>,

    v_cursor: Option<Pos>,

    marks: [Option<Pos>; NUM_MARKS],

    postprocess: PostProcess,
    filter: LogFilter,

    /// Set on screen mode entry; the next snapshot puts the reading cursor
    /// on the visual cursor
    follow_visual: bool,
}

impl ReadingBuffer {
    /// Create an empty reading buffer
    pub fn new(mode: BufferMode, capacity: usize) -> Self {
        debug!("Creating {:?} mode reading buffer, capacity {}", mode, capacity);
        Self {
            mode,
            capacity: capacity.max(1),
            cells: VecDeque::new(),
            attribs: Vec::new(),
            base: 0,
            cols: 0,
            cursor: None,
            temp: None,
            v_cursor: None,
            marks: [None; NUM_MARKS],
            postprocess: PostProcess::default(),
            filter: LogFilter::new(),
            follow_visual: mode == BufferMode::Screen,
        }
    }

    /// A line mode buffer holding the last `capacity` code points of output
    pub fn line(capacity: usize) -> Self {
        Self::new(BufferMode::Line, capacity)
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// Switch between line and screen mode.
    ///
    /// A switch resets the buffer; marks and cursors do not carry over.
    pub fn set_mode(&mut self, mode: BufferMode) {
        if self.mode == mode {
            return;
        }
        debug!("Reading buffer mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.reset();
    }

    /// Clear the text and collapse the window. Every position becomes invalid.
    ///
    /// Called on console switch and mode toggle.
    pub fn reset(&mut self) {
        // Keep the counter moving so old positions never become valid again
        self.base += self.cells.len() as u64 + 1;
        self.cells.clear();
        self.attribs.clear();
        self.cols = 0;
        self.cursor = None;
        self.temp = None;
        self.v_cursor = None;
        self.marks = [None; NUM_MARKS];
        self.filter.reset();
        self.follow_visual = self.mode == BufferMode::Screen;
    }

    /// Clear the log. Line mode only; returns false in screen mode.
    pub fn clear(&mut self) -> bool {
        if self.mode != BufferMode::Line {
            return false;
        }
        self.reset();
        true
    }

    pub fn postprocess(&self) -> PostProcess {
        self.postprocess
    }

    pub fn set_postprocess(&mut self, pp: PostProcess) {
        self.postprocess = pp;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cells in the window
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false in screen mode once a snapshot has been loaded
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn start(&self) -> Pos {
        Pos(self.base)
    }

    pub fn end(&self) -> Pos {
        Pos(self.base + self.cells.len() as u64)
    }

    /// The last cell, if any
    pub fn last(&self) -> Option<Pos> {
        if self.is_empty() {
            None
        } else {
            Some(Pos(self.end().0 - 1))
        }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos >= self.start() && pos < self.end()
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        if self.contains(pos) {
            Some((pos.0 - self.base) as usize)
        } else {
            None
        }
    }

    /// Code point at `pos`
    pub fn get(&self, pos: Pos) -> Option<u32> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Display attribute at `pos`, screen mode only
    pub fn attrib(&self, pos: Pos) -> Option<u8> {
        self.index(pos).and_then(|i| self.attribs.get(i).copied())
    }

    /// Text in `[from, to)`, clipped to the window
    pub fn text(&self, from: Pos, to: Pos) -> String {
        let from = from.max(self.start());
        let to = to.min(self.end());
        let mut s = String::new();
        let mut p = from;
        while p < to {
            if let Some(ch) = self.get(p).and_then(char::from_u32) {
                s.push(ch);
            }
            p = p.offset(1);
        }
        s
    }

    /// Screen width, or 0 in line mode
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// The committed reading cursor
    pub fn cursor(&self) -> Option<Pos> {
        self.cursor
    }

    /// Move the reading cursor. A position outside the window leaves the
    /// cursor null and returns false.
    pub fn set_cursor(&mut self, pos: Option<Pos>) -> bool {
        self.cursor = pos.filter(|&p| self.contains(p));
        self.cursor.is_some() == pos.is_some()
    }

    /// The hardware cursor, screen mode only
    pub fn visual_cursor(&self) -> Option<Pos> {
        self.v_cursor
    }

    pub fn mark(&self, i: usize) -> Option<Pos> {
        self.marks.get(i).copied().flatten()
    }

    /// Set bookmark `i`. Returns false for a bad index or a position outside
    /// the window, in which case the mark is cleared.
    pub fn set_mark(&mut self, i: usize, pos: Option<Pos>) -> bool {
        let valid = pos.filter(|&p| self.contains(p));
        match self.marks.get_mut(i) {
            Some(slot) => {
                *slot = valid;
                valid.is_some() == pos.is_some()
            }
            None => false,
        }
    }

    /// Bring the buffer up to date.
    ///
    /// In line mode `output` is appended to the log, post-processed and
    /// evicting old text as needed. In screen mode `screen` replaces the
    /// snapshot. Every output event is handed back, in order, so the caller
    /// can notify the adapter once per event.
    pub fn refresh(&mut self, output: &[Output], screen: Option<&ScreenSnapshot>) -> Vec<Output> {
        match self.mode {
            BufferMode::Line => {
                for out in output {
                    self.append(out.ch);
                }
            }
            BufferMode::Screen => {
                if let Some(snap) = screen {
                    self.load_screen(snap);
                }
            }
        }
        output.to_vec()
    }

    /// Append one code point of tty output to the log (line mode)
    pub fn append(&mut self, ch: u32) {
        if self.mode != BufferMode::Line {
            return;
        }
        let mut edits = Vec::with_capacity(2);
        self.filter.feed(self.postprocess, ch, &mut edits);
        for edit in edits {
            match edit {
                Edit::Push(c) => self.push_cell(c),
                Edit::Erase => self.erase_last(),
            }
        }
    }

    fn push_cell(&mut self, ch: u32) {
        self.cells.push_back(ch);
        if self.cells.len() > self.capacity {
            let excess = self.cells.len() - self.capacity;
            self.cells.drain(..excess);
            self.base += excess as u64;
            trace!("Evicted {} cells, window now starts at {}", excess, self.base);
            self.invalidate();
        }
    }

    /// Backspace over the last cell, unless that would eat a newline
    fn erase_last(&mut self) {
        if matches!(self.cells.back(), Some(&c) if c != '\n' as u32) {
            self.cells.pop_back();
            self.invalidate();
        }
    }

    /// Null every reference that has left the window
    fn invalidate(&mut self) {
        let (start, end) = (self.start(), self.end());
        let keep = |p: Option<Pos>| p.filter(|&p| p >= start && p < end);
        self.cursor = keep(self.cursor);
        self.temp = keep(self.temp);
        self.v_cursor = keep(self.v_cursor);
        for mark in self.marks.iter_mut() {
            *mark = keep(*mark);
        }
    }

    fn load_screen(&mut self, snap: &ScreenSnapshot) {
        self.cells.clear();
        self.cells.extend(snap.cells.iter().copied());
        self.attribs.clear();
        self.attribs.extend(snap.attribs.iter().copied());
        self.attribs.resize(self.cells.len(), 7);
        self.cols = snap.cols;
        self.invalidate();

        let (x, y) = snap.cursor;
        let visual = self
            .start()
            .offset(y as usize * snap.cols as usize + x as usize);
        self.v_cursor = Some(visual).filter(|&p| self.contains(p));
        if self.follow_visual {
            self.cursor = self.v_cursor;
            self.follow_visual = false;
        }
    }

    /// Two-phase motion: copy the reading cursor into the scratch cursor
    pub fn set_cursor_to_temp(&mut self) {
        self.temp = self.cursor;
    }

    /// Commit the scratch cursor as the reading cursor
    pub fn sync_cursor_from_temp(&mut self) {
        self.cursor = self.temp;
    }

    /// The scratch cursor
    pub fn temp(&self) -> Option<Pos> {
        self.temp
    }

    /// Place the scratch cursor directly
    pub fn set_temp(&mut self, pos: Option<Pos>) -> bool {
        self.temp = pos.filter(|&p| self.contains(p));
        self.temp.is_some() == pos.is_some()
    }

    /// Put the scratch cursor on bookmark `i`
    pub fn jump_to_mark(&mut self, i: usize) -> bool {
        match self.mark(i) {
            Some(p) => {
                self.temp = Some(p);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EchoKind;

    pub(crate) fn line_buffer(text: &str) -> ReadingBuffer {
        let mut rb = ReadingBuffer::line(DEFAULT_CAPACITY);
        for c in text.chars() {
            rb.append(c as u32);
        }
        rb
    }

    #[test]
    fn test_empty_line_buffer() {
        let rb = ReadingBuffer::line(100);
        assert!(rb.is_empty());
        assert_eq!(rb.start(), rb.end());
        assert_eq!(rb.cursor(), None);
        assert_eq!(rb.last(), None);
    }

    #[test]
    fn test_append_and_text() {
        let rb = line_buffer("hello\r\nworld");
        assert_eq!(rb.text(rb.start(), rb.end()), "hello\nworld");
        assert_eq!(rb.get(rb.start()), Some('h' as u32));
    }

    #[test]
    fn test_eviction_nulls_references() {
        let mut rb = ReadingBuffer::line(10);
        for c in "abcdefghij".chars() {
            rb.append(c as u32);
        }
        let start = rb.start();
        rb.set_cursor(Some(start.offset(1)));
        rb.set_mark(0, Some(start.offset(2)));
        rb.set_mark(1, Some(start.offset(8)));

        // Three more characters evict "abc"
        for c in "klm".chars() {
            rb.append(c as u32);
        }
        assert_eq!(rb.len(), 10);
        assert_eq!(rb.cursor(), None);
        assert_eq!(rb.mark(0), None);

        // The surviving mark still points at the same text
        let survivor = rb.mark(1).unwrap();
        assert_eq!(rb.get(survivor), Some('i' as u32));
        assert_eq!(rb.text(rb.start(), rb.end()), "defghijklm");
    }

    #[test]
    fn test_backspace_invalidates_erased_cell() {
        let mut rb = line_buffer("abc");
        let last = rb.last().unwrap();
        rb.set_cursor(Some(last));
        rb.append(0x08);
        assert_eq!(rb.cursor(), None);
        assert_eq!(rb.text(rb.start(), rb.end()), "ab");
    }

    #[test]
    fn test_set_cursor_outside_window() {
        let mut rb = line_buffer("abc");
        assert!(!rb.set_cursor(Some(rb.end())));
        assert_eq!(rb.cursor(), None);
        assert!(rb.set_cursor(Some(rb.start())));
        assert!(!rb.set_mark(NUM_MARKS, Some(rb.start())));
    }

    #[test]
    fn test_idempotent_resync() {
        let mut rb = line_buffer("some text");
        let p = rb.start().offset(3);
        rb.set_cursor(Some(p));
        rb.set_cursor_to_temp();
        rb.sync_cursor_from_temp();
        assert_eq!(rb.cursor(), Some(p));
    }

    #[test]
    fn test_reset_invalidates_old_positions() {
        let mut rb = line_buffer("abc");
        let old = rb.start();
        rb.reset();
        assert!(rb.is_empty());
        for c in "xyz".chars() {
            rb.append(c as u32);
        }
        assert!(!rb.contains(old));
    }

    #[test]
    fn test_screen_mode_follows_visual_cursor() {
        let mut rb = ReadingBuffer::line(100);
        rb.set_mode(BufferMode::Screen);
        let mut snap = ScreenSnapshot::blank(4, 2);
        snap.cells[5] = 'x' as u32;
        snap.cursor = (1, 1);
        let out = [Output::new(EchoKind::Output, 'x' as u32)];
        let notices = rb.refresh(&out, Some(&snap));
        assert_eq!(notices.len(), 1);
        assert_eq!(rb.len(), 8);
        assert_eq!(rb.cols(), 4);
        let v = rb.visual_cursor().unwrap();
        assert_eq!(rb.get(v), Some('x' as u32));
        assert_eq!(rb.cursor(), Some(v));
        assert_eq!(rb.attrib(v), Some(7));

        // Later snapshots leave the reading cursor alone
        rb.set_cursor(Some(rb.start()));
        snap.cursor = (3, 1);
        rb.refresh(&[], Some(&snap));
        assert_eq!(rb.cursor(), Some(rb.start()));
        assert!(!rb.clear());
    }

    #[test]
    fn test_screen_shrink_invalidates() {
        let mut rb = ReadingBuffer::new(BufferMode::Screen, 0);
        rb.refresh(&[], Some(&ScreenSnapshot::blank(10, 10)));
        let far = rb.start().offset(95);
        rb.set_mark(3, Some(far));
        rb.refresh(&[], Some(&ScreenSnapshot::blank(5, 5)));
        assert_eq!(rb.mark(3), None);
    }
}
