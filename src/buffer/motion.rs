//! Cursor motion on the scratch cursor
//!
//! Every motion works on the temp cursor. If there is no next line, or the
//! search string is not in the buffer, the caller simply does not sync and
//! the reading cursor is right where it was. All motions return false on an
//! empty buffer or a null temp cursor.

use super::{BufferMode, Pos, ReadingBuffer};
use crate::symbols::{self, NEWLINE, REPEAT_MIN};

/// What kind of token starts at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Letters and digits, with at most one interior apostrophe
    Word,
    /// Five or more identical punctuation marks, with the run length
    Repeat(usize),
    /// Any other single code point: punctuation, space, newline, control
    Single,
}

impl ReadingBuffer {
    /// Classify the token starting at `pos` and find where it ends (exclusive).
    /// Tokens never run past `limit`.
    pub fn token_at(&self, pos: Pos, limit: Pos) -> Option<(TokenKind, Pos)> {
        let c = self.get(pos)?;
        let limit = limit.min(self.end());
        let at = |p: Pos| if p < limit { self.get(p) } else { None };

        if symbols::is_word_char(c) {
            let mut p = pos.offset(1);
            let mut apostrophe = false;
            loop {
                match at(p) {
                    Some(c) if symbols::is_word_char(c) => p = p.offset(1),
                    Some(c)
                        if symbols::is_apostrophe(c)
                            && !apostrophe
                            && at(p.offset(1)).is_some_and(symbols::is_word_char) =>
                    {
                        apostrophe = true;
                        p = p.offset(2);
                    }
                    _ => break,
                }
            }
            return Some((TokenKind::Word, p));
        }

        if symbols::is_punct(c) {
            let mut n = 1;
            while at(pos.offset(n)) == Some(c) {
                n += 1;
            }
            if n >= REPEAT_MIN {
                return Some((TokenKind::Repeat(n), pos.offset(n)));
            }
        }

        Some((TokenKind::Single, pos.offset(1)))
    }

    /// Start of the line containing `pos`
    fn line_start_of(&self, pos: Pos) -> Pos {
        if self.mode == BufferMode::Screen && self.cols > 0 {
            let col = pos.distance_from(self.start()) % self.cols as usize;
            return Pos(pos.0 - col as u64);
        }
        let mut p = pos;
        while p > self.start() && self.get(Pos(p.0 - 1)) != Some(NEWLINE) {
            p = Pos(p.0 - 1);
        }
        p
    }

    /// The cell that ends the line containing `pos`: the newline itself in
    /// line mode, the last column in screen mode, or the last cell.
    fn line_end_of(&self, pos: Pos) -> Pos {
        let last = self.last().unwrap_or(pos);
        if self.mode == BufferMode::Screen && self.cols > 0 {
            return self.line_start_of(pos).offset(self.cols as usize - 1).min(last);
        }
        let mut p = pos;
        while p < last && self.get(p) != Some(NEWLINE) {
            p = p.offset(1);
        }
        p
    }

    /// Token bounds `[start, end)` around `pos`, scanning from the line start
    fn token_around(&self, pos: Pos) -> Option<(Pos, Pos)> {
        let line_end = self.line_end_of(pos).offset(1);
        let mut p = self.line_start_of(pos);
        while p <= pos {
            let (_, end) = self.token_at(p, line_end)?;
            if pos < end {
                return Some((p, end));
            }
            p = end;
        }
        None
    }

    /// Code point under the scratch cursor
    pub fn getc(&self) -> Option<u32> {
        self.temp.and_then(|p| self.get(p))
    }

    /// Code point under the scratch cursor, downshifted to ISO 8859-1
    pub fn getc_down(&self) -> Option<u8> {
        self.getc().map(symbols::downshift)
    }

    /// Column of the scratch cursor within its line
    pub fn column(&self) -> Option<usize> {
        let p = self.temp?;
        Some(p.distance_from(self.line_start_of(p)))
    }

    /// One past the last cell of the screen row holding `pos`. Line mode
    /// has no rows; its lines end at a newline.
    pub fn row_end(&self, pos: Pos) -> Option<Pos> {
        (self.mode == BufferMode::Screen && self.cols > 0).then(|| self.line_end_of(pos).offset(1))
    }

    /// Advance the scratch cursor. False at the end of the buffer.
    pub fn advance(&mut self) -> bool {
        match self.temp {
            Some(p) if self.contains(p.offset(1)) => {
                self.temp = Some(p.offset(1));
                true
            }
            _ => false,
        }
    }

    /// Back up the scratch cursor. False at the start of the buffer.
    pub fn retreat(&mut self) -> bool {
        match self.temp {
            Some(p) if p > self.start() => {
                self.temp = Some(Pos(p.0 - 1));
                true
            }
            _ => false,
        }
    }

    pub fn line_start(&mut self) -> bool {
        match self.temp {
            Some(p) => {
                self.temp = Some(self.line_start_of(p));
                true
            }
            None => false,
        }
    }

    /// Move to the last character of the line, before its newline
    pub fn line_end(&mut self) -> bool {
        let Some(p) = self.temp else {
            return false;
        };
        let mut end = self.line_end_of(p);
        if self.get(end) == Some(NEWLINE) && end > self.line_start_of(p) {
            end = Pos(end.0 - 1);
        }
        self.temp = Some(end);
        true
    }

    pub fn word_start(&mut self) -> bool {
        match self.temp.and_then(|p| self.token_around(p)) {
            Some((start, _)) => {
                self.temp = Some(start);
                true
            }
            None => false,
        }
    }

    pub fn word_end(&mut self) -> bool {
        match self.temp.and_then(|p| self.token_around(p)) {
            Some((_, end)) => {
                self.temp = Some(Pos(end.0 - 1));
                true
            }
            None => false,
        }
    }

    pub fn buffer_start(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.temp = Some(self.start());
        true
    }

    pub fn buffer_end(&mut self) -> bool {
        match self.last() {
            Some(p) => {
                self.temp = Some(p);
                true
            }
            None => false,
        }
    }

    /// Skip left past spaces
    pub fn skip_spaces_left(&mut self) -> bool {
        let Some(mut p) = self.temp else {
            return false;
        };
        while p > self.start() && self.get(p).is_some_and(symbols::is_space) {
            p = Pos(p.0 - 1);
        }
        self.temp = Some(p);
        true
    }

    /// Skip right past spaces
    pub fn skip_spaces_right(&mut self) -> bool {
        let (Some(mut p), Some(last)) = (self.temp, self.last()) else {
            return false;
        };
        while p < last && self.get(p).is_some_and(symbols::is_space) {
            p = p.offset(1);
        }
        self.temp = Some(p);
        true
    }

    /// Start of the next line
    pub fn next_line(&mut self) -> bool {
        let Some(p) = self.temp else {
            return false;
        };
        let next = self.line_end_of(p).offset(1);
        if !self.contains(next) {
            return false;
        }
        self.temp = Some(next);
        true
    }

    /// Start of the previous line
    pub fn prev_line(&mut self) -> bool {
        let Some(p) = self.temp else {
            return false;
        };
        let start = self.line_start_of(p);
        if start <= self.start() {
            return false;
        }
        self.temp = Some(self.line_start_of(Pos(start.0 - 1)));
        true
    }

    /// Start of the next word, skipping spaces
    pub fn next_word(&mut self) -> bool {
        let Some(p) = self.temp else {
            return false;
        };
        let Some((_, end)) = self.token_around(p) else {
            return false;
        };
        let last = match self.last() {
            Some(last) => last,
            None => return false,
        };
        let mut q = end;
        while q <= last && self.get(q).is_some_and(symbols::is_space) {
            q = q.offset(1);
        }
        if q > last {
            return false;
        }
        self.temp = Some(q);
        true
    }

    /// Start of the previous word, skipping spaces
    pub fn prev_word(&mut self) -> bool {
        let Some(p) = self.temp else {
            return false;
        };
        let Some((start, _)) = self.token_around(p) else {
            return false;
        };
        if start <= self.start() {
            return false;
        }
        let mut q = Pos(start.0 - 1);
        while q > self.start() && self.get(q).is_some_and(symbols::is_space) {
            q = Pos(q.0 - 1);
        }
        if self.get(q).is_some_and(symbols::is_space) {
            return false;
        }
        self.temp = Some(q);
        self.word_start()
    }

    fn matches_at(&self, pos: Pos, needle: &[u32]) -> bool {
        needle.iter().enumerate().all(|(i, &n)| {
            self.get(pos.offset(i))
                .is_some_and(|c| symbols::fold(c) == n)
        })
    }

    /// Case insensitive search for `text`.
    ///
    /// Forward searches begin just after the scratch cursor, backward ones
    /// just before it. With `from_adjacent_line` the search begins on the
    /// next (or previous) line instead. On success the scratch cursor lands
    /// on the start of the match.
    pub fn search(&mut self, text: &str, backward: bool, from_adjacent_line: bool) -> bool {
        let needle: Vec<u32> = text.chars().map(|c| symbols::fold(c as u32)).collect();
        let (Some(p), false) = (self.temp, needle.is_empty()) else {
            return false;
        };
        if needle.len() > self.len() {
            return false;
        }
        let last_start = Pos(self.end().0 - needle.len() as u64);

        if backward {
            let from = if from_adjacent_line {
                let start = self.line_start_of(p);
                if start <= self.start() {
                    return false;
                }
                Pos(start.0 - 1)
            } else if p > self.start() {
                Pos(p.0 - 1)
            } else {
                return false;
            };
            let mut q = from.min(last_start);
            loop {
                if self.matches_at(q, &needle) {
                    self.temp = Some(q);
                    return true;
                }
                if q <= self.start() {
                    return false;
                }
                q = Pos(q.0 - 1);
            }
        }

        let mut q = if from_adjacent_line {
            self.line_end_of(p).offset(1)
        } else {
            p.offset(1)
        };
        while q <= last_start {
            if self.matches_at(q, &needle) {
                self.temp = Some(q);
                return true;
            }
            q = q.offset(1);
        }
        false
    }
}
