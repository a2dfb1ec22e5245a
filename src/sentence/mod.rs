//! Sentence extraction
//!
//! Pulls a bounded, speakable chunk of text out of the reading buffer,
//! starting at the reading cursor. Text is downshifted to 8 bit bytes,
//! punctuation runs are collapsed, white space is folded, and each token in
//! the output remembers how far into the buffer it started. Those distances
//! are what let index markers coming back from the synthesizer move the
//! reading cursor along with the voice.

pub mod pronounce;

pub use pronounce::pronounce;

use crate::buffer::{Pos, ReadingBuffer, TokenKind};
use crate::dict::Dictionaries;
use crate::symbols::{self, NEWLINE};
use crate::{AcsError, Result};
use log::trace;

/// How much text to take, and how to treat newlines and punctuation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GsFlags {
    /// Take exactly one word
    pub one_word: bool,
    /// Stop at the end of the line
    pub stop_line: bool,
    /// Collapse runs of identical punctuation
    pub repeat: bool,
    /// Treat newline as a space
    pub nl_space: bool,
}

impl GsFlags {
    pub fn word() -> Self {
        Self {
            one_word: true,
            repeat: true,
            ..Self::default()
        }
    }

    pub fn line() -> Self {
        Self {
            stop_line: true,
            repeat: true,
            ..Self::default()
        }
    }

    pub fn continuous() -> Self {
        Self {
            repeat: true,
            nl_space: true,
            ..Self::default()
        }
    }

    /// One word does not combine with the newline options
    pub fn validate(&self) -> Result<()> {
        if self.one_word && (self.stop_line || self.nl_space) {
            return Err(AcsError::Other(
                "one word extraction cannot stop at or fold newlines".to_string(),
            ));
        }
        Ok(())
    }
}

/// A collapsed punctuation run inside a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatRun {
    /// Index of the single output byte standing in for the run
    pub index: usize,
    /// The repeated code point
    pub ch: u32,
    /// Number of times it appeared
    pub len: usize,
}

/// Output of one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceChunk {
    /// Normalized ISO 8859-1 text
    pub text: Vec<u8>,
    /// Parallel to `text`. Index 0 and every nonzero entry start a token, and
    /// hold the distance from the extraction start to where that token began.
    pub offsets: Vec<usize>,
    /// Buffer cells used up; the next extraction starts at `cursor + consumed`
    pub consumed: usize,
    pub repeats: Vec<RepeatRun>,
}

impl SentenceChunk {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// `(index, offset)` of each token start, in order
    pub fn token_starts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.offsets
            .iter()
            .enumerate()
            .filter(|&(i, &off)| i == 0 || off != 0)
            .map(|(i, &off)| (i, off))
    }

    pub fn token_count(&self) -> usize {
        self.token_starts().count()
    }

    /// The repeat run standing at output index `i`, if any
    pub fn repeat_at(&self, i: usize) -> Option<&RepeatRun> {
        self.repeats.iter().find(|r| r.index == i)
    }

    /// Keep only the first `max` tokens. `consumed` moves back to where the
    /// first dropped token started, so nothing is skipped.
    pub fn truncate_tokens(&mut self, max: usize) {
        let Some((cut, offset)) = self.token_starts().nth(max) else {
            return;
        };
        let mut cut = cut;
        // The space separating the kept tokens from the dropped one goes too
        while cut > 0 && self.text[cut - 1] == b' ' {
            cut -= 1;
        }
        trace!("Truncating chunk to {} tokens at byte {}", max, cut);
        self.text.truncate(cut);
        self.offsets.truncate(cut);
        self.repeats.retain(|r| r.index < cut);
        self.consumed = offset;
    }

    /// The text as a string, each byte taken as Latin-1
    pub fn to_string_lossy(&self) -> String {
        self.text.iter().map(|&b| b as char).collect()
    }
}

/// Bytes for one token, and whether it needs space around it
struct Rendered {
    bytes: Vec<u8>,
    spaced: bool,
    repeat: Option<(u32, usize)>,
}

fn render(
    buf: &ReadingBuffer,
    pos: Pos,
    kind: TokenKind,
    end: Pos,
    flags: GsFlags,
    dict: &dyn Dictionaries,
) -> (Rendered, Pos) {
    let c = buf.get(pos).unwrap_or(' ' as u32);
    match kind {
        TokenKind::Word => {
            let bytes = (0..end.distance_from(pos))
                .filter_map(|i| buf.get(pos.offset(i)))
                .map(symbols::downshift)
                .collect();
            (
                Rendered {
                    bytes,
                    spaced: false,
                    repeat: None,
                },
                end,
            )
        }
        TokenKind::Repeat(n) if flags.repeat => (
            Rendered {
                bytes: vec![symbols::downshift(c)],
                spaced: false,
                repeat: Some((c, n)),
            },
            end,
        ),
        _ => {
            // A lone symbol. High code points with a name are spoken by name.
            if symbols::downshift_exact(c).is_none() {
                if let Some(name) = dict.lookup_punctuation(c) {
                    return (
                        Rendered {
                            bytes: name.chars().map(|ch| symbols::downshift(ch as u32)).collect(),
                            spaced: true,
                            repeat: None,
                        },
                        pos.offset(1),
                    );
                }
            }
            (
                Rendered {
                    bytes: vec![symbols::downshift(c)],
                    spaced: false,
                    repeat: None,
                },
                pos.offset(1),
            )
        }
    }
}

/// Accumulates output while tracking white space folding
struct Writer {
    chunk: SentenceChunk,
    max: usize,
    pending_space: bool,
}

impl Writer {
    fn space_needed(&self) -> bool {
        self.pending_space && !self.chunk.text.is_empty() && self.chunk.text.last() != Some(&b'\n')
    }

    fn room(&self) -> usize {
        self.max - self.chunk.text.len()
    }

    /// Append a token, with its separating space if any. False if it does not fit.
    fn push(&mut self, bytes: &[u8], offset: usize, repeat: Option<(u32, usize)>) -> bool {
        let space = self.space_needed();
        if bytes.len() + space as usize > self.room() {
            return false;
        }
        if space {
            self.chunk.text.push(b' ');
            self.chunk.offsets.push(0);
        }
        let index = self.chunk.text.len();
        if let Some((ch, len)) = repeat {
            self.chunk.repeats.push(RepeatRun { index, ch, len });
        }
        for (i, &b) in bytes.iter().enumerate() {
            self.chunk.text.push(b);
            self.chunk.offsets.push(if i == 0 { offset } else { 0 });
        }
        self.pending_space = false;
        true
    }
}

/// Extract text starting at the reading cursor.
///
/// At most `capacity - 1` bytes are produced, leaving room for a terminator
/// on the wire. A null cursor or an empty buffer gives an empty chunk.
pub fn extract(
    buf: &ReadingBuffer,
    capacity: usize,
    flags: GsFlags,
    dict: &dyn Dictionaries,
) -> SentenceChunk {
    let max = capacity.saturating_sub(1);
    let Some(start) = buf.cursor() else {
        return SentenceChunk::default();
    };
    if max == 0 {
        return SentenceChunk::default();
    }

    let mut end = buf.end();
    if flags.stop_line {
        // Screen rows hold no newline, so the row edge ends the line
        if let Some(row_end) = buf.row_end(start) {
            end = end.min(row_end);
        }
    }
    let mut w = Writer {
        chunk: SentenceChunk::default(),
        max,
        pending_space: false,
    };
    let mut p = start;

    if flags.one_word {
        while p < end && buf.get(p).is_some_and(symbols::is_space) {
            p = p.offset(1);
        }
        if let Some((kind, tok_end)) = buf.token_at(p, end) {
            let (r, tok_end) = render(buf, p, kind, tok_end, flags, dict);
            let take = r.bytes.len().min(max);
            w.push(&r.bytes[..take], p.distance_from(start), r.repeat);
            // A word too long for the chunk is split; the rest comes next time
            p = if kind == TokenKind::Word && take < r.bytes.len() {
                p.offset(take)
            } else {
                tok_end
            };
            // Trailing space on the same line goes with the word
            if r.bytes != b"\n" {
                while p < end && buf.get(p).is_some_and(symbols::is_space) {
                    p = p.offset(1);
                }
            }
        }
        w.chunk.consumed = p.distance_from(start);
        return w.chunk;
    }

    while p < end {
        let Some(c) = buf.get(p) else {
            break;
        };

        if c == NEWLINE && !flags.nl_space {
            if flags.stop_line {
                p = p.offset(1);
                break;
            }
            w.pending_space = false;
            if !w.push(b"\n", p.distance_from(start), None) {
                break;
            }
            p = p.offset(1);
            continue;
        }
        if c == NEWLINE || symbols::is_space(c) {
            w.pending_space = true;
            p = p.offset(1);
            continue;
        }

        let Some((kind, tok_end)) = buf.token_at(p, end) else {
            break;
        };
        let (r, tok_end) = render(buf, p, kind, tok_end, flags, dict);
        if r.spaced {
            w.pending_space = true;
        }
        let offset = p.distance_from(start);
        if w.push(&r.bytes, offset, r.repeat) {
            p = tok_end;
            if r.spaced {
                w.pending_space = true;
            }
            continue;
        }
        if w.chunk.text.is_empty() {
            // Nothing fits before this token: split it
            let take = r.bytes.len().min(max);
            w.push(&r.bytes[..take], offset, r.repeat);
            p = if kind == TokenKind::Word {
                p.offset(take)
            } else {
                tok_end
            };
        }
        break;
    }

    w.chunk.consumed = p.distance_from(start);
    trace!(
        "Extracted {} bytes, {} tokens, consumed {}",
        w.chunk.text.len(),
        w.chunk.token_count(),
        w.chunk.consumed
    );
    w.chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferMode, DEFAULT_CAPACITY};
    use crate::dict::PronunciationTable;
    use crate::event::ScreenSnapshot;

    fn line_buffer(text: &str) -> ReadingBuffer {
        let mut rb = ReadingBuffer::line(DEFAULT_CAPACITY);
        for c in text.chars() {
            rb.append(c as u32);
        }
        rb.set_cursor(Some(rb.start()));
        rb
    }

    fn dict() -> PronunciationTable {
        PronunciationTable::english()
    }

    fn text(chunk: &SentenceChunk) -> String {
        chunk.to_string_lossy()
    }

    #[test]
    fn test_whitespace_folding() {
        let buf = line_buffer("  hello   big\tworld  ");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "hello big world");
        assert_eq!(chunk.offsets.len(), chunk.text.len());
        assert_eq!(chunk.consumed, 21);
        let starts: Vec<_> = chunk.token_starts().collect();
        assert_eq!(starts, vec![(0, 2), (6, 10), (10, 14)]);
    }

    #[test]
    fn test_empty_buffer() {
        let buf = line_buffer("");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert!(chunk.is_empty());
        assert_eq!(chunk.consumed, 0);
    }

    #[test]
    fn test_trailing_whitespace_consumed() {
        let buf = line_buffer("    ");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert!(chunk.is_empty());
        assert_eq!(chunk.consumed, 4);
    }

    #[test]
    fn test_screen_line_stops_at_row_end() {
        let mut snap = ScreenSnapshot::blank(10, 3);
        for (row, word) in ["ab", "cd", "ef"].iter().enumerate() {
            for (col, c) in word.chars().enumerate() {
                snap.cells[row * 10 + col] = c as u32;
            }
        }
        let mut buf = ReadingBuffer::new(BufferMode::Screen, 0);
        buf.refresh(&[], Some(&snap));
        buf.set_cursor(Some(buf.start()));

        let flags = GsFlags {
            stop_line: true,
            repeat: true,
            ..GsFlags::default()
        };
        let chunk = extract(&buf, 100, flags, &dict());
        assert_eq!(text(&chunk), "ab");
        assert_eq!(chunk.consumed, 10);

        buf.set_cursor(Some(buf.start().offset(13)));
        let chunk = extract(&buf, 100, flags, &dict());
        assert!(chunk.is_empty());
        assert_eq!(chunk.consumed, 7);

        // Continuous reading still runs on across rows
        buf.set_cursor(Some(buf.start()));
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "ab cd ef");
    }

    #[test]
    fn test_stop_at_newline() {
        let buf = line_buffer("one two\nthree");
        let chunk = extract(&buf, 100, GsFlags::line(), &dict());
        assert_eq!(text(&chunk), "one two");
        assert_eq!(chunk.consumed, 8);
    }

    #[test]
    fn test_newline_kept() {
        let buf = line_buffer("one \n two");
        let chunk = extract(&buf, 100, GsFlags::default(), &dict());
        assert_eq!(text(&chunk), "one\ntwo");
    }

    #[test]
    fn test_newline_as_space() {
        let buf = line_buffer("one\ntwo");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "one two");
        assert_eq!(chunk.token_starts().last(), Some((4, 4)));
    }

    #[test]
    fn test_boundedness() {
        let buf = line_buffer("the quick brown fox jumps over the lazy dog");
        for cap in 0..50 {
            let chunk = extract(&buf, cap, GsFlags::continuous(), &dict());
            assert!(chunk.text.len() < cap.max(1), "capacity {}", cap);
            assert_eq!(chunk.offsets.len(), chunk.text.len());
        }
    }

    #[test]
    fn test_word_left_for_next_call() {
        let buf = line_buffer("alpha beta");
        let chunk = extract(&buf, 9, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "alpha");
        assert_eq!(chunk.consumed, 6);
    }

    #[test]
    fn test_long_first_word_split() {
        let buf = line_buffer("supercalifragilistic");
        let chunk = extract(&buf, 6, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "super");
        assert_eq!(chunk.consumed, 5);
    }

    #[test]
    fn test_repeat_compression() {
        let content = format!("ok {}done", "-".repeat(20));
        let buf = line_buffer(&content);
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "ok -done");
        let starts: Vec<_> = chunk.token_starts().collect();
        assert_eq!(starts, vec![(0, 0), (3, 3), (4, 23)]);
        assert_eq!(
            chunk.repeats,
            vec![RepeatRun {
                index: 3,
                ch: '-' as u32,
                len: 20
            }]
        );
    }

    #[test]
    fn test_repeat_without_compression() {
        let buf = line_buffer("a=====b");
        let flags = GsFlags {
            nl_space: true,
            ..GsFlags::default()
        };
        let chunk = extract(&buf, 100, flags, &dict());
        assert_eq!(text(&chunk), "a=====b");
        assert!(chunk.repeats.is_empty());
    }

    #[test]
    fn test_one_word_dollars() {
        let mut buf = line_buffer("price: $$$$$$$$ today");
        buf.set_cursor(Some(buf.start().offset(7)));
        let chunk = extract(&buf, 100, GsFlags::word(), &dict());
        assert_eq!(text(&chunk), "$");
        assert_eq!(chunk.repeats.len(), 1);
        assert_eq!(chunk.repeats[0].len, 8);
        assert_eq!(chunk.consumed, 9);

        let next = buf.cursor().unwrap().offset(chunk.consumed);
        buf.set_cursor(Some(next));
        let chunk = extract(&buf, 100, GsFlags::word(), &dict());
        assert_eq!(text(&chunk), "today");
    }

    #[test]
    fn test_one_word_skips_leading_space() {
        let buf = line_buffer("   can't stop");
        let chunk = extract(&buf, 100, GsFlags::word(), &dict());
        assert_eq!(text(&chunk), "can't");
        assert_eq!(chunk.offsets[0], 3);
        assert_eq!(chunk.consumed, 9);
    }

    #[test]
    fn test_downshift() {
        let buf = line_buffer("caf\u{e9} \u{201c}hi\u{201d} 5\u{20ac} \u{4e2d}");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(chunk.text[3], 0xe9);
        assert_eq!(text(&chunk), "caf\u{e9} \"hi\" 5 euro ?");
    }

    #[test]
    fn test_non_latin_words_best_effort() {
        // Cyrillic letters are still letters, so this is one word of '?'
        let buf = line_buffer("\u{43c}\u{438}\u{440} ok");
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert_eq!(text(&chunk), "??? ok");
        assert_eq!(chunk.token_count(), 2);
    }

    #[test]
    fn test_null_cursor() {
        let mut buf = line_buffer("text");
        buf.set_cursor(None);
        let chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        assert!(chunk.is_empty());
        assert_eq!(chunk.consumed, 0);
    }

    #[test]
    fn test_truncate_tokens() {
        let buf = line_buffer("a b c d");
        let mut chunk = extract(&buf, 100, GsFlags::continuous(), &dict());
        chunk.truncate_tokens(2);
        assert_eq!(text(&chunk), "a b");
        assert_eq!(chunk.consumed, 4);
        chunk.truncate_tokens(5);
        assert_eq!(text(&chunk), "a b");
    }

    #[test]
    fn test_flags_validate() {
        assert!(GsFlags::word().validate().is_ok());
        let bad = GsFlags {
            one_word: true,
            stop_line: true,
            ..GsFlags::default()
        };
        assert!(bad.validate().is_err());
    }
}
