//! Rewrite an extracted chunk the way it should be spoken
//!
//! Repeat runs become "dash length 20", and words go through the
//! replacement dictionary. Every token keeps its buffer offset on the first
//! byte of whatever it turned into, so index markers still line up.

use super::SentenceChunk;
use crate::dict::Dictionaries;
use crate::symbols;

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn is_word_byte(b: u8) -> bool {
    (b as char).is_alphanumeric()
}

/// Spoken form of one token, or `None` to keep it as is
fn spoken(chunk: &SentenceChunk, index: usize, token: &[u8], dict: &dyn Dictionaries) -> Option<String> {
    if let Some(run) = chunk.repeat_at(index) {
        let name = match dict.lookup_punctuation(run.ch) {
            Some(name) => name.to_string(),
            None => (symbols::downshift(run.ch) as char).to_string(),
        };
        return Some(format!("{} length {}", name, run.len));
    }
    if token.first().copied().is_some_and(is_word_byte) {
        return dict.lookup_smart_replacement(&latin1(token));
    }
    None
}

/// Produce the spoken form of `chunk`
pub fn pronounce(chunk: &SentenceChunk, dict: &dyn Dictionaries) -> SentenceChunk {
    let starts: Vec<(usize, usize)> = chunk.token_starts().collect();
    let mut out = SentenceChunk {
        consumed: chunk.consumed,
        ..SentenceChunk::default()
    };

    for (n, &(index, offset)) in starts.iter().enumerate() {
        let next = starts.get(n + 1).map_or(chunk.text.len(), |&(i, _)| i);
        let raw = &chunk.text[index..next];
        let token_len = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        let token = &raw[..token_len];
        let spaced_after = token_len < raw.len();

        let rewritten = spoken(chunk, index, token, dict);
        let bytes: Vec<u8> = match &rewritten {
            Some(s) => s.chars().map(|c| symbols::downshift(c as u32)).collect(),
            None => token.to_vec(),
        };

        // A rewritten repeat run needs room on both sides
        let is_repeat = chunk.repeat_at(index).is_some();
        let last = out.text.last().copied();
        if is_repeat && last.is_some_and(|b| b != b' ' && b != b'\n') {
            out.text.push(b' ');
            out.offsets.push(0);
        }

        for (i, &b) in bytes.iter().enumerate() {
            out.text.push(b);
            out.offsets.push(if i == 0 { offset } else { 0 });
        }
        if (spaced_after || is_repeat) && n + 1 < starts.len() {
            out.text.push(b' ');
            out.offsets.push(0);
        }
    }
    out
}
