//! Key codes and the decoder that turns terminal input into keystrokes
//!
//! Printable keys use their base character as the code: `A` is `a` with
//! SHIFT. Keys that have no character use the constants below, which sit in
//! the private use area so they never collide with a typed character.

use crate::event::{shift, Keystroke};
use log::trace;

pub const UP: u16 = 0xe000;
pub const DOWN: u16 = 0xe001;
pub const LEFT: u16 = 0xe002;
pub const RIGHT: u16 = 0xe003;
pub const HOME: u16 = 0xe004;
pub const END: u16 = 0xe005;
pub const PAGE_UP: u16 = 0xe006;
pub const PAGE_DOWN: u16 = 0xe007;
pub const INSERT: u16 = 0xe008;
pub const DELETE: u16 = 0xe009;
pub const ENTER: u16 = 0xe00a;
pub const TAB: u16 = 0xe00b;
pub const BACKSPACE: u16 = 0xe00c;
pub const ESCAPE: u16 = 0xe00d;
/// F1; F2 through F12 follow
pub const F1: u16 = 0xe010;
const NAMED_END: u16 = 0xe100;

/// Names for the named keys, as used in the `[keys]` config section
pub const KEY_NAMES: &[(&str, u16)] = &[
    ("up", UP),
    ("down", DOWN),
    ("left", LEFT),
    ("right", RIGHT),
    ("home", HOME),
    ("end", END),
    ("pageup", PAGE_UP),
    ("pagedown", PAGE_DOWN),
    ("insert", INSERT),
    ("delete", DELETE),
    ("enter", ENTER),
    ("tab", TAB),
    ("backspace", BACKSPACE),
    ("escape", ESCAPE),
    ("space", b' ' as u16),
];

/// One key read from the terminal, with the bytes that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    /// `None` for sequences we don't recognize; those go to the program as is
    pub key: Option<Keystroke>,
    pub bytes: Vec<u8>,
}

/// xterm modifier parameter: 1 + (shift | alt << 1 | ctrl << 2)
fn modifier_bits(param: u16) -> u8 {
    let m = param.saturating_sub(1);
    let mut bits = 0;
    if m & 1 != 0 {
        bits |= shift::SHIFT;
    }
    if m & 2 != 0 {
        bits |= shift::LALT;
    }
    if m & 4 != 0 {
        bits |= shift::CTRL;
    }
    bits
}

fn tilde_key(n: u16) -> Option<u16> {
    Some(match n {
        1 | 7 => HOME,
        2 => INSERT,
        3 => DELETE,
        4 | 8 => END,
        5 => PAGE_UP,
        6 => PAGE_DOWN,
        11..=15 => F1 + (n - 11),
        17..=21 => F1 + 5 + (n - 17),
        23 | 24 => F1 + 10 + (n - 23),
        _ => return None,
    })
}

fn final_key(b: u8) -> Option<u16> {
    Some(match b {
        b'A' => UP,
        b'B' => DOWN,
        b'C' => RIGHT,
        b'D' => LEFT,
        b'H' => HOME,
        b'F' => END,
        b'P'..=b'S' => F1 + (b - b'P') as u16,
        _ => return None,
    })
}

/// A single byte as a key
fn byte_key(b: u8) -> Option<Keystroke> {
    let key = match b {
        b'\r' | b'\n' => Keystroke::new(ENTER, 0),
        b'\t' => Keystroke::new(TAB, 0),
        0x08 | 0x7f => Keystroke::new(BACKSPACE, 0),
        0x1b => Keystroke::new(ESCAPE, 0),
        0x00 => Keystroke::new(b' ' as u16, shift::CTRL),
        0x01..=0x1a => Keystroke::new((b'a' + b - 1) as u16, shift::CTRL),
        0x1c..=0x1f => Keystroke::new((b'\\' + b - 0x1c) as u16, shift::CTRL),
        b'A'..=b'Z' => Keystroke::new(b.to_ascii_lowercase() as u16, shift::SHIFT),
        0x20..=0x7e => Keystroke::new(b as u16, 0),
        _ => return None,
    };
    Some(key)
}

/// Length of the UTF-8 sequence that starts with `b`
fn utf8_len(b: u8) -> usize {
    match b {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

/// Decode the CSI or SS3 sequence at the start of `input` (after ESC).
/// Returns the key and the number of bytes it used.
fn decode_sequence(input: &[u8]) -> (Option<Keystroke>, usize) {
    // input[0] is '[' or 'O'
    let mut params: Vec<u16> = vec![0];
    let mut i = 1;
    while i < input.len() {
        let b = input[i];
        match b {
            b'0'..=b'9' => {
                if let Some(last) = params.last_mut() {
                    *last = last.saturating_mul(10).saturating_add((b - b'0') as u16);
                }
            }
            b';' => params.push(0),
            b':' | 0x3c..=0x3f => {}
            0x40..=0x7e => {
                let mods = params.get(1).map_or(0, |&m| modifier_bits(m));
                let code = if b == b'~' {
                    tilde_key(params[0])
                } else {
                    final_key(b)
                };
                return (code.map(|c| Keystroke::new(c, mods)), i + 1);
            }
            _ => return (None, i + 1),
        }
        i += 1;
    }
    (None, input.len())
}

/// Split raw terminal input into keys
pub fn decode_keys(input: &[u8]) -> Vec<DecodedKey> {
    let mut keys = Vec::new();
    let mut i = 0;
    while i < input.len() {
        let rest = &input[i..];
        let (key, used) = match rest {
            [0x1b] => (Some(Keystroke::new(ESCAPE, 0)), 1),
            [0x1b, b'[' | b'O', ..] if rest.len() > 2 => {
                let (key, used) = decode_sequence(&rest[1..]);
                (key, used + 1)
            }
            [0x1b, b, ..] => {
                let len = utf8_len(*b).min(rest.len() - 1);
                let inner = decode_char(&rest[1..1 + len]);
                (
                    inner.map(|mut k| {
                        k.shift |= shift::LALT;
                        k
                    }),
                    1 + len,
                )
            }
            [b, ..] => {
                let len = utf8_len(*b).min(rest.len());
                (decode_char(&rest[..len]), len)
            }
            [] => break,
        };
        trace!("Key {:?} from {:?}", key, &rest[..used]);
        keys.push(DecodedKey {
            key,
            bytes: rest[..used].to_vec(),
        });
        i += used;
    }
    keys
}

fn decode_char(bytes: &[u8]) -> Option<Keystroke> {
    match bytes {
        [b] => byte_key(*b),
        _ => {
            let c = std::str::from_utf8(bytes).ok()?.chars().next()?;
            let code = u16::try_from(c as u32).ok()?;
            if c.is_uppercase() {
                let lower = c.to_lowercase().next().unwrap_or(c);
                let lower = u16::try_from(lower as u32).ok()?;
                Some(Keystroke::new(lower, shift::SHIFT))
            } else {
                Some(Keystroke::new(code, 0))
            }
        }
    }
}

/// The character a key types, if it types one
pub fn typed_char(key: &Keystroke) -> Option<char> {
    if key.shift & (shift::CTRL | shift::ALT) != 0 || (UP..NAMED_END).contains(&key.code) {
        return None;
    }
    let c = char::from_u32(key.code as u32)?;
    if key.shift & shift::SHIFT != 0 {
        c.to_uppercase().next()
    } else {
        Some(c)
    }
}

/// Parse a chord such as `alt+u`, `ctrl+shift+f5`, or `alt+,`
pub fn parse_chord(text: &str) -> Option<(u16, u8)> {
    let text = text.trim().to_lowercase();
    let mut mods = 0u8;
    let mut rest = text.as_str();
    loop {
        let (prefix, bits) = if let Some(r) = rest.strip_prefix("ctrl+") {
            (r, shift::CTRL)
        } else if let Some(r) = rest.strip_prefix("alt+") {
            (r, shift::LALT)
        } else if let Some(r) = rest.strip_prefix("shift+") {
            (r, shift::SHIFT)
        } else {
            break;
        };
        mods |= bits;
        rest = prefix;
    }

    if let Some(&(_, code)) = KEY_NAMES.iter().find(|(name, _)| *name == rest) {
        return Some((code, mods));
    }
    if let Some(n) = rest.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        if (1..=12).contains(&n) {
            return Some((F1 + n - 1, mods));
        }
    }
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some((u16::try_from(c as u32).ok()?, mods)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(input: &[u8]) -> Vec<Option<(u16, u8)>> {
        decode_keys(input)
            .into_iter()
            .map(|d| d.key.map(|k| (k.code, k.shift)))
            .collect()
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(
            codes(b"aB\r\x7f"),
            vec![
                Some((b'a' as u16, 0)),
                Some((b'b' as u16, shift::SHIFT)),
                Some((ENTER, 0)),
                Some((BACKSPACE, 0)),
            ]
        );
    }

    #[test]
    fn test_alt_and_ctrl() {
        assert_eq!(
            codes(b"\x1bu\x03\x1bU"),
            vec![
                Some((b'u' as u16, shift::LALT)),
                Some((b'c' as u16, shift::CTRL)),
                Some((b'u' as u16, shift::LALT | shift::SHIFT)),
            ]
        );
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(
            codes(b"\x1b[A\x1bOD\x1b[3~\x1b[1;5C\x1b[15~"),
            vec![
                Some((UP, 0)),
                Some((LEFT, 0)),
                Some((DELETE, 0)),
                Some((RIGHT, shift::CTRL)),
                Some((F1 + 4, 0)),
            ]
        );
    }

    #[test]
    fn test_unknown_sequence_passes_through() {
        let keys = decode_keys(b"\x1b[200~x");
        assert_eq!(keys[0].key, None);
        assert_eq!(keys[0].bytes, b"\x1b[200~".to_vec());
        assert_eq!(keys[1].key, Some(Keystroke::new(b'x' as u16, 0)));
    }

    #[test]
    fn test_utf8_and_lone_escape() {
        assert_eq!(
            codes("é\x1b".as_bytes()),
            vec![Some((0xe9, 0)), Some((ESCAPE, 0))]
        );
    }

    #[test]
    fn test_typed_char() {
        assert_eq!(typed_char(&Keystroke::new(b'q' as u16, shift::SHIFT)), Some('Q'));
        assert_eq!(typed_char(&Keystroke::new(b'q' as u16, shift::LALT)), None);
        assert_eq!(typed_char(&Keystroke::new(UP, 0)), None);
    }

    #[test]
    fn test_parse_chord() {
        assert_eq!(parse_chord("alt+u"), Some((b'u' as u16, shift::LALT)));
        assert_eq!(parse_chord("Ctrl+Shift+F5"), Some((F1 + 4, shift::CTRL | shift::SHIFT)));
        assert_eq!(parse_chord("alt+,"), Some((b',' as u16, shift::LALT)));
        assert_eq!(parse_chord("alt+pagedown"), Some((PAGE_DOWN, shift::LALT)));
        assert_eq!(parse_chord("alt+nope"), None);
    }
}
