//! DECtalk, external (Express) and internal (PC card)
//!
//! Commands are bracketed phonemic sequences such as `[:ra 200]`, and text is
//! spoken on control K followed by carriage return. Control C stops speech.
//!
//! The external unit answers an index marker `[:i m n]` with a device control
//! string, `ESC P 0;32;n z ESC \`. Those are parsed with vte, which keeps its
//! state between reads and discards any other control string up to its
//! terminator.
//!
//! The internal card reports in binary: `0x01 n` for marker n, `0x02` when it
//! finishes talking and `0x03` when it starts.

use super::digits;
use crate::speech::{Setting, SynthCodec, SynthEvent, SynthStyle, MAX_MARKER};
use log::{trace, warn};
use vte::{Params, Parser, Perform};

const VOICES: &[u8] = b"phfdbuwrk";

/// Collects replies from an external unit
struct Replies<'a> {
    events: &'a mut Vec<SynthEvent>,
}

impl<'a> Perform for Replies<'a> {
    fn print(&mut self, c: char) {
        if let Ok(b) = u8::try_from(c as u32) {
            self.events.push(SynthEvent::Opaque(b));
        }
    }

    fn execute(&mut self, byte: u8) {
        self.events.push(SynthEvent::Opaque(byte));
    }

    fn hook(&mut self, params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        let p: Vec<u16> = params
            .iter()
            .map(|sub| sub.first().copied().unwrap_or(0))
            .collect();
        match (action, p.as_slice()) {
            ('z', &[0, 32, n]) if n <= MAX_MARKER as u16 => {
                trace!("DECtalk index {}", n);
                self.events.push(SynthEvent::Marker(n as u8));
            }
            _ => warn!("Discarding DECtalk reply {:?} {}", p, action),
        }
    }
}

/// Where the internal card's byte stream is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    Ground,
    MarkerId,
}

pub struct DectalkCodec {
    internal: bool,
    parser: Parser,
    card: CardState,
}

impl DectalkCodec {
    pub fn expanded() -> Self {
        Self {
            internal: false,
            parser: Parser::new(),
            card: CardState::Ground,
        }
    }

    pub fn internal() -> Self {
        Self {
            internal: true,
            ..Self::expanded()
        }
    }

    fn bracket(body: &str, n: u32) -> Vec<u8> {
        let mut out = format!("[:{} ", body).into_bytes();
        out.extend(digits(n));
        out.push(b']');
        out
    }

    fn decode_card(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        let mut events = Vec::with_capacity(bytes.len());
        for &b in bytes {
            match (self.card, b) {
                (CardState::MarkerId, id) => {
                    self.card = CardState::Ground;
                    if id <= MAX_MARKER {
                        events.push(SynthEvent::Marker(id));
                    } else {
                        warn!("DECtalk card sent marker {}, out of range", id);
                    }
                }
                (CardState::Ground, 0x01) => self.card = CardState::MarkerId,
                (CardState::Ground, 0x02) => events.push(SynthEvent::TalkingStatus { talking: false }),
                (CardState::Ground, 0x03) => events.push(SynthEvent::TalkingStatus { talking: true }),
                (CardState::Ground, other) => events.push(SynthEvent::Opaque(other)),
            }
        }
        events
    }
}

impl SynthCodec for DectalkCodec {
    fn style(&self) -> SynthStyle {
        if self.internal {
            SynthStyle::DectalkInternal
        } else {
            SynthStyle::DectalkExpanded
        }
    }

    fn terminator(&self) -> &'static [u8] {
        b"\x0b\r"
    }

    fn marker(&self, id: u8) -> Option<Vec<u8>> {
        Some(Self::bracket("i m", id as u32))
    }

    fn encode_interrupt(&self) -> Vec<u8> {
        vec![0x03]
    }

    fn encode_setting(&self, setting: Setting, level: u8) -> Option<Vec<u8>> {
        let level = level as u32;
        match setting {
            Setting::Volume => Some(Self::bracket("vo set", 40 + level * 6)),
            Setting::Speed => Some(Self::bracket("ra", 120 + level * 40)),
            Setting::Pitch => Some(Self::bracket("dv ap", 70 + level * 16)),
            Setting::Voice => {
                let v = *VOICES.get(level as usize)?;
                Some(vec![b'[', b':', b'n', v, b']'])
            }
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        if self.internal {
            return self.decode_card(bytes);
        }
        let mut events = Vec::new();
        let mut replies = Replies {
            events: &mut events,
        };
        for &b in bytes {
            self.parser.advance(&mut replies, b);
        }
        events
    }

    fn reset(&mut self) {
        self.parser = Parser::new();
        self.card = CardState::Ground;
    }

    fn voices(&self) -> u8 {
        VOICES.len() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_syntax() {
        let codec = DectalkCodec::expanded();
        let enc = codec.encode_with_markers(b"go", &[0, 0], 12).unwrap();
        assert_eq!(enc.bytes, b"[:i m 12]go\x0b\r".to_vec());
    }

    #[test]
    fn test_index_reply() {
        let mut codec = DectalkCodec::expanded();
        assert_eq!(codec.decode(b"\x1bP0;32;7z\x1b\\"), vec![SynthEvent::Marker(7)]);
    }

    #[test]
    fn test_index_reply_split_across_reads() {
        let mut codec = DectalkCodec::expanded();
        assert!(codec.decode(b"\x1bP0;3").is_empty());
        assert_eq!(codec.decode(b"2;42z\x1b\\"), vec![SynthEvent::Marker(42)]);
    }

    #[test]
    fn test_unknown_reply_discarded() {
        let mut codec = DectalkCodec::expanded();
        let events = codec.decode(b"\x1bP0;31;9zjunk\x1b\\\x1bP0;32;3z\x1b\\");
        assert_eq!(events, vec![SynthEvent::Marker(3)]);
    }

    #[test]
    fn test_card_protocol() {
        let mut codec = DectalkCodec::internal();
        assert_eq!(codec.style(), SynthStyle::DectalkInternal);
        assert_eq!(codec.decode(&[0x03, 0x01]), vec![SynthEvent::TalkingStatus { talking: true }]);
        assert_eq!(
            codec.decode(&[4, 0x02]),
            vec![SynthEvent::Marker(4), SynthEvent::TalkingStatus { talking: false }]
        );
    }

    #[test]
    fn test_settings() {
        let codec = DectalkCodec::expanded();
        assert_eq!(codec.encode_setting(Setting::Speed, 2), Some(b"[:ra 200]".to_vec()));
        assert_eq!(codec.encode_setting(Setting::Voice, 1), Some(b"[:nh]".to_vec()));
        assert_eq!(codec.encode_setting(Setting::Voice, 9), None);
        assert_eq!(codec.encode_interrupt(), vec![0x03]);
    }
}
