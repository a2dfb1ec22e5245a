//! DoubleTalk family: DoubleTalk, Double Light, TripleTalk
//!
//! Commands start with control A. An index marker is `^A n I` in the text,
//! and the unit sends the marker number back as a single binary byte when it
//! gets there. Bytes 0 through 99 are therefore markers; anything else is
//! passed along untouched.

use super::digits;
use crate::speech::{Setting, SynthCodec, SynthEvent, SynthStyle, MAX_MARKER};

const CMD: u8 = 0x01;

pub struct DoubleTalkCodec;

impl DoubleTalkCodec {
    pub fn new() -> Self {
        Self
    }

    fn command(n: u32, letter: u8) -> Vec<u8> {
        let mut out = vec![CMD];
        out.extend(digits(n));
        out.push(letter);
        out
    }
}

impl SynthCodec for DoubleTalkCodec {
    fn style(&self) -> SynthStyle {
        SynthStyle::DoubleTalk
    }

    fn terminator(&self) -> &'static [u8] {
        b"\r"
    }

    fn marker(&self, id: u8) -> Option<Vec<u8>> {
        Some(Self::command(id as u32, b'I'))
    }

    fn encode_interrupt(&self) -> Vec<u8> {
        vec![0x18]
    }

    fn encode_setting(&self, setting: Setting, level: u8) -> Option<Vec<u8>> {
        let level = level as u32;
        Some(match setting {
            Setting::Volume => Self::command(level, b'V'),
            Setting::Speed => Self::command(level, b'S'),
            // Pitch runs 0 to 99 on the unit
            Setting::Pitch => Self::command(20 + level * 8, b'P'),
            Setting::Voice => Self::command(level, b'O'),
        })
    }

    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        bytes
            .iter()
            .map(|&b| {
                if b <= MAX_MARKER {
                    SynthEvent::Marker(b)
                } else {
                    SynthEvent::Opaque(b)
                }
            })
            .collect()
    }

    fn voices(&self) -> u8 {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_syntax() {
        let codec = DoubleTalkCodec::new();
        let enc = codec.encode_with_markers(b"hi you", &[0, 0, 0, 3, 0, 0], 7).unwrap();
        assert_eq!(enc.bytes, b"\x017Ihi \x018Iyou\r".to_vec());
        assert_eq!(enc.markers, vec![(7, 0), (8, 3)]);
    }

    #[test]
    fn test_decode_binary_markers() {
        let mut codec = DoubleTalkCodec::new();
        assert_eq!(
            codec.decode(&[5, 99, 100, b'x']),
            vec![
                SynthEvent::Marker(5),
                SynthEvent::Marker(99),
                SynthEvent::Opaque(100),
                SynthEvent::Opaque(b'x'),
            ]
        );
    }

    #[test]
    fn test_settings() {
        let codec = DoubleTalkCodec::new();
        assert_eq!(codec.encode_setting(Setting::Volume, 7), Some(b"\x017V".to_vec()));
        assert_eq!(codec.encode_setting(Setting::Pitch, 0), Some(b"\x0120P".to_vec()));
        assert_eq!(codec.encode_interrupt(), vec![0x18]);
    }
}
