//! Braille 'n Speak
//!
//! Commands start with control E. Marker n is sent as `^E n J`, and the unit
//! answers with the single byte n+1, so replies 1 through 100 are markers.

use super::digits;
use crate::speech::{Setting, SynthCodec, SynthEvent, SynthStyle};

const CMD: u8 = 0x05;

pub struct BnsCodec;

impl BnsCodec {
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

impl SynthCodec for BnsCodec {
    fn style(&self) -> SynthStyle {
        SynthStyle::BrailleNSpeak
    }

    fn terminator(&self) -> &'static [u8] {
        b"\r"
    }

    fn marker(&self, id: u8) -> Option<Vec<u8>> {
        Some(Self::command(id as u32, b'J'))
    }

    fn encode_interrupt(&self) -> Vec<u8> {
        vec![0x18]
    }

    fn encode_setting(&self, setting: Setting, level: u8) -> Option<Vec<u8>> {
        let level = level as u32;
        match setting {
            Setting::Volume => Some(Self::command(level, b'V')),
            Setting::Speed => Some(Self::command(level, b'E')),
            Setting::Pitch => Some(Self::command(level, b'P')),
            Setting::Voice => None,
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        bytes
            .iter()
            .map(|&b| match b {
                1..=100 => SynthEvent::Marker(b - 1),
                _ => SynthEvent::Opaque(b),
            })
            .collect()
    }
}
