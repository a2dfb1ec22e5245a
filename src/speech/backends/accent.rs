//! Accent
//!
//! Commands are escape sequences. Marker n goes out as `ESC I nn` with two
//! digits, and comes back as the three bytes `I nn`. A reply may be split
//! across reads. Bytes outside a reply are noise from the unit and dropped.

use crate::speech::{Setting, SynthCodec, SynthEvent, SynthStyle};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Idle,
    Letter,
    Tens(u8),
}

pub struct AccentCodec {
    frame: Frame,
}

impl AccentCodec {
    pub fn new() -> Self {
        Self { frame: Frame::Idle }
    }
}

impl SynthCodec for AccentCodec {
    fn style(&self) -> SynthStyle {
        SynthStyle::Accent
    }

    fn terminator(&self) -> &'static [u8] {
        b"\r"
    }

    fn marker(&self, id: u8) -> Option<Vec<u8>> {
        Some(format!("\x1bI{:02}", id).into_bytes())
    }

    fn encode_interrupt(&self) -> Vec<u8> {
        vec![0x18]
    }

    fn encode_setting(&self, setting: Setting, level: u8) -> Option<Vec<u8>> {
        match setting {
            Setting::Volume => Some(format!("\x1bA{}", level).into_bytes()),
            Setting::Speed => Some(vec![0x1b, b'R', b'A' + level * 2]),
            Setting::Pitch => Some(format!("\x1bP{}", level).into_bytes()),
            Setting::Voice => None,
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        let mut events = Vec::new();
        for &b in bytes {
            self.frame = match (self.frame, b) {
                (Frame::Letter, d) if d.is_ascii_digit() => Frame::Tens(d - b'0'),
                (Frame::Tens(t), d) if d.is_ascii_digit() => {
                    events.push(SynthEvent::Marker(t * 10 + (d - b'0')));
                    Frame::Idle
                }
                (_, b'I') => Frame::Letter,
                (_, other) => {
                    trace!("Accent noise byte {:#04x}", other);
                    Frame::Idle
                }
            };
        }
        events
    }

    fn reset(&mut self) {
        self.frame = Frame::Idle;
    }
}
