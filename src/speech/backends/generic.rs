//! Generic synthesizer: text in, speech out, nothing back
//!
//! Anything that speaks a line when it sees a carriage return. There are no
//! index markers and no status bytes, so the bridge cannot tell when the unit
//! stops talking; marked text is sent as plain text.

use crate::speech::{Setting, SynthCodec, SynthEvent, SynthStyle};

pub struct GenericCodec;

impl SynthCodec for GenericCodec {
    fn style(&self) -> SynthStyle {
        SynthStyle::Generic
    }

    fn terminator(&self) -> &'static [u8] {
        b"\r"
    }

    fn marker(&self, _id: u8) -> Option<Vec<u8>> {
        None
    }

    fn encode_interrupt(&self) -> Vec<u8> {
        vec![0x18]
    }

    fn encode_setting(&self, _setting: Setting, _level: u8) -> Option<Vec<u8>> {
        None
    }

    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent> {
        bytes.iter().map(|&b| SynthEvent::Opaque(b)).collect()
    }
}
