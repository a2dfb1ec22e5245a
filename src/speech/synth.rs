//! Synthesizer protocol abstraction
//!
//! Every hardware or software synthesizer the bridge talks to speaks one of a
//! handful of wire protocols, or styles. A style fixes the byte that stops
//! speech, how index markers are embedded in outgoing text and reported back,
//! and how the unit signals that it is done talking. The style is not the
//! model: several units share one protocol.

use crate::{AcsError, Result};
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

/// Highest index marker any style can carry
pub const MAX_MARKER: u8 = 99;

/// Something the synthesizer told us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    /// The unit reached the index marker with this id
    Marker(u8),
    /// The unit started or finished talking
    TalkingStatus { talking: bool },
    /// A byte that means nothing to the protocol
    Opaque(u8),
}

/// Voice parameters the bridge can adjust
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Volume,
    Pitch,
    Speed,
    Voice,
}

/// Outgoing bytes, and which buffer offset each marker id stands for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    /// `(marker id, buffer offset)` in ascending buffer order
    pub markers: Vec<(u8, usize)>,
}

/// The protocol families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthStyle {
    /// No index markers and no status bytes
    #[default]
    Generic,
    /// DoubleTalk, Double Light, TripleTalk
    DoubleTalk,
    /// DECtalk Express and other external DECtalk units
    DectalkExpanded,
    /// DECtalk PC card
    DectalkInternal,
    /// Braille 'n Speak
    BrailleNSpeak,
    /// Accent
    Accent,
}

impl FromStr for SynthStyle {
    type Err = AcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "gen" => Ok(SynthStyle::Generic),
            "doubletalk" | "double-talk" | "dbl" => Ok(SynthStyle::DoubleTalk),
            "dectalk" | "dectalk-expanded" | "decexp" | "dte" => Ok(SynthStyle::DectalkExpanded),
            "dectalk-internal" | "decpc" | "dtp" => Ok(SynthStyle::DectalkInternal),
            "braille-n-speak" | "bns" => Ok(SynthStyle::BrailleNSpeak),
            "accent" | "ace" => Ok(SynthStyle::Accent),
            other => Err(AcsError::Config(format!("unknown synthesizer style '{}'", other))),
        }
    }
}

impl fmt::Display for SynthStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SynthStyle::Generic => "generic",
            SynthStyle::DoubleTalk => "doubletalk",
            SynthStyle::DectalkExpanded => "dectalk-expanded",
            SynthStyle::DectalkInternal => "dectalk-internal",
            SynthStyle::BrailleNSpeak => "braille-n-speak",
            SynthStyle::Accent => "accent",
        };
        f.write_str(name)
    }
}

/// One synthesizer protocol
///
/// Outgoing text is ISO 8859-1. Decoding is streaming: a marker split across
/// two reads is recognized once the rest of it arrives.
pub trait SynthCodec: Send {
    fn style(&self) -> SynthStyle;

    /// Bytes that tell the unit to start speaking what it has
    fn terminator(&self) -> &'static [u8];

    /// How marker `id` is embedded in text, or `None` if the style has no markers
    fn marker(&self, id: u8) -> Option<Vec<u8>>;

    /// Bytes that stop speech immediately
    fn encode_interrupt(&self) -> Vec<u8>;

    /// Command for a voice setting, or `None` if the unit has no such control.
    /// Levels run 0 through 9; voice is a voice number.
    fn encode_setting(&self, setting: Setting, level: u8) -> Option<Vec<u8>>;

    /// Parse bytes from the unit
    fn decode(&mut self, bytes: &[u8]) -> Vec<SynthEvent>;

    /// Forget any partial frame
    fn reset(&mut self) {}

    /// Number of voices the unit offers
    fn voices(&self) -> u8 {
        1
    }

    /// Text followed by the terminator.
    /// Control bytes would be taken as commands, so they become spaces.
    fn encode(&self, text: &[u8]) -> Vec<u8> {
        let mut out = sanitize(text);
        out.extend_from_slice(self.terminator());
        out
    }

    /// Text with a marker in front of each token.
    ///
    /// Index 0 and every nonzero entry of `offsets` start a token. Markers
    /// are numbered from `first_mark` in that order. Styles without markers
    /// get plain text and an empty marker list.
    fn encode_with_markers(&self, text: &[u8], offsets: &[usize], first_mark: u8) -> Result<Encoded> {
        if self.marker(first_mark).is_none() {
            return Ok(Encoded {
                bytes: self.encode(text),
                markers: Vec::new(),
            });
        }

        let mut bytes = Vec::with_capacity(text.len() * 2);
        let mut markers = Vec::new();
        let mut id = first_mark as usize;
        for (i, &b) in text.iter().enumerate() {
            let offset = offsets.get(i).copied().unwrap_or(0);
            if i == 0 || offset != 0 {
                if id > MAX_MARKER as usize {
                    return Err(AcsError::MarkerRange(id));
                }
                let tag = self.marker(id as u8).unwrap_or_default();
                bytes.extend_from_slice(&tag);
                markers.push((id as u8, offset));
                id += 1;
            }
            bytes.push(clean_byte(b));
        }
        bytes.extend_from_slice(self.terminator());
        debug!(
            "Encoded {} bytes with markers {}..{}",
            text.len(),
            first_mark,
            id.saturating_sub(1)
        );
        Ok(Encoded { bytes, markers })
    }
}

fn clean_byte(b: u8) -> u8 {
    if b < 0x20 || b == 0x7f {
        b' '
    } else {
        b
    }
}

fn sanitize(text: &[u8]) -> Vec<u8> {
    text.iter().map(|&b| clean_byte(b)).collect()
}

/// Build the codec for a style
pub fn create_codec(style: SynthStyle) -> Box<dyn SynthCodec> {
    use super::backends::{accent, bns, dectalk, doubletalk, generic};

    info!("Using {} synthesizer protocol", style);
    match style {
        SynthStyle::Generic => Box::new(generic::GenericCodec),
        SynthStyle::DoubleTalk => Box::new(doubletalk::DoubleTalkCodec::new()),
        SynthStyle::DectalkExpanded => Box::new(dectalk::DectalkCodec::expanded()),
        SynthStyle::DectalkInternal => Box::new(dectalk::DectalkCodec::internal()),
        SynthStyle::BrailleNSpeak => Box::new(bns::BnsCodec::new()),
        SynthStyle::Accent => Box::new(accent::AccentCodec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_names() {
        assert_eq!("dectalk".parse::<SynthStyle>().unwrap(), SynthStyle::DectalkExpanded);
        assert_eq!("BNS".parse::<SynthStyle>().unwrap(), SynthStyle::BrailleNSpeak);
        assert!("votrax".parse::<SynthStyle>().is_err());
        for style in [
            SynthStyle::Generic,
            SynthStyle::DoubleTalk,
            SynthStyle::DectalkExpanded,
            SynthStyle::DectalkInternal,
            SynthStyle::BrailleNSpeak,
            SynthStyle::Accent,
        ] {
            assert_eq!(style.to_string().parse::<SynthStyle>().unwrap(), style);
            assert_eq!(create_codec(style).style(), style);
        }
    }

    #[test]
    fn test_marker_assignment() {
        let codec = create_codec(SynthStyle::DoubleTalk);
        let text = b"hello world again";
        let mut offsets = vec![0usize; text.len()];
        offsets[6] = 6;
        offsets[12] = 12;
        let enc = codec.encode_with_markers(text, &offsets, 5).unwrap();
        assert_eq!(enc.markers, vec![(5, 0), (6, 6), (7, 12)]);
    }

    #[test]
    fn test_marker_overflow_rejected() {
        let codec = create_codec(SynthStyle::DoubleTalk);
        let text = b"a b c";
        let offsets = vec![0, 0, 2, 0, 4];
        assert!(matches!(
            codec.encode_with_markers(text, &offsets, 98),
            Err(AcsError::MarkerRange(100))
        ));
        assert!(codec.encode_with_markers(text, &offsets, 97).is_ok());
    }

    #[test]
    fn test_control_bytes_cleaned() {
        let codec = create_codec(SynthStyle::Generic);
        assert_eq!(codec.encode(b"a\x18b\n"), b"a b \r".to_vec());
    }
}
