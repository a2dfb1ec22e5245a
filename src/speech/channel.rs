//! The open connection to a synthesizer
//!
//! A link plus the codec for its protocol, the broken flag, and the current
//! volume, pitch, speed and voice.

use super::link::SynthLink;
use super::synth::{Encoded, Setting, SynthCodec, SynthEvent, SynthStyle};
use crate::dict::Dictionaries;
use crate::symbols;
use crate::{AcsError, Result};
use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::RawFd;

/// Highest volume, pitch, or speed level
pub const MAX_LEVEL: u8 = 9;

/// What happened to a settings request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOutcome {
    /// The unit was told; this is the new level
    Changed(u8),
    /// The level would leave 0 through 9, or the voice does not exist
    OutOfRange,
    /// The unit has no such control
    Unsupported,
}

/// Levels to put a freshly opened unit into a known state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartValues {
    pub volume: u8,
    pub pitch: u8,
    pub speed: u8,
    pub voice: u8,
}

impl Default for StartValues {
    fn default() -> Self {
        Self {
            volume: 7,
            pitch: 4,
            speed: 6,
            voice: 0,
        }
    }
}

pub struct SynthChannel {
    link: Box<dyn SynthLink>,
    codec: Box<dyn SynthCodec>,
    broken: bool,
    volume: u8,
    pitch: u8,
    speed: u8,
    voice: u8,
}

impl SynthChannel {
    pub fn new(link: Box<dyn SynthLink>, codec: Box<dyn SynthCodec>) -> Self {
        let start = StartValues::default();
        Self {
            link,
            codec,
            broken: false,
            volume: start.volume,
            pitch: start.pitch,
            speed: start.speed,
            voice: start.voice,
        }
    }

    pub fn style(&self) -> SynthStyle {
        self.codec.style()
    }

    /// Once set, nothing more is written until the channel is reopened
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn input_fd(&self) -> Option<RawFd> {
        self.link.input_fd()
    }

    /// Replace the link, clearing the broken flag and any partial frame
    pub fn reopen(&mut self, link: Box<dyn SynthLink>) {
        debug!("Reopening synthesizer as {}", link.describe());
        self.link = link;
        self.broken = false;
        self.codec.reset();
    }

    pub fn set_flow_control(&mut self, hardware: bool) -> Result<()> {
        self.link.set_flow_control(hardware)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if self.broken {
            return Err(AcsError::ChannelBroken);
        }
        trace!("To synthesizer: {:?}", String::from_utf8_lossy(bytes));
        if let Err(e) = self.link.write_all(bytes) {
            warn!("Write to {} failed: {}", self.link.describe(), e);
            self.broken = true;
            return Err(AcsError::ChannelBroken);
        }
        Ok(())
    }

    /// Speak ISO 8859-1 text right away
    pub fn say_string(&mut self, text: &[u8]) -> Result<()> {
        let bytes = self.codec.encode(text);
        self.send(&bytes)
    }

    /// Speak one character, by name if it has a pronunciation
    pub fn say_char(&mut self, c: u32, dict: &dyn Dictionaries) -> Result<()> {
        match dict.lookup_punctuation(c) {
            Some(name) => {
                let text: Vec<u8> = name.chars().map(|ch| symbols::downshift(ch as u32)).collect();
                self.say_string(&text)
            }
            None => self.say_string(&[symbols::downshift(c)]),
        }
    }

    /// Speak text with an index marker on each token
    pub fn say_with_markers(&mut self, text: &[u8], offsets: &[usize], first_mark: u8) -> Result<Encoded> {
        let encoded = self.codec.encode_with_markers(text, offsets, first_mark)?;
        self.send(&encoded.bytes)?;
        Ok(encoded)
    }

    /// Stop speech
    pub fn interrupt(&mut self) -> Result<()> {
        let bytes = self.codec.encode_interrupt();
        self.send(&bytes)
    }

    /// Drain and decode everything the unit has sent
    pub fn read_events(&mut self) -> Result<Vec<SynthEvent>> {
        let mut buf = [0u8; 256];
        let mut bytes = Vec::new();
        loop {
            match self.link.read(&mut buf) {
                Ok(0) => {
                    warn!("{} closed", self.link.describe());
                    self.broken = true;
                    break;
                }
                Ok(n) => bytes.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Read from {} failed: {}", self.link.describe(), e);
                    self.broken = true;
                    return Err(AcsError::Io(e));
                }
            }
        }
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        trace!("From synthesizer: {:?}", bytes);
        Ok(self.codec.decode(&bytes))
    }

    pub fn level(&self, setting: Setting) -> u8 {
        match setting {
            Setting::Volume => self.volume,
            Setting::Pitch => self.pitch,
            Setting::Speed => self.speed,
            Setting::Voice => self.voice,
        }
    }

    fn max_level(&self, setting: Setting) -> u8 {
        match setting {
            Setting::Voice => self.codec.voices().saturating_sub(1),
            _ => MAX_LEVEL,
        }
    }

    /// Set a voice parameter to an absolute level
    pub fn set(&mut self, setting: Setting, level: i32) -> Result<SettingOutcome> {
        if level < 0 || level > self.max_level(setting) as i32 {
            return Ok(SettingOutcome::OutOfRange);
        }
        let level = level as u8;
        let Some(bytes) = self.codec.encode_setting(setting, level) else {
            return Ok(SettingOutcome::Unsupported);
        };
        self.send(&bytes)?;
        match setting {
            Setting::Volume => self.volume = level,
            Setting::Pitch => self.pitch = level,
            Setting::Speed => self.speed = level,
            Setting::Voice => self.voice = level,
        }
        debug!("{:?} is now {}", setting, level);
        Ok(SettingOutcome::Changed(level))
    }

    /// Move a voice parameter up or down one level
    pub fn adjust(&mut self, setting: Setting, up: bool) -> Result<SettingOutcome> {
        let current = self.level(setting) as i32;
        self.set(setting, if up { current + 1 } else { current - 1 })
    }

    /// Put a freshly opened unit into a known state.
    /// Controls the unit lacks are skipped.
    pub fn start_values(&mut self, start: &StartValues) -> Result<()> {
        for (setting, level) in [
            (Setting::Volume, start.volume),
            (Setting::Pitch, start.pitch),
            (Setting::Speed, start.speed),
            (Setting::Voice, start.voice),
        ] {
            if let SettingOutcome::OutOfRange = self.set(setting, level as i32)? {
                warn!("Start value {} for {:?} is out of range", level, setting);
            }
        }
        Ok(())
    }
}
