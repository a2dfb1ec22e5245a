//! Configuration management

use crate::buffer::postprocess::PostProcess;
use crate::buffer::{BufferMode, DEFAULT_CAPACITY};
use crate::dict::PronunciationTable;
use crate::sentence::GsFlags;
use crate::speech::{LinkConfig, StartValues, SynthStyle, MAX_MARKER};
use crate::{AcsError, Result};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Default FIFO for messages from other processes
pub const DEFAULT_FIFO: &str = "/tmp/acsbridge.fifo";

/// What continuous reading does at a newline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineMode {
    /// Stop, one line per utterance
    Stop,
    /// Read through, as if it were a space
    Space,
    /// Keep the newline in the text
    Keep,
}

/// Bridge configuration, backed by ~/.acsbridge.cfg
pub struct Config {
    ini: Ini,
    path: PathBuf,
}

impl Config {
    /// Load configuration from ~/.acsbridge.cfg, creating it if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, creating it with defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(path)
                .map_err(|e| AcsError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(path)
                .map_err(|e| AcsError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self {
            ini,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| AcsError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".acsbridge.cfg")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("synth"))
            .set("style", "generic")
            .set("link", "pipe")
            .set("device", "/dev/ttyS0")
            .set("baud", "9600")
            .set("flow_control", "hardware")
            .set("address", "127.0.0.1:6560")
            .set("command", "espeakup")
            .set("first_mark", "0")
            .set("volume", "7")
            .set("pitch", "4")
            .set("speed", "6")
            .set("voice", "0");

        ini.with_section(Some("reading"))
            .set("mode", "line")
            .set("capacity", DEFAULT_CAPACITY.to_string())
            .set("sentence_len", "240")
            .set("word_len", "60")
            .set("repeat", "true")
            .set("newline", "space")
            .set("postprocess", "all")
            .set("key_echo", "true")
            .set("auto_read", "false");

        ini.with_section(Some("fifo")).set("path", DEFAULT_FIFO);
        ini.with_section(Some("symbols"));
        ini.with_section(Some("words"));
        ini.with_section(Some("keys"));

        ini
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .trim()
            .to_string()
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Key/value pairs of a section, in file order
    pub fn section(&self, name: &str) -> Vec<(String, String)> {
        self.ini
            .section(Some(name))
            .map(|s| s.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default()
    }

    fn level(&self, key: &str, default: u8) -> u8 {
        let v = self.get_int("synth", key, default as i64);
        u8::try_from(v).unwrap_or_else(|_| {
            warn!("[synth] {} = {} is out of range, using {}", key, v, default);
            default
        })
    }

    // [synth]

    pub fn synth_style(&self) -> Result<SynthStyle> {
        self.get_string("synth", "style", "generic").parse()
    }

    pub fn link(&self) -> Result<LinkConfig> {
        match self.get_string("synth", "link", "pipe").as_str() {
            "serial" => Ok(LinkConfig::Serial {
                device: self.get_string("synth", "device", "/dev/ttyS0"),
                baud: self.get_int("synth", "baud", 9600).clamp(0, u32::MAX as i64) as u32,
                hardware_flow: self.get_string("synth", "flow_control", "hardware") != "none",
            }),
            "socket" => Ok(LinkConfig::Socket {
                address: self.get_string("synth", "address", "127.0.0.1:6560"),
            }),
            "pipe" => {
                let command: Vec<String> = self
                    .get_string("synth", "command", "espeakup")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                Ok(LinkConfig::Pipe { command })
            }
            other => Err(AcsError::Config(format!(
                "link must be serial, socket, or pipe, not '{}'",
                other
            ))),
        }
    }

    /// First index marker of each utterance
    pub fn first_mark(&self) -> u8 {
        self.level("first_mark", 0).min(MAX_MARKER)
    }

    pub fn start_values(&self) -> StartValues {
        let d = StartValues::default();
        StartValues {
            volume: self.level("volume", d.volume),
            pitch: self.level("pitch", d.pitch),
            speed: self.level("speed", d.speed),
            voice: self.level("voice", d.voice),
        }
    }

    // [reading]

    pub fn buffer_mode(&self) -> Result<BufferMode> {
        match self.get_string("reading", "mode", "line").as_str() {
            "line" => Ok(BufferMode::Line),
            "screen" => Ok(BufferMode::Screen),
            other => Err(AcsError::Config(format!(
                "reading mode must be line or screen, not '{}'",
                other
            ))),
        }
    }

    /// Size of the line mode log, in code points
    pub fn capacity(&self) -> usize {
        self.get_int("reading", "capacity", DEFAULT_CAPACITY as i64).max(1000) as usize
    }

    /// Largest chunk sent in one utterance, in bytes
    pub fn sentence_len(&self) -> usize {
        self.get_int("reading", "sentence_len", 240).clamp(8, 4096) as usize
    }

    /// Largest single word, in bytes
    pub fn word_len(&self) -> usize {
        self.get_int("reading", "word_len", 60).clamp(2, 1024) as usize
    }

    pub fn repeat(&self) -> bool {
        self.get_bool("reading", "repeat", true)
    }

    pub fn newline(&self) -> Result<NewlineMode> {
        match self.get_string("reading", "newline", "space").as_str() {
            "stop" => Ok(NewlineMode::Stop),
            "space" => Ok(NewlineMode::Space),
            "keep" => Ok(NewlineMode::Keep),
            other => Err(AcsError::Config(format!(
                "newline must be stop, space, or keep, not '{}'",
                other
            ))),
        }
    }

    /// Extraction flags for continuous reading
    pub fn reading_flags(&self) -> Result<GsFlags> {
        let newline = self.newline()?;
        Ok(GsFlags {
            one_word: false,
            stop_line: newline == NewlineMode::Stop,
            nl_space: newline == NewlineMode::Space,
            repeat: self.repeat(),
        })
    }

    pub fn postprocess(&self) -> Result<PostProcess> {
        PostProcess::parse(&self.get_string("reading", "postprocess", "all"))
    }

    /// Speak characters as they are typed
    pub fn key_echo(&self) -> bool {
        self.get_bool("reading", "key_echo", true)
    }

    /// Read new output automatically when the synthesizer is quiet
    pub fn auto_read(&self) -> bool {
        self.get_bool("reading", "auto_read", false)
    }

    // [fifo]

    /// Where to listen for messages; an empty path turns the FIFO off
    pub fn fifo_path(&self) -> Option<PathBuf> {
        let path = self.get_string("fifo", "path", DEFAULT_FIFO);
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }

    // [symbols] and [words]

    /// English pronunciations with the user's additions on top.
    ///
    /// `[symbols]` keys are decimal code points; an empty value removes the
    /// default name. `[words]` maps words to replacements.
    pub fn dictionaries(&self) -> Result<PronunciationTable> {
        let mut dict = PronunciationTable::english();
        for (key, value) in self.section("symbols") {
            let Ok(code) = key.trim().parse::<u32>() else {
                warn!("Ignoring symbol '{}', expected a decimal code point", key);
                continue;
            };
            let value = value.trim();
            dict.set_punctuation(code, if value.is_empty() { None } else { Some(value) });
        }
        for (word, replacement) in self.section("words") {
            dict.set_word(word.trim(), Some(replacement.trim()))?;
        }
        debug!(
            "Loaded {} punctuation names and {} words",
            dict.punctuation_count(),
            dict.word_count()
        );
        Ok(dict)
    }
}
