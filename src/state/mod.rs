//! Adapter session
//!
//! `Session` is the screen reader proper. The bridge keeps the buffer and
//! the synthesizer in step; the session decides what to say. It runs the
//! reading command bound to each captured key, echoes typed characters,
//! drives continuous reading from the synthesizer's done notices, and
//! answers messages from the FIFO.

pub mod config;
pub mod phonetics;

use crate::bridge::{Bridge, BridgeEvent};
use crate::buffer::{BufferMode, Pos, ReadingBuffer};
use crate::dict::{Dictionaries, PronunciationTable};
use crate::event::{EchoKind, Keystroke, Output};
use crate::input::keys::{self, parse_chord, typed_char};
use crate::input::{KeyAction, Keymap};
use crate::sentence::{self, pronounce, GsFlags};
use crate::speech::{FlowNotice, Setting, SettingOutcome, SpeechRequest};
use crate::symbols;
use crate::{AcsError, Result};
use config::Config;
use log::{debug, info, warn};
use phonetics::phonetic;

/// Reading preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Largest chunk sent in one utterance
    pub sentence_len: usize,
    /// Largest single word
    pub word_len: usize,
    /// Extraction flags for continuous reading
    pub reading_flags: GsFlags,
    /// Collapse punctuation runs when reading a line or word
    pub repeat: bool,
    pub key_echo: bool,
    pub auto_read: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sentence_len: 240,
            word_len: 60,
            reading_flags: GsFlags::continuous(),
            repeat: true,
            key_echo: true,
            auto_read: false,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            sentence_len: config.sentence_len(),
            word_len: config.word_len(),
            reading_flags: config.reading_flags()?,
            repeat: config.repeat(),
            key_echo: config.key_echo(),
            auto_read: config.auto_read(),
        })
    }
}

/// A command waiting for more keys
#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
    SetMark,
    JumpMark,
    Search { backward: bool, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Line,
    Word,
    Char,
}

pub struct Session {
    settings: Settings,
    dict: PronunciationTable,
    keymap: Keymap,
    prompt: Option<Prompt>,
    last_search: Option<String>,

    /// Continuous reading is on; each done notice sends the next chunk
    reading: bool,

    /// Program output arrived since the last idle pass
    fresh_output: bool,

    /// End of the log at the last idle pass, where auto read starts
    seen_end: Option<Pos>,
}

/// Text as the synthesizer takes it, one ISO 8859-1 byte per character
fn speakable(text: &str) -> Vec<u8> {
    text.chars().map(|c| symbols::downshift(c as u32)).collect()
}

/// Speech that cannot go out has already been reported as `SynthBroken`
fn ignore_broken(result: Result<()>) -> Result<()> {
    match result {
        Err(AcsError::ChannelBroken) => Ok(()),
        other => other,
    }
}

/// Marks 0 through 9 are on the digits, 10 through 29 on a through t
fn mark_index(key: &Keystroke) -> Option<usize> {
    let c = typed_char(key)?.to_ascii_lowercase();
    match c {
        '0'..='9' => Some(c as usize - '0' as usize),
        'a'..='t' => Some(c as usize - 'a' as usize + 10),
        _ => None,
    }
}

/// Give the buffer a reading cursor if it has none: the visual cursor in
/// screen mode, the start of the last line in line mode
fn ensure_cursor(buf: &mut ReadingBuffer) -> bool {
    if buf.cursor().is_some() {
        return true;
    }
    let pos = match buf.mode() {
        BufferMode::Screen => buf.visual_cursor().or_else(|| buf.last()),
        BufferMode::Line => {
            buf.set_temp(buf.last());
            buf.line_start();
            buf.temp()
        }
    };
    pos.is_some() && buf.set_cursor(pos)
}

fn setting_name(setting: Setting) -> &'static str {
    match setting {
        Setting::Volume => "volume",
        Setting::Pitch => "pitch",
        Setting::Speed => "speed",
        Setting::Voice => "voice",
    }
}

impl Session {
    pub fn new(settings: Settings, dict: PronunciationTable, keymap: Keymap) -> Self {
        Self {
            settings,
            dict,
            keymap,
            prompt: None,
            last_search: None,
            reading: false,
            fresh_output: false,
            seen_end: None,
        }
    }

    /// Tell the console which keys to hand over
    pub fn attach(&self, bridge: &mut Bridge) {
        let chords: Vec<_> = self.keymap.chords().into_iter().collect();
        bridge.kernel_mut().capture_keys(&chords);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dict(&self) -> &PronunciationTable {
        &self.dict
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Continuous reading is in progress
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    pub fn last_search(&self) -> Option<&str> {
        self.last_search.as_deref()
    }

    /// React to one event from the bridge
    pub fn handle(&mut self, bridge: &mut Bridge, event: BridgeEvent) -> Result<()> {
        let result = match event {
            BridgeEvent::Keystroke(key) => self.on_key(bridge, key),
            BridgeEvent::MoreOutput(out) => self.on_output(bridge, out),
            BridgeEvent::ConsoleSwitch(console) => {
                debug!("Now on console {}", console);
                self.prompt = None;
                self.seen_end = None;
                self.stop(bridge)
            }
            BridgeEvent::Speech(FlowNotice::Done { resume }) => self.on_done(bridge, resume),
            BridgeEvent::Speech(FlowNotice::Marker { .. }) => Ok(()),
            BridgeEvent::FifoMessage(message) => self.on_message(bridge, &message),
            BridgeEvent::SynthBroken | BridgeEvent::KernelClosed => {
                self.reading = false;
                Ok(())
            }
        };
        ignore_broken(result)
    }

    /// Run after each batch of events. With auto read on, new output is
    /// read as soon as the synthesizer is quiet.
    pub fn idle(&mut self, bridge: &mut Bridge) -> Result<()> {
        if bridge.buffer().mode() != BufferMode::Line {
            self.fresh_output = false;
            return Ok(());
        }
        let from = self.seen_end.replace(bridge.buffer().end());
        let fresh = std::mem::take(&mut self.fresh_output);
        if !fresh || !self.settings.auto_read || self.reading || bridge.still_talking() {
            return Ok(());
        }

        let buf = bridge.buffer_mut();
        let start = from.filter(|&p| buf.contains(p)).unwrap_or_else(|| buf.start());
        if !buf.set_cursor(Some(start)) {
            return Ok(());
        }
        debug!("Auto reading from {}", start);
        self.reading = true;
        ignore_broken(self.read_next(bridge))
    }

    fn on_output(&mut self, bridge: &mut Bridge, out: Output) -> Result<()> {
        match out.echo {
            EchoKind::DirectEcho if self.settings.key_echo => {
                if self.reading || bridge.still_talking() {
                    self.stop(bridge)?;
                }
                bridge.say_char(out.ch, &self.dict)
            }
            EchoKind::Output => {
                self.fresh_output = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn on_done(&mut self, bridge: &mut Bridge, resume: Option<Pos>) -> Result<()> {
        if !self.reading {
            return Ok(());
        }
        let start = bridge.buffer().start();
        match resume.filter(|&p| bridge.buffer().contains(p)) {
            Some(pos) => {
                bridge.buffer_mut().set_cursor(Some(pos));
                self.read_next(bridge)
            }
            None if resume.is_some_and(|p| p < start) => {
                // Output scrolled the reading position away; go on from the
                // oldest text still held
                info!("Reading position lost to overflow, resuming at {}", start);
                self.say(bridge, "overflow")?;
                bridge.buffer_mut().set_cursor(Some(start));
                self.read_next(bridge)
            }
            None => {
                debug!("Continuous reading reached the end of the buffer");
                self.reading = false;
                Ok(())
            }
        }
    }

    /// Stop continuous reading and silence the synthesizer
    fn stop(&mut self, bridge: &mut Bridge) -> Result<()> {
        self.reading = false;
        ignore_broken(bridge.shutup())
    }

    fn say(&mut self, bridge: &mut Bridge, text: &str) -> Result<()> {
        bridge.say(&speakable(text))
    }

    fn on_key(&mut self, bridge: &mut Bridge, key: Keystroke) -> Result<()> {
        if let Some(prompt) = self.prompt.take() {
            return self.on_prompt_key(bridge, prompt, key);
        }
        let Some(action) = self.keymap.lookup(&key) else {
            debug!("No binding for {:?}", key);
            return Ok(());
        };
        self.run(bridge, action)
    }

    /// Run a reading command
    pub fn run(&mut self, bridge: &mut Bridge, action: KeyAction) -> Result<()> {
        use KeyAction::*;
        debug!("Running {}", action);
        self.stop(bridge)?;

        match action {
            PrevLine => self.step(bridge, ReadingBuffer::prev_line, Unit::Line, "top"),
            CurrentLine => self.step(bridge, |_| true, Unit::Line, ""),
            NextLine => self.step(bridge, ReadingBuffer::next_line, Unit::Line, "bottom"),
            PrevWord => self.step(bridge, ReadingBuffer::prev_word, Unit::Word, "top"),
            CurrentWord => self.step(bridge, |_| true, Unit::Word, ""),
            NextWord => self.step(bridge, ReadingBuffer::next_word, Unit::Word, "bottom"),
            SpellWord => self.spell_word(bridge),
            PrevChar => self.step(bridge, ReadingBuffer::retreat, Unit::Char, "top"),
            CurrentChar => self.step(bridge, |_| true, Unit::Char, ""),
            NextChar => self.step(bridge, ReadingBuffer::advance, Unit::Char, "bottom"),
            SayCharPhonetic => self.say_phonetic(bridge),
            TopOfBuffer => self.step(bridge, ReadingBuffer::buffer_start, Unit::Line, "blank"),
            BottomOfBuffer => self.step(bridge, ReadingBuffer::buffer_end, Unit::Line, "blank"),
            StartOfLine => self.step(bridge, ReadingBuffer::line_start, Unit::Char, "blank"),
            EndOfLine => self.step(bridge, ReadingBuffer::line_end, Unit::Char, "blank"),
            SayColumn => self.say_column(bridge),
            CursorToVisual => match bridge.buffer().visual_cursor() {
                Some(pos) => {
                    bridge.buffer_mut().set_cursor(Some(pos));
                    self.read_unit(bridge, Unit::Char)
                }
                None => self.say(bridge, "no cursor"),
            },
            ReadContinuous => self.start_reading(bridge),
            Shutup => Ok(()),
            Louder => self.change_setting(bridge, Setting::Volume, true),
            Softer => self.change_setting(bridge, Setting::Volume, false),
            Faster => self.change_setting(bridge, Setting::Speed, true),
            Slower => self.change_setting(bridge, Setting::Speed, false),
            PitchUp => self.change_setting(bridge, Setting::Pitch, true),
            PitchDown => self.change_setting(bridge, Setting::Pitch, false),
            NextVoice => self.next_voice(bridge),
            ToggleMode => {
                let mode = match bridge.buffer().mode() {
                    BufferMode::Line => BufferMode::Screen,
                    BufferMode::Screen => BufferMode::Line,
                };
                self.set_mode(bridge, mode)
            }
            ClearBuffer => {
                if bridge.buffer_mut().clear() {
                    self.say(bridge, "cleared")
                } else {
                    self.say(bridge, "screen mode")
                }
            }
            SetMark => self.prompt(bridge, Prompt::SetMark),
            JumpMark => self.prompt(bridge, Prompt::JumpMark),
            SearchForward | SearchBack => {
                let prompt = Prompt::Search {
                    backward: action == SearchBack,
                    text: String::new(),
                };
                self.prompt(bridge, prompt)?;
                self.say(bridge, "search")
            }
            ToggleKeyEcho => {
                self.settings.key_echo = !self.settings.key_echo;
                let text = if self.settings.key_echo { "echo on" } else { "echo off" };
                self.say(bridge, text)
            }
        }
    }

    fn prompt(&mut self, bridge: &mut Bridge, prompt: Prompt) -> Result<()> {
        self.prompt = Some(prompt);
        bridge.kernel_mut().capture_next();
        Ok(())
    }

    fn on_prompt_key(&mut self, bridge: &mut Bridge, prompt: Prompt, key: Keystroke) -> Result<()> {
        match prompt {
            Prompt::SetMark => {
                let Some(i) = mark_index(&key) else {
                    return self.say(bridge, "cancelled");
                };
                let cursor = bridge.buffer().cursor();
                if cursor.is_some() && bridge.buffer_mut().set_mark(i, cursor) {
                    self.say(bridge, "marked")
                } else {
                    self.say(bridge, "no cursor")
                }
            }
            Prompt::JumpMark => {
                let Some(i) = mark_index(&key) else {
                    return self.say(bridge, "cancelled");
                };
                let buf = bridge.buffer_mut();
                buf.set_cursor_to_temp();
                if buf.jump_to_mark(i) {
                    buf.sync_cursor_from_temp();
                    self.read_unit(bridge, Unit::Line)
                } else {
                    self.say(bridge, "no mark")
                }
            }
            Prompt::Search { backward, mut text } => match key.code {
                keys::ENTER => {
                    if !text.is_empty() {
                        self.last_search = Some(text);
                    }
                    self.search(bridge, backward)
                }
                keys::ESCAPE => self.say(bridge, "cancelled"),
                keys::BACKSPACE => {
                    text.pop();
                    self.prompt(bridge, Prompt::Search { backward, text })
                }
                _ => match typed_char(&key) {
                    Some(c) => {
                        text.push(c);
                        self.prompt(bridge, Prompt::Search { backward, text })?;
                        bridge.say_char(c as u32, &self.dict)
                    }
                    None => self.say(bridge, "cancelled"),
                },
            },
        }
    }

    /// Move the reading cursor with a motion and read what it lands on.
    /// `edge` is said when the motion fails.
    fn step(
        &mut self,
        bridge: &mut Bridge,
        motion: impl FnOnce(&mut ReadingBuffer) -> bool,
        unit: Unit,
        edge: &str,
    ) -> Result<()> {
        let buf = bridge.buffer_mut();
        if !ensure_cursor(buf) {
            return self.say(bridge, "blank");
        }
        buf.set_cursor_to_temp();
        if !motion(buf) {
            return self.say(bridge, edge);
        }
        buf.sync_cursor_from_temp();
        self.read_unit(bridge, unit)
    }

    /// Read the line, word, or character at the reading cursor
    fn read_unit(&mut self, bridge: &mut Bridge, unit: Unit) -> Result<()> {
        let buf = bridge.buffer_mut();
        buf.set_cursor_to_temp();
        let (flags, capacity) = match unit {
            Unit::Line => {
                buf.line_start();
                let flags = GsFlags {
                    stop_line: true,
                    repeat: self.settings.repeat,
                    ..GsFlags::default()
                };
                (flags, self.settings.sentence_len)
            }
            Unit::Word => {
                buf.word_start();
                let flags = GsFlags {
                    one_word: true,
                    repeat: self.settings.repeat,
                    ..GsFlags::default()
                };
                (flags, self.settings.word_len)
            }
            Unit::Char => {
                return match buf.getc() {
                    Some(c) => bridge.say_char(c, &self.dict),
                    None => self.say(bridge, "blank"),
                };
            }
        };
        buf.sync_cursor_from_temp();

        let Some(anchor) = bridge.buffer().cursor() else {
            return self.say(bridge, "blank");
        };
        let chunk = sentence::extract(bridge.buffer(), capacity, flags, &self.dict);
        if chunk.is_empty() {
            return self.say(bridge, "blank");
        }
        let spoken = pronounce(&chunk, &self.dict);
        bridge.speak(SpeechRequest::tracked(spoken, anchor)).map(|_| ())
    }

    fn start_reading(&mut self, bridge: &mut Bridge) -> Result<()> {
        if !ensure_cursor(bridge.buffer_mut()) {
            return self.say(bridge, "blank");
        }
        self.reading = true;
        self.read_next(bridge)
    }

    /// Send the next chunk of continuous reading
    fn read_next(&mut self, bridge: &mut Bridge) -> Result<()> {
        while self.reading {
            let Some(anchor) = bridge.buffer().cursor() else {
                self.reading = false;
                break;
            };
            let chunk = sentence::extract(
                bridge.buffer(),
                self.settings.sentence_len,
                self.settings.reading_flags,
                &self.dict,
            );
            if chunk.consumed == 0 {
                debug!("Nothing left to read at {}", anchor);
                self.reading = false;
                break;
            }
            if chunk.is_empty() {
                // Only blanks here; skip them
                let next = anchor.offset(chunk.consumed);
                if !bridge.buffer().contains(next) {
                    self.reading = false;
                    break;
                }
                bridge.buffer_mut().set_cursor(Some(next));
                continue;
            }

            let spoken = pronounce(&chunk, &self.dict);
            let consumed = bridge.speak(SpeechRequest::tracked(spoken, anchor))?;
            if !bridge.still_talking() {
                // No markers will come back, so there is nothing to wait for
                let next = anchor.offset(consumed);
                if bridge.buffer().contains(next) {
                    bridge.buffer_mut().set_cursor(Some(next));
                }
                self.reading = false;
            }
            break;
        }
        Ok(())
    }

    fn spell_word(&mut self, bridge: &mut Bridge) -> Result<()> {
        let buf = bridge.buffer_mut();
        if !ensure_cursor(buf) {
            return self.say(bridge, "blank");
        }
        buf.set_cursor_to_temp();
        if !buf.word_start() {
            return self.say(bridge, "blank");
        }
        let Some(start) = buf.temp() else {
            return self.say(bridge, "blank");
        };
        buf.word_end();
        let end = buf.temp().map_or(start, |p| p.offset(1));
        let word = buf.text(start, end);

        let mut text = Vec::new();
        for c in word.chars() {
            if !text.is_empty() {
                text.push(b' ');
            }
            match self.dict.lookup_punctuation(c as u32) {
                Some(name) => text.extend(speakable(name)),
                None => text.push(symbols::downshift(c as u32)),
            }
        }
        bridge.say(&text)
    }

    fn say_phonetic(&mut self, bridge: &mut Bridge) -> Result<()> {
        let buf = bridge.buffer_mut();
        if !ensure_cursor(buf) {
            return self.say(bridge, "blank");
        }
        buf.set_cursor_to_temp();
        let Some(c) = buf.getc() else {
            return self.say(bridge, "blank");
        };
        match phonetic(c) {
            Some(word) => self.say(bridge, word),
            None => bridge.say_char(c, &self.dict),
        }
    }

    fn say_column(&mut self, bridge: &mut Bridge) -> Result<()> {
        let buf = bridge.buffer_mut();
        if !ensure_cursor(buf) {
            return self.say(bridge, "blank");
        }
        buf.set_cursor_to_temp();
        match buf.column() {
            Some(col) => self.say(bridge, &format!("column {}", col + 1)),
            None => self.say(bridge, "blank"),
        }
    }

    fn report_setting(
        &mut self,
        bridge: &mut Bridge,
        setting: Setting,
        outcome: SettingOutcome,
    ) -> Result<()> {
        let text = match outcome {
            SettingOutcome::Changed(level) => format!("{} {}", setting_name(setting), level),
            SettingOutcome::OutOfRange => format!("{} out of range", setting_name(setting)),
            SettingOutcome::Unsupported => format!("{} not supported", setting_name(setting)),
        };
        self.say(bridge, &text)
    }

    fn change_setting(&mut self, bridge: &mut Bridge, setting: Setting, up: bool) -> Result<()> {
        let outcome = bridge.change_setting(setting, None, up)?;
        self.report_setting(bridge, setting, outcome)
    }

    /// Step through the voices, wrapping back to the first
    fn next_voice(&mut self, bridge: &mut Bridge) -> Result<()> {
        let mut outcome = bridge.change_setting(Setting::Voice, None, true)?;
        if outcome == SettingOutcome::OutOfRange {
            outcome = bridge.change_setting(Setting::Voice, Some(0), true)?;
        }
        self.report_setting(bridge, Setting::Voice, outcome)
    }

    fn set_mode(&mut self, bridge: &mut Bridge, mode: BufferMode) -> Result<()> {
        self.seen_end = None;
        bridge.set_mode(mode);
        match mode {
            BufferMode::Line => self.say(bridge, "line mode"),
            BufferMode::Screen => self.say(bridge, "screen mode"),
        }
    }

    fn search(&mut self, bridge: &mut Bridge, backward: bool) -> Result<()> {
        let Some(text) = self.last_search.clone() else {
            return self.say(bridge, "no search string");
        };
        let buf = bridge.buffer_mut();
        if !ensure_cursor(buf) {
            return self.say(bridge, "blank");
        }
        buf.set_cursor_to_temp();
        if buf.search(&text, backward, true) {
            buf.sync_cursor_from_temp();
            self.read_unit(bridge, Unit::Line)
        } else {
            self.say(bridge, "not found")
        }
    }

    /// Act on a line from the FIFO. Bad messages are logged and dropped.
    fn on_message(&mut self, bridge: &mut Bridge, message: &str) -> Result<()> {
        let message = message.trim();
        let (command, arg) = match message.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (message, ""),
        };
        debug!("FIFO command '{}'", command);

        match command {
            "say" => {
                self.stop(bridge)?;
                self.say(bridge, arg)
            }
            "shutup" => self.stop(bridge),
            "read" => {
                self.stop(bridge)?;
                self.start_reading(bridge)
            }
            "search" | "rsearch" => {
                if !arg.is_empty() {
                    self.last_search = Some(arg.to_string());
                }
                self.stop(bridge)?;
                self.search(bridge, command == "rsearch")
            }
            "volume" | "pitch" | "speed" | "voice" => {
                let setting = match command {
                    "volume" => Setting::Volume,
                    "pitch" => Setting::Pitch,
                    "speed" => Setting::Speed,
                    _ => Setting::Voice,
                };
                let Ok(level) = arg.parse::<i32>() else {
                    warn!("FIFO: {} needs a number, got '{}'", command, arg);
                    return Ok(());
                };
                let outcome = bridge.change_setting(setting, Some(level), true)?;
                if outcome != SettingOutcome::Changed(level as u8) {
                    warn!("FIFO: {} {}: {:?}", command, level, outcome);
                }
                Ok(())
            }
            "mode" => match arg {
                "line" => self.set_mode(bridge, BufferMode::Line),
                "screen" => self.set_mode(bridge, BufferMode::Screen),
                _ => {
                    warn!("FIFO: mode must be line or screen, not '{}'", arg);
                    Ok(())
                }
            },
            "flow" => match arg {
                "on" | "hardware" => bridge.set_flow_control(true),
                "off" | "none" => bridge.set_flow_control(false),
                _ => {
                    warn!("FIFO: flow must be on or off, not '{}'", arg);
                    Ok(())
                }
            },
            "word" => {
                let (word, replacement) = match arg.split_once(char::is_whitespace) {
                    Some((w, r)) => (w, Some(r.trim())),
                    None => (arg, None),
                };
                if let Err(e) = self.dict.set_word(word, replacement) {
                    warn!("FIFO: {}", e);
                }
                Ok(())
            }
            "punc" => {
                let (code, name) = match arg.split_once(char::is_whitespace) {
                    Some((c, n)) => (c, Some(n.trim())),
                    None => (arg, None),
                };
                let mut chars = code.chars();
                let code = match (code.parse::<u32>(), chars.next(), chars.next()) {
                    (Ok(n), _, _) => n,
                    (Err(_), Some(c), None) => c as u32,
                    _ => {
                        warn!("FIFO: punc needs a character or code point, got '{}'", code);
                        return Ok(());
                    }
                };
                self.dict.set_punctuation(code, name);
                Ok(())
            }
            "key" => {
                let (chord_text, action) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
                let Some(chord) = parse_chord(chord_text) else {
                    warn!("FIFO: unknown key '{}'", chord_text);
                    return Ok(());
                };
                match action.trim() {
                    "" | "none" => {
                        self.keymap.unbind(chord);
                    }
                    name => match name.parse() {
                        Ok(action) => self.keymap.bind(chord, action),
                        Err(e) => {
                            warn!("FIFO: {}", e);
                            return Ok(());
                        }
                    },
                }
                self.attach(bridge);
                Ok(())
            }
            "" => Ok(()),
            other => {
                info!("FIFO: unknown command '{}'", other);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::shift;

    #[test]
    fn test_mark_index() {
        assert_eq!(mark_index(&Keystroke::new('0' as u16, 0)), Some(0));
        assert_eq!(mark_index(&Keystroke::new('9' as u16, 0)), Some(9));
        assert_eq!(mark_index(&Keystroke::new('c' as u16, 0)), Some(12));
        assert_eq!(mark_index(&Keystroke::new('t' as u16, shift::SHIFT)), Some(29));
        assert_eq!(mark_index(&Keystroke::new('u' as u16, 0)), None);
        assert_eq!(mark_index(&Keystroke::new(keys::ENTER, 0)), None);
    }

    #[test]
    fn test_ensure_cursor_line_mode() {
        let mut buf = ReadingBuffer::line(1000);
        assert!(!ensure_cursor(&mut buf));
        for c in "one\ntwo".chars() {
            buf.append(c as u32);
        }
        assert!(ensure_cursor(&mut buf));
        assert_eq!(buf.cursor(), Some(buf.start().offset(4)));
    }

    #[test]
    fn test_speakable() {
        assert_eq!(speakable("caf\u{e9}"), b"caf\xe9".to_vec());
        assert_eq!(speakable("\u{201c}hi\u{201d}"), b"\"hi\"".to_vec());
    }
}
