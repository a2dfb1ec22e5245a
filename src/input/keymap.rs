//! Default key bindings
//!
//! A chord is a key code plus modifier bits. Either alt key counts as alt.
//! Bound chords are captured for the adapter; everything else goes to the
//! program running in the console.

use super::keys::{self, parse_chord};
use crate::event::{shift, Keystroke};
use crate::{AcsError, Result};
use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Key code and normalized modifier bits
pub type Chord = (u16, u8);

/// The chord a keystroke plays
pub fn chord(key: &Keystroke) -> Chord {
    let mut bits = key.shift & (shift::SHIFT | shift::CTRL);
    if key.shift & shift::ALT != 0 {
        bits |= shift::LALT;
    }
    (key.code, bits)
}

/// Reading commands a key can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    // Line navigation
    PrevLine,
    CurrentLine,
    NextLine,

    // Word navigation
    PrevWord,
    CurrentWord,
    NextWord,
    SpellWord,

    // Character navigation
    PrevChar,
    CurrentChar,
    NextChar,
    SayCharPhonetic,

    // Buffer navigation
    TopOfBuffer,
    BottomOfBuffer,
    StartOfLine,
    EndOfLine,
    SayColumn,
    CursorToVisual,

    // Speech
    ReadContinuous,
    Shutup,
    Louder,
    Softer,
    Faster,
    Slower,
    PitchUp,
    PitchDown,
    NextVoice,

    // Buffer and marks
    ToggleMode,
    ClearBuffer,
    SetMark,
    JumpMark,
    SearchForward,
    SearchBack,
    ToggleKeyEcho,
}

const ACTION_NAMES: &[(&str, KeyAction)] = &[
    ("prev_line", KeyAction::PrevLine),
    ("current_line", KeyAction::CurrentLine),
    ("next_line", KeyAction::NextLine),
    ("prev_word", KeyAction::PrevWord),
    ("current_word", KeyAction::CurrentWord),
    ("next_word", KeyAction::NextWord),
    ("spell_word", KeyAction::SpellWord),
    ("prev_char", KeyAction::PrevChar),
    ("current_char", KeyAction::CurrentChar),
    ("next_char", KeyAction::NextChar),
    ("say_char_phonetic", KeyAction::SayCharPhonetic),
    ("top_of_buffer", KeyAction::TopOfBuffer),
    ("bottom_of_buffer", KeyAction::BottomOfBuffer),
    ("start_of_line", KeyAction::StartOfLine),
    ("end_of_line", KeyAction::EndOfLine),
    ("say_column", KeyAction::SayColumn),
    ("cursor_to_visual", KeyAction::CursorToVisual),
    ("read_continuous", KeyAction::ReadContinuous),
    ("shutup", KeyAction::Shutup),
    ("louder", KeyAction::Louder),
    ("softer", KeyAction::Softer),
    ("faster", KeyAction::Faster),
    ("slower", KeyAction::Slower),
    ("pitch_up", KeyAction::PitchUp),
    ("pitch_down", KeyAction::PitchDown),
    ("next_voice", KeyAction::NextVoice),
    ("toggle_mode", KeyAction::ToggleMode),
    ("clear_buffer", KeyAction::ClearBuffer),
    ("set_mark", KeyAction::SetMark),
    ("jump_mark", KeyAction::JumpMark),
    ("search_forward", KeyAction::SearchForward),
    ("search_back", KeyAction::SearchBack),
    ("toggle_key_echo", KeyAction::ToggleKeyEcho),
];

impl FromStr for KeyAction {
    type Err = AcsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        ACTION_NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|&(_, action)| action)
            .ok_or_else(|| AcsError::Config(format!("unknown key action '{}'", s)))
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = ACTION_NAMES
            .iter()
            .find(|(_, a)| a == self)
            .map_or("?", |(name, _)| name);
        f.write_str(name)
    }
}

/// Chord to action, with double-tap variants
pub struct Keymap {
    bindings: HashMap<Chord, KeyAction>,

    /// Pressing the first action's key twice quickly gives the second
    doubles: HashMap<KeyAction, KeyAction>,

    /// Last chord pressed (for detecting double-tap)
    last: Option<(Chord, Instant)>,

    /// Timeout for detecting double-tap (500ms)
    repeat_timeout: Duration,
}

impl Keymap {
    /// A keymap with no bindings
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
            doubles: HashMap::new(),
            last: None,
            repeat_timeout: Duration::from_millis(500),
        }
    }

    /// The default bindings, all on alt
    pub fn new() -> Self {
        use KeyAction::*;
        let alt = shift::LALT;
        let alt_shift = shift::LALT | shift::SHIFT;
        let mut map = Self::empty();

        let mut bind = |c: char, bits: u8, action: KeyAction| {
            map.bindings.insert((c as u16, bits), action);
        };

        // Line navigation (alt+u/i/o)
        bind('u', alt, PrevLine);
        bind('i', alt, CurrentLine);
        bind('o', alt, NextLine);

        // Word navigation (alt+j/k/l)
        bind('j', alt, PrevWord);
        bind('k', alt, CurrentWord);
        bind('l', alt, NextWord);

        // Character navigation (alt+m/comma/dot)
        bind('m', alt, PrevChar);
        bind(',', alt, CurrentChar);
        bind('.', alt, NextChar);

        // Buffer edges (alt+U/O/M/>)
        bind('u', alt_shift, TopOfBuffer);
        bind('o', alt_shift, BottomOfBuffer);
        bind('m', alt_shift, StartOfLine);
        bind('>', alt, EndOfLine);
        bind(':', alt, EndOfLine); // Hungarian keyboard
        bind('h', alt, SayColumn);
        bind('i', alt_shift, CursorToVisual);

        // Speech
        bind('r', alt, ReadContinuous);
        bind('x', alt, Shutup);
        bind('=', alt, Louder);
        bind('-', alt, Softer);
        bind('f', alt, Faster);
        bind('f', alt_shift, Slower);
        bind('p', alt, PitchUp);
        bind('p', alt_shift, PitchDown);
        bind('v', alt, NextVoice);

        // Buffer and marks
        bind('s', alt, ToggleMode);
        bind('c', alt_shift, ClearBuffer);
        bind('b', alt, SetMark);
        bind('g', alt, JumpMark);
        bind('n', alt, SearchForward);
        bind('n', alt_shift, SearchBack);
        bind('q', alt, ToggleKeyEcho);

        // Double-tap keys (press twice within timeout)
        map.doubles.insert(CurrentWord, SpellWord);
        map.doubles.insert(CurrentChar, SayCharPhonetic);

        map
    }

    pub fn bind(&mut self, chord: Chord, action: KeyAction) {
        self.bindings.insert(chord, action);
    }

    pub fn unbind(&mut self, chord: Chord) -> Option<KeyAction> {
        self.bindings.remove(&chord)
    }

    /// Apply `[keys]` entries such as `alt+u = prev_line`. An empty action
    /// or `none` removes the binding.
    pub fn apply_overrides(&mut self, entries: &[(String, String)]) -> Result<()> {
        for (chord_text, action_text) in entries {
            let Some(chord) = parse_chord(chord_text) else {
                warn!("Ignoring unknown key '{}'", chord_text);
                continue;
            };
            let action_text = action_text.trim();
            if action_text.is_empty() || action_text.eq_ignore_ascii_case("none") {
                self.unbind(chord);
                continue;
            }
            self.bind(chord, action_text.parse()?);
        }
        debug!("Keymap has {} bindings", self.bindings.len());
        Ok(())
    }

    /// Every chord the adapter wants to see
    pub fn chords(&self) -> HashSet<Chord> {
        self.bindings.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, chord: Chord) -> Option<KeyAction> {
        self.bindings.get(&chord).copied()
    }

    /// The action for a keystroke, checking double-tap variants first
    pub fn lookup(&mut self, key: &Keystroke) -> Option<KeyAction> {
        self.lookup_at(key, Instant::now())
    }

    pub fn lookup_at(&mut self, key: &Keystroke, now: Instant) -> Option<KeyAction> {
        let c = chord(key);
        let repeat = matches!(
            self.last,
            Some((last, at)) if last == c && now.duration_since(at) < self.repeat_timeout
        );
        let action = self.get(c)?;

        if repeat {
            if let Some(&double) = self.doubles.get(&action) {
                debug!("Double-tap key detected: {:?}", double);
                // A third press starts over
                self.last = None;
                return Some(double);
            }
        }
        trace!("Key action: {:?}", action);
        self.last = Some((c, now));
        Some(action)
    }

    /// Forget the last key, so the next press is never a double-tap
    pub fn reset_repeat(&mut self) {
        self.last = None;
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

/// The digit a key types, for commands that take a mark number
pub fn digit(key: &Keystroke) -> Option<usize> {
    keys::typed_char(key).and_then(|c| c.to_digit(10)).map(|d| d as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(c: char) -> Keystroke {
        Keystroke::new(c as u16, shift::LALT)
    }

    #[test]
    fn test_default_bindings() {
        let mut map = Keymap::new();
        assert_eq!(map.lookup(&alt('u')), Some(KeyAction::PrevLine));
        assert_eq!(map.lookup(&alt('r')), Some(KeyAction::ReadContinuous));
        assert_eq!(map.lookup(&Keystroke::new('u' as u16, 0)), None);
        // Right alt plays the same chord
        assert_eq!(
            map.lookup(&Keystroke::new('o' as u16, shift::RALT | shift::SHIFT)),
            Some(KeyAction::BottomOfBuffer)
        );
    }

    #[test]
    fn test_double_tap() {
        let mut map = Keymap::new();
        let t0 = Instant::now();
        assert_eq!(map.lookup_at(&alt('k'), t0), Some(KeyAction::CurrentWord));
        assert_eq!(
            map.lookup_at(&alt('k'), t0 + Duration::from_millis(200)),
            Some(KeyAction::SpellWord)
        );
        assert_eq!(
            map.lookup_at(&alt('k'), t0 + Duration::from_millis(300)),
            Some(KeyAction::CurrentWord)
        );
        // Too slow for a double-tap
        assert_eq!(
            map.lookup_at(&alt('k'), t0 + Duration::from_secs(2)),
            Some(KeyAction::CurrentWord)
        );
    }

    #[test]
    fn test_overrides() {
        let mut map = Keymap::new();
        map.apply_overrides(&[
            ("alt+u".to_string(), "next_line".to_string()),
            ("alt+x".to_string(), "none".to_string()),
            ("ctrl+f5".to_string(), "shutup".to_string()),
        ])
        .unwrap();
        assert_eq!(map.get((b'u' as u16, shift::LALT)), Some(KeyAction::NextLine));
        assert_eq!(map.get((b'x' as u16, shift::LALT)), None);
        assert_eq!(map.get((keys::F1 + 4, shift::CTRL)), Some(KeyAction::Shutup));

        let bad = map.apply_overrides(&[("alt+z".to_string(), "fly".to_string())]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_action_names() {
        for &(name, action) in ACTION_NAMES {
            assert_eq!(name.parse::<KeyAction>().unwrap(), action);
            assert_eq!(action.to_string(), name);
        }
    }

    #[test]
    fn test_digit() {
        assert_eq!(digit(&Keystroke::new('7' as u16, 0)), Some(7));
        assert_eq!(digit(&alt('7')), None);
    }
}
