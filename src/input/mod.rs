//! Keyboard input: decoding terminal bytes into keystrokes, and binding
//! captured chords to reading commands

pub mod keymap;
pub mod keys;

pub use keymap::{chord, Chord, KeyAction, Keymap};
pub use keys::{decode_keys, parse_chord, typed_char, DecodedKey};
