//! Pronunciation dictionaries
//!
//! The bridge consults two lookups while preparing text for speech:
//! punctuation names keyed by code point, and word replacements keyed by
//! lower case word. They are pure lookups from the bridge's point of view,
//! expressed as the `Dictionaries` trait. `PronunciationTable` is the
//! in-memory implementation, seeded with English defaults and overridden
//! from the config file.

mod defaults;

use crate::{AcsError, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Longest word the replacement dictionary accepts
pub const WORDLEN: usize = 18;

/// Most words the replacement dictionary holds
pub const NUMDICTWORDS: usize = 1000;

/// Pronunciation lookups used by the reading pipeline
pub trait Dictionaries {
    /// How to say a punctuation mark or symbol
    fn lookup_punctuation(&self, c: u32) -> Option<&str>;

    /// Replacement for a lower case word
    fn lookup_word_replacement(&self, word: &str) -> Option<&str>;

    /// Replacement that understands English suffixes: if "read" becomes
    /// "reed", then "reading" becomes "reeding"
    fn lookup_smart_replacement(&self, word: &str) -> Option<String>;
}

/// A plain lower case word, the only thing smart replacement will touch
static PLAIN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+$").expect("valid regex"));

/// Replacements must be words, so a suffix can go back on the end
static PLAIN_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+( [a-z]+)*$").expect("valid regex"));

/// Suffix rules, longest first: (suffix, root ending it replaced)
const SUFFIXES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("ied", "y"),
    ("ings", ""),
    ("ings", "e"),
    ("ing", ""),
    ("ing", "e"),
    ("ers", ""),
    ("ers", "e"),
    ("es", ""),
    ("ed", ""),
    ("ed", "e"),
    ("er", ""),
    ("er", "e"),
    ("'s", ""),
    ("s", ""),
];

/// Punctuation and word pronunciation tables
#[derive(Debug, Clone, Default)]
pub struct PronunciationTable {
    punctuation: HashMap<u32, String>,
    words: HashMap<String, String>,
}

impl PronunciationTable {
    /// Empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables preloaded with common English pronunciations
    pub fn english() -> Self {
        let punctuation = defaults::PUNCTUATION
            .iter()
            .map(|(&c, &name)| (c, name.to_string()))
            .collect();
        Self {
            punctuation,
            words: HashMap::new(),
        }
    }

    /// Set or clear the pronunciation of a punctuation mark.
    /// Only 2 byte code points may be set; larger ones are ignored.
    pub fn set_punctuation(&mut self, c: u32, name: Option<&str>) {
        if c > 0xffff {
            debug!("Ignoring pronunciation for U+{:X}, beyond the 16 bit table", c);
            return;
        }
        match name {
            Some(name) => {
                self.punctuation.insert(c, name.to_string());
            }
            None => {
                self.punctuation.remove(&c);
            }
        }
    }

    /// Set or remove a word replacement. Matching is case insensitive.
    pub fn set_word(&mut self, word: &str, replacement: Option<&str>) -> Result<()> {
        let key = word.to_lowercase();
        if key.is_empty() || key.chars().count() > WORDLEN {
            return Err(AcsError::Config(format!(
                "word '{}' must be 1 to {} characters",
                word, WORDLEN
            )));
        }
        match replacement {
            Some(r) => {
                if !self.words.contains_key(&key) && self.words.len() >= NUMDICTWORDS {
                    return Err(AcsError::Config(format!(
                        "replacement dictionary is full ({} words)",
                        NUMDICTWORDS
                    )));
                }
                self.words.insert(key, r.to_string());
            }
            None => {
                self.words.remove(&key);
            }
        }
        Ok(())
    }

    pub fn punctuation_count(&self) -> usize {
        self.punctuation.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl Dictionaries for PronunciationTable {
    fn lookup_punctuation(&self, c: u32) -> Option<&str> {
        self.punctuation.get(&c).map(String::as_str)
    }

    fn lookup_word_replacement(&self, word: &str) -> Option<&str> {
        self.words.get(word).map(String::as_str)
    }

    fn lookup_smart_replacement(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if let Some(r) = self.lookup_word_replacement(&word) {
            return Some(r.to_string());
        }
        if !PLAIN_WORD.is_match(&word) {
            return None;
        }

        for &(suffix, restore) in SUFFIXES {
            let Some(stem) = word.strip_suffix(suffix) else {
                continue;
            };
            if stem.len() < 2 {
                continue;
            }
            let root = format!("{}{}", stem, restore);
            let Some(replacement) = self.lookup_word_replacement(&root) else {
                continue;
            };
            if !PLAIN_PHRASE.is_match(replacement) {
                continue;
            }
            // Put the suffix back on the replacement, undoing the root ending
            let base = replacement.strip_suffix(restore).unwrap_or(replacement);
            return Some(format!("{}{}", base, suffix));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_defaults() {
        let dict = PronunciationTable::english();
        assert_eq!(dict.lookup_punctuation('$' as u32), Some("dollar"));
        assert_eq!(dict.lookup_punctuation('-' as u32), Some("dash"));
        assert_eq!(dict.lookup_punctuation(0x20ac), Some("euro"));
        assert_eq!(dict.lookup_punctuation('a' as u32), None);
    }

    #[test]
    fn test_set_punctuation() {
        let mut dict = PronunciationTable::english();
        dict.set_punctuation('}' as u32, Some("close brace"));
        assert_eq!(dict.lookup_punctuation('}' as u32), Some("close brace"));
        dict.set_punctuation('}' as u32, None);
        assert_eq!(dict.lookup_punctuation('}' as u32), None);
        dict.set_punctuation(0x1f600, Some("grin"));
        assert_eq!(dict.lookup_punctuation(0x1f600), None);
    }

    #[test]
    fn test_word_replacement_case_insensitive() {
        let mut dict = PronunciationTable::new();
        dict.set_word("Dog", Some("cat")).unwrap();
        assert_eq!(dict.lookup_smart_replacement("DOG"), Some("cat".to_string()));
        dict.set_word("dog", None).unwrap();
        assert_eq!(dict.lookup_smart_replacement("dog"), None);
        assert!(dict.set_word("averyveryverylongword", Some("x")).is_err());
    }

    #[test]
    fn test_smart_suffixes() {
        let mut dict = PronunciationTable::new();
        dict.set_word("computer", Some("compeuter")).unwrap();
        dict.set_word("read", Some("reed")).unwrap();
        dict.set_word("library", Some("lighbrary")).unwrap();
        dict.set_word("make", Some("maik")).unwrap();
        dict.set_word("use", Some("yooze")).unwrap();

        assert_eq!(dict.lookup_smart_replacement("computers").as_deref(), Some("compeuters"));
        assert_eq!(dict.lookup_smart_replacement("reading").as_deref(), Some("reeding"));
        assert_eq!(dict.lookup_smart_replacement("libraries").as_deref(), Some("lighbraries"));
        assert_eq!(dict.lookup_smart_replacement("making").as_deref(), Some("maiking"));
        assert_eq!(dict.lookup_smart_replacement("used").as_deref(), Some("yoozed"));
        assert_eq!(dict.lookup_smart_replacement("unrelated"), None);
    }

    #[test]
    fn test_smart_requires_word_replacement() {
        let mut dict = PronunciationTable::new();
        dict.set_word("foo", Some("f.o.o")).unwrap();
        // The exact word still maps
        assert_eq!(dict.lookup_smart_replacement("foo").as_deref(), Some("f.o.o"));
        // but the suffix cannot go back on punctuation
        assert_eq!(dict.lookup_smart_replacement("foos"), None);
    }
}
