//! Character classes and downshifting
//!
//! The reading buffer stores 4 byte code points, but synthesizers speak
//! 8 bit text. This module decides what counts as a letter, a space, or a
//! punctuation mark, and maps code points down to ISO 8859-1:
//! - `downshift`: code point to a single byte, `?` when there is no equivalent
//! - `is_word_char` / `is_punct` / `is_space`: token classes used by
//!   word motion and sentence extraction
//!
//! Letter classification and case folding come from the Unicode tables in
//! the standard library. That is the closest thing we have to the host
//! locale; scripts other than Latin are best-effort.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A run of at least this many identical punctuation marks is one token.
/// Four dashes are four words, five dashes are "dash length 5".
pub const REPEAT_MIN: usize = 5;

/// Newline code point
pub const NEWLINE: u32 = '\n' as u32;

/// Unicode punctuation that has a plain ASCII equivalent.
///
/// Curly quotes become straight quotes, the various dashes become a minus,
/// bullets become a star, and so on. Anything listed here never falls back
/// to a question mark.
static EQUIVALENTS: Lazy<HashMap<u32, u8>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(0x2018, b'\'');
    m.insert(0x2019, b'\'');
    m.insert(0x201a, b'\'');
    m.insert(0x201b, b'\'');
    m.insert(0x2032, b'\'');
    m.insert(0x201c, b'"');
    m.insert(0x201d, b'"');
    m.insert(0x201e, b'"');
    m.insert(0x2033, b'"');
    m.insert(0x2010, b'-');
    m.insert(0x2011, b'-');
    m.insert(0x2012, b'-');
    m.insert(0x2013, b'-');
    m.insert(0x2014, b'-');
    m.insert(0x2015, b'-');
    m.insert(0x2212, b'-');
    m.insert(0x2022, b'*');
    m.insert(0x2023, b'*');
    m.insert(0x2043, b'*');
    m.insert(0x25cf, b'*');
    m.insert(0x2024, b'.');
    m.insert(0x2044, b'/');
    m.insert(0x2215, b'/');
    m.insert(0x2039, b'<');
    m.insert(0x203a, b'>');
    m.insert(0x2000, b' ');
    m.insert(0x2002, b' ');
    m.insert(0x2003, b' ');
    m.insert(0x2009, b' ');
    m.insert(0x200a, b' ');
    m.insert(0x202f, b' ');
    m
});

fn as_char(c: u32) -> Option<char> {
    char::from_u32(c)
}

/// Downshift a code point to ISO 8859-1, or `None` if there is no equivalent.
pub fn downshift_exact(c: u32) -> Option<u8> {
    if c < 256 {
        return Some(c as u8);
    }
    EQUIVALENTS.get(&c).copied()
}

/// Downshift a code point to ISO 8859-1, using `?` when nothing fits.
pub fn downshift(c: u32) -> u8 {
    downshift_exact(c).unwrap_or(b'?')
}

/// Letters and digits, in any script the Unicode tables know about
pub fn is_word_char(c: u32) -> bool {
    as_char(c).is_some_and(|ch| ch.is_alphanumeric())
}

/// An apostrophe, straight or curly. One of these is tolerated inside a word.
pub fn is_apostrophe(c: u32) -> bool {
    c == '\'' as u32 || c == 0x2019
}

/// Horizontal white space. Newline is deliberately not included;
/// callers decide whether a newline ends a line or folds into a space.
pub fn is_space(c: u32) -> bool {
    if c == NEWLINE {
        return false;
    }
    as_char(c).is_some_and(|ch| ch.is_whitespace())
}

/// A printable mark that is neither a letter, a digit, nor white space
pub fn is_punct(c: u32) -> bool {
    match as_char(c) {
        Some(ch) => !ch.is_alphanumeric() && !ch.is_whitespace() && !ch.is_control(),
        None => false,
    }
}

/// Control characters other than newline
pub fn is_control(c: u32) -> bool {
    c != NEWLINE && as_char(c).map_or(true, |ch| ch.is_control())
}

/// Fold a code point to lower case for case insensitive comparison
pub fn fold(c: u32) -> u32 {
    match as_char(c) {
        Some(ch) => ch.to_lowercase().next().map_or(c, |l| l as u32),
        None => c,
    }
}

/// Length of the run of identical code points starting at `cells[0]`
pub fn run_length(cells: &[u32]) -> usize {
    match cells.first() {
        Some(&first) => cells.iter().take_while(|&&c| c == first).count(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downshift() {
        assert_eq!(downshift('a' as u32), b'a');
        assert_eq!(downshift(0xe9), 0xe9); // é stays latin-1
        assert_eq!(downshift(0x2019), b'\'');
        assert_eq!(downshift(0x2014), b'-');
        assert_eq!(downshift(0x4e16), b'?'); // 世
        assert_eq!(downshift_exact(0x4e16), None);
    }

    #[test]
    fn test_classes() {
        assert!(is_word_char('x' as u32));
        assert!(is_word_char('7' as u32));
        assert!(is_word_char(0xf1)); // ñ
        assert!(!is_word_char('-' as u32));

        assert!(is_punct('$' as u32));
        assert!(is_punct(0x2014));
        assert!(!is_punct(' ' as u32));
        assert!(!is_punct(0x07));

        assert!(is_space(' ' as u32));
        assert!(is_space('\t' as u32));
        assert!(!is_space('\n' as u32));

        assert!(is_control(0x07));
        assert!(!is_control('\n' as u32));
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold('A' as u32), 'a' as u32);
        assert_eq!(fold(0xd1), 0xf1); // Ñ -> ñ
        assert_eq!(fold('3' as u32), '3' as u32);
    }

    #[test]
    fn test_run_length() {
        let cells: Vec<u32> = "-----x".chars().map(|c| c as u32).collect();
        assert_eq!(run_length(&cells), 5);
        assert_eq!(run_length(&[]), 0);
    }

    #[test]
    fn test_non_latin_best_effort() {
        // Greek and Cyrillic letters classify as word characters
        assert!(is_word_char('λ' as u32));
        assert!(is_word_char('ж' as u32));
        assert_eq!(fold('Ж' as u32), 'ж' as u32);
    }
}
