//! Phonetic alphabet for the say-character-phonetically command

const ALPHABET: [&str; 26] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
    "juliet", "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo",
    "sierra", "tango", "uniform", "victor", "whiskey", "x ray", "yankee", "zulu",
];

/// The phonetic word for an ASCII letter, either case
pub fn phonetic(c: u32) -> Option<&'static str> {
    let c = char::from_u32(c)?.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        Some(ALPHABET[(c as u8 - b'a') as usize])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phonetic() {
        assert_eq!(phonetic('a' as u32), Some("alpha"));
        assert_eq!(phonetic('X' as u32), Some("x ray"));
        assert_eq!(phonetic('5' as u32), None);
        assert_eq!(phonetic(0xe9), None);
    }
}
