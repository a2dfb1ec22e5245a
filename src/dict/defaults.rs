//! Default English pronunciations for punctuation and symbols

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Punctuation names, keyed by code point.
///
/// ASCII marks plus the printable Latin-1 symbols and a handful of common
/// high code points that have no ASCII equivalent.
pub static PUNCTUATION: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(0x07, "bell");
    m.insert(0x09, "tab");
    m.insert(0x0a, "newline");
    m.insert(0x0d, "return");
    m.insert(0x1b, "escape");
    m.insert(0x20, "space");
    m.insert(0x21, "bang");
    m.insert(0x22, "quote");
    m.insert(0x23, "pound");
    m.insert(0x24, "dollar");
    m.insert(0x25, "percent");
    m.insert(0x26, "and");
    m.insert(0x27, "apostrophe");
    m.insert(0x28, "left paren");
    m.insert(0x29, "right paren");
    m.insert(0x2a, "star");
    m.insert(0x2b, "plus");
    m.insert(0x2c, "comma");
    m.insert(0x2d, "dash");
    m.insert(0x2e, "period");
    m.insert(0x2f, "slash");
    m.insert(0x3a, "colon");
    m.insert(0x3b, "semmycolon");
    m.insert(0x3c, "less than");
    m.insert(0x3d, "equals");
    m.insert(0x3e, "greater than");
    m.insert(0x3f, "question mark");
    m.insert(0x40, "at sign");
    m.insert(0x5b, "left bracket");
    m.insert(0x5c, "backslash");
    m.insert(0x5d, "right bracket");
    m.insert(0x5e, "up arrow");
    m.insert(0x5f, "underscore");
    m.insert(0x60, "backquote");
    m.insert(0x7b, "left brace");
    m.insert(0x7c, "pipe");
    m.insert(0x7d, "right brace");
    m.insert(0x7e, "tilde");
    m.insert(0xa1, "inverted bang");
    m.insert(0xa2, "cents");
    m.insert(0xa3, "pounds");
    m.insert(0xa5, "yen");
    m.insert(0xa7, "section");
    m.insert(0xa9, "copyright");
    m.insert(0xab, "left double angle");
    m.insert(0xae, "registered");
    m.insert(0xb0, "degrees");
    m.insert(0xb1, "plus or minus");
    m.insert(0xb5, "micro");
    m.insert(0xb6, "paragraph");
    m.insert(0xb7, "middle dot");
    m.insert(0xbb, "right double angle");
    m.insert(0xbc, "one fourth");
    m.insert(0xbd, "one half");
    m.insert(0xbe, "three fourths");
    m.insert(0xbf, "inverted question mark");
    m.insert(0xd7, "times");
    m.insert(0xf7, "divided by");
    m.insert(0x2026, "dot dot dot");
    m.insert(0x20ac, "euro");
    m.insert(0x2122, "trademark");
    m.insert(0x2190, "left arrow");
    m.insert(0x2191, "up arrow");
    m.insert(0x2192, "right arrow");
    m.insert(0x2193, "down arrow");
    m.insert(0x221e, "infinity");
    m.insert(0x2260, "not equal");
    m.insert(0x2264, "less than or equal");
    m.insert(0x2265, "greater than or equal");
    m.insert(0x2713, "check mark");
    m
});
