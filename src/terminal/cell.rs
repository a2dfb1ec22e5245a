//! Terminal cell - represents a single character position on screen

/// Attribute of a normal character: light grey on black
pub const NORMAL_ATTRIB: u8 = 0x07;

/// A single character cell in the terminal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// The character displayed at this position
    pub data: char,

    /// Display attribute, VGA style: foreground in the low nibble with 0x08
    /// for bold, background in the high nibble
    pub attrib: u8,

    /// Whether this cell is the right half of a wide character (CJK, emoji).
    /// Continuation cells read as nothing.
    pub is_wide_continuation: bool,
}

impl Cell {
    /// Create a new empty cell
    pub fn new() -> Self {
        Self {
            data: ' ',
            attrib: NORMAL_ATTRIB,
            is_wide_continuation: false,
        }
    }

    /// Create a cell with specific character and attribute
    pub fn with_char(c: char, attrib: u8) -> Self {
        Self {
            data: c,
            attrib,
            is_wide_continuation: false,
        }
    }

    /// Create a wide character continuation cell
    pub fn wide_continuation(attrib: u8) -> Self {
        Self {
            data: '\0',
            attrib,
            is_wide_continuation: true,
        }
    }

    /// Reset cell to blank space
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell() {
        let cell = Cell::new();
        assert_eq!(cell.data, ' ');
        assert_eq!(cell.attrib, NORMAL_ATTRIB);
        assert!(!cell.is_wide_continuation);
    }

    #[test]
    fn test_clear() {
        let mut cell = Cell::wide_continuation(0x70);
        cell.clear();
        assert_eq!(cell, Cell::default());
    }
}
