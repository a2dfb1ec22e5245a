//! Reading pipeline tests: tty output into the buffer, chunks out of it

use acsbridge::buffer::{ReadingBuffer, DEFAULT_CAPACITY};
use acsbridge::dict::PronunciationTable;
use acsbridge::event::{EchoKind, Output};
use acsbridge::sentence::{extract, pronounce, GsFlags};

fn tty(text: &str) -> Vec<Output> {
    text.chars()
        .map(|c| Output::new(EchoKind::Output, c as u32))
        .collect()
}

fn buffer_with(text: &str) -> ReadingBuffer {
    let mut buf = ReadingBuffer::line(DEFAULT_CAPACITY);
    buf.refresh(&tty(text), None);
    buf.set_cursor(Some(buf.start()));
    buf
}

#[test]
fn test_colored_output_reads_as_text() {
    let dict = PronunciationTable::english();
    let mut buf = buffer_with("\x1b[1;32mls\x1b[0m\r\nfile.txt  notes\r\n");
    assert_eq!(buf.text(buf.start(), buf.end()), "ls\nfile.txt  notes\n");

    let first = extract(&buf, 100, GsFlags::line(), &dict);
    assert_eq!(first.to_string_lossy(), "ls");
    assert_eq!(first.consumed, 3);

    let next = buf.start().offset(first.consumed);
    buf.set_cursor(Some(next));
    let second = extract(&buf, 100, GsFlags::line(), &dict);
    assert_eq!(second.to_string_lossy(), "file.txt notes");
}

#[test]
fn test_reading_walks_the_whole_buffer() {
    let dict = PronunciationTable::english();
    let text = "the quick brown fox jumps over the lazy dog";
    let mut buf = buffer_with(text);

    let mut words = Vec::new();
    let mut chunks = 0;
    while let Some(anchor) = buf.cursor() {
        let chunk = extract(&buf, 12, GsFlags::continuous(), &dict);
        if chunk.consumed == 0 {
            break;
        }
        assert!(chunk.text.len() < 12);
        words.extend(chunk.to_string_lossy().split_whitespace().map(str::to_string));
        chunks += 1;
        buf.set_cursor(Some(anchor.offset(chunk.consumed)));
    }

    let expected: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    assert_eq!(words, expected);
    assert!(chunks > 3);
}

#[test]
fn test_eviction_nulls_cursor_and_marks() {
    let dict = PronunciationTable::english();
    let mut buf = ReadingBuffer::line(16);
    buf.refresh(&tty("0123456789abcdef"), None);
    let start = buf.start();
    assert!(buf.set_cursor(Some(start.offset(2))));
    assert!(buf.set_mark(0, Some(start.offset(10))));
    assert!(buf.set_mark(1, Some(start.offset(3))));

    buf.refresh(&tty("ghijk"), None);
    assert_eq!(buf.len(), 16);
    assert_eq!(buf.start(), start.offset(5));
    assert_eq!(buf.cursor(), None);
    assert_eq!(buf.mark(0), Some(start.offset(10)));
    assert_eq!(buf.mark(1), None);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    assert!(chunk.is_empty());
    assert_eq!(chunk.consumed, 0);
}

#[test]
fn test_price_of_dollars() {
    let dict = PronunciationTable::english();
    let mut buf = buffer_with("price: $$$$$$$$ today");

    let word = extract(&buf, 60, GsFlags::word(), &dict);
    assert_eq!(word.to_string_lossy(), "price");

    buf.set_cursor(Some(buf.start().offset(7)));
    let word = extract(&buf, 60, GsFlags::word(), &dict);
    assert_eq!(word.consumed, 9);
    assert_eq!(pronounce(&word, &dict).to_string_lossy(), "dollar length 8");

    buf.set_cursor(Some(buf.start()));
    let line = extract(&buf, 100, GsFlags::line(), &dict);
    let spoken = pronounce(&line, &dict);
    assert_eq!(spoken.to_string_lossy(), "price: dollar length 8 today");
}
