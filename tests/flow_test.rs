//! Speech flow tests: markers out to the synthesizer and back again

use acsbridge::buffer::{Pos, ReadingBuffer, DEFAULT_CAPACITY};
use acsbridge::dict::PronunciationTable;
use acsbridge::event::{EchoKind, Output};
use acsbridge::sentence::{extract, GsFlags};
use acsbridge::speech::{
    create_codec, FlowNotice, SpeechFlow, SpeechRequest, SynthChannel, SynthEvent, SynthLink,
    SynthStyle,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex};

/// Records what is written and hands back bytes queued by the test
#[derive(Clone, Default)]
struct Loopback {
    written: Arc<Mutex<Vec<u8>>>,
    incoming: Arc<Mutex<Vec<u8>>>,
}

impl Loopback {
    fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    fn reply(&self, bytes: &[u8]) {
        self.incoming.lock().unwrap().extend_from_slice(bytes);
    }
}

impl SynthLink for Loopback {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut incoming = self.incoming.lock().unwrap();
        if incoming.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = incoming.len().min(buf.len());
        buf[..n].copy_from_slice(&incoming[..n]);
        incoming.drain(..n);
        Ok(n)
    }

    fn input_fd(&self) -> Option<RawFd> {
        None
    }

    fn describe(&self) -> String {
        "loopback".to_string()
    }
}

fn channel(style: SynthStyle) -> (SynthChannel, Loopback) {
    let link = Loopback::default();
    (SynthChannel::new(Box::new(link.clone()), create_codec(style)), link)
}

fn buffer_with(text: &str) -> (ReadingBuffer, Pos) {
    let out: Vec<Output> = text
        .chars()
        .map(|c| Output::new(EchoKind::Output, c as u32))
        .collect();
    let mut buf = ReadingBuffer::line(DEFAULT_CAPACITY);
    buf.refresh(&out, None);
    let start = buf.start();
    buf.set_cursor(Some(start));
    (buf, start)
}

/// Feed whatever the link has queued through the flow controller
fn pump(ch: &mut SynthChannel, flow: &mut SpeechFlow, buf: &mut ReadingBuffer) -> Vec<FlowNotice> {
    let mut notices = Vec::new();
    for event in ch.read_events().unwrap() {
        notices.extend(flow.on_event(buf, event));
    }
    notices
}

#[test]
fn test_markers_move_the_cursor() {
    let dict = PronunciationTable::english();
    let (mut buf, start) = buffer_with("hello world again");
    let (mut ch, link) = channel(SynthStyle::DoubleTalk);
    let mut flow = SpeechFlow::new(5);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    assert_eq!(chunk.offsets[6], 6);
    assert_eq!(chunk.offsets[12], 12);
    let consumed = flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    assert_eq!(consumed, 17);
    assert_eq!(link.written(), b"\x015Ihello \x016Iworld \x017Iagain\r".to_vec());
    assert!(flow.still_talking());
    assert_eq!(flow.state().outstanding.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);

    // Marker 5 was never reported; 6 still covers it
    link.reply(&[6]);
    let notices = pump(&mut ch, &mut flow, &mut buf);
    assert_eq!(notices, vec![FlowNotice::Marker { id: 6, last: 7 }]);
    assert_eq!(buf.cursor(), Some(start.offset(6)));
    assert_eq!(flow.state().outstanding.iter().copied().collect::<Vec<_>>(), vec![7]);
    assert_eq!(flow.state().last_marker_seen, Some(6));

    // A late 5 is stale
    link.reply(&[5]);
    assert!(pump(&mut ch, &mut flow, &mut buf).is_empty());
    assert_eq!(buf.cursor(), Some(start.offset(6)));

    link.reply(&[7]);
    let notices = pump(&mut ch, &mut flow, &mut buf);
    assert_eq!(
        notices,
        vec![
            FlowNotice::Marker { id: 7, last: 7 },
            FlowNotice::Done {
                resume: Some(start.offset(17))
            },
        ]
    );
    assert_eq!(buf.cursor(), Some(start.offset(12)));
    assert!(!flow.still_talking());
}

#[test]
fn test_chunk_cut_to_marker_budget() {
    let dict = PronunciationTable::english();
    let (buf, start) = buffer_with("a b c d e");
    let (mut ch, link) = channel(SynthStyle::DoubleTalk);
    let mut flow = SpeechFlow::new(97);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    let consumed = flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    assert_eq!(consumed, 6);
    assert_eq!(link.written(), b"\x0197Ia \x0198Ib \x0199Ic\r".to_vec());
    assert_eq!(
        flow.state().outstanding.iter().copied().collect::<Vec<_>>(),
        vec![97, 98, 99]
    );
}

#[test]
fn test_shutup_forgets_markers_in_flight() {
    let dict = PronunciationTable::english();
    let (mut buf, start) = buffer_with("hello world again");
    let (mut ch, link) = channel(SynthStyle::DoubleTalk);
    let mut flow = SpeechFlow::new(1);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    assert!(flow.still_talking());

    flow.shutup(&mut ch).unwrap();
    assert!(!flow.still_talking());
    assert!(flow.state().outstanding.is_empty());
    assert_eq!(link.written().last(), Some(&0x18));

    // The unit may still report a marker it had already reached
    link.reply(&[2]);
    assert!(pump(&mut ch, &mut flow, &mut buf).is_empty());
    assert_eq!(buf.cursor(), Some(start));
}

#[test]
fn test_generic_synth_has_no_markers() {
    let dict = PronunciationTable::english();
    let (buf, start) = buffer_with("hello world");
    let (mut ch, link) = channel(SynthStyle::Generic);
    let mut flow = SpeechFlow::new(0);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    let consumed = flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    assert_eq!(consumed, 11);
    assert_eq!(link.written(), b"hello world\r".to_vec());
    assert!(!flow.still_talking());
}

#[test]
fn test_snippet_leaves_talking_state_alone() {
    let dict = PronunciationTable::english();
    let (mut buf, start) = buffer_with("one two");
    let (mut ch, link) = channel(SynthStyle::DoubleTalk);
    let mut flow = SpeechFlow::new(0);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    flow.send(&mut ch, SpeechRequest::snippet(b"louder")).unwrap();
    assert!(flow.still_talking());
    assert!(link.written().ends_with(b"louder\r"));

    link.reply(&[1]);
    let notices = pump(&mut ch, &mut flow, &mut buf);
    assert!(matches!(notices.last(), Some(FlowNotice::Done { .. })));
    assert!(!flow.still_talking());
}

#[test]
fn test_status_while_idle_is_ignored() {
    let mut flow = SpeechFlow::new(0);
    let (mut buf, _) = buffer_with("x");
    let notices = flow.on_event(&mut buf, SynthEvent::TalkingStatus { talking: false });
    assert!(notices.is_empty());
    assert!(!flow.still_talking());
}

#[test]
fn test_status_byte_ends_utterance_once() {
    let dict = PronunciationTable::english();
    let (mut buf, start) = buffer_with("hello world again");
    let (mut ch, link) = channel(SynthStyle::DectalkInternal);
    let mut flow = SpeechFlow::new(0);

    let chunk = extract(&buf, 100, GsFlags::continuous(), &dict);
    flow.send(&mut ch, SpeechRequest::tracked(chunk, start)).unwrap();
    assert_eq!(flow.state().outstanding.len(), 3);

    // The card reaches the first word, then says it is done with two
    // markers still outstanding
    link.reply(&[0x01, 0, 0x02]);
    let notices = pump(&mut ch, &mut flow, &mut buf);
    assert_eq!(
        notices,
        vec![
            FlowNotice::Marker { id: 0, last: 2 },
            FlowNotice::Done {
                resume: Some(start.offset(17))
            },
        ]
    );
    assert!(!flow.still_talking());
    assert!(flow.state().outstanding.is_empty());

    // Nothing more is reported for that utterance
    link.reply(&[0x01, 2, 0x02]);
    assert!(pump(&mut ch, &mut flow, &mut buf).is_empty());
    assert_eq!(buf.cursor(), Some(start));
}
