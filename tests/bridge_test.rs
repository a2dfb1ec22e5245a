//! Bridge and session tests against a scripted kernel source and an
//! in-memory synthesizer link

use acsbridge::bridge::{Bridge, BridgeEvent};
use acsbridge::buffer::{ReadingBuffer, DEFAULT_CAPACITY};
use acsbridge::dict::PronunciationTable;
use acsbridge::event::{shift, EchoKind, KernelEvent, KernelSource, Keystroke, Output, ScreenSnapshot};
use acsbridge::input::{KeyAction, Keymap};
use acsbridge::mux::{EventMux, Ready};
use acsbridge::speech::{create_codec, FlowNotice, SynthChannel, SynthLink, SynthStyle};
use acsbridge::state::{Session, Settings};
use acsbridge::AcsError;
use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Hands out one queued batch per read
#[derive(Clone, Default)]
struct ScriptedKernel {
    batches: Arc<Mutex<VecDeque<Vec<KernelEvent>>>>,
    closed: Arc<AtomicBool>,
    captured: Arc<Mutex<Vec<(u16, u8)>>>,
}

impl ScriptedKernel {
    fn push(&self, batch: Vec<KernelEvent>) {
        self.batches.lock().unwrap().push_back(batch);
    }
}

impl KernelSource for ScriptedKernel {
    fn read_events(&mut self) -> acsbridge::Result<Vec<KernelEvent>> {
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn screen(&self) -> ScreenSnapshot {
        ScreenSnapshot::blank(80, 24)
    }

    fn raw_fds(&self) -> Vec<RawFd> {
        Vec::new()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn capture_keys(&mut self, chords: &[(u16, u8)]) {
        *self.captured.lock().unwrap() = chords.to_vec();
    }
}

#[derive(Clone, Default)]
struct Loopback {
    written: Arc<Mutex<Vec<u8>>>,
    incoming: Arc<Mutex<Vec<u8>>>,
    fail_writes: Arc<AtomicBool>,
}

impl Loopback {
    fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock().unwrap())
    }
}

impl SynthLink for Loopback {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
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

fn bridge() -> (Bridge, ScriptedKernel, Loopback) {
    bridge_with(DEFAULT_CAPACITY)
}

fn bridge_with(capacity: usize) -> (Bridge, ScriptedKernel, Loopback) {
    let kernel = ScriptedKernel::default();
    let link = Loopback::default();
    let channel = SynthChannel::new(Box::new(link.clone()), create_codec(SynthStyle::DoubleTalk));
    let bridge = Bridge::new(
        Box::new(kernel.clone()),
        ReadingBuffer::line(capacity),
        Some(channel),
        0,
        None,
        EventMux::with_select(false).unwrap(),
    )
    .unwrap();
    (bridge, kernel, link)
}

fn tty(text: &str) -> Vec<KernelEvent> {
    text.chars()
        .map(|c| KernelEvent::MoreOutput(Output::new(EchoKind::Output, c as u32)))
        .collect()
}

fn alt(c: char) -> KernelEvent {
    KernelEvent::Keystroke(Keystroke::new(c as u16, shift::LALT))
}

fn session(settings: Settings) -> Session {
    Session::new(settings, PronunciationTable::english(), Keymap::new())
}

/// Drain the kernel and let the session react to everything
fn run_kernel(bridge: &mut Bridge, session: &mut Session) -> Vec<BridgeEvent> {
    bridge.drain(Ready::KERNEL).unwrap();
    let events = bridge.take_events();
    for event in events.clone() {
        session.handle(bridge, event).unwrap();
    }
    events
}

#[test]
fn test_output_reaches_buffer_before_keys() {
    let (mut bridge, kernel, _link) = bridge();
    let mut batch = tty("hi");
    batch.push(alt('i'));
    kernel.push(batch);

    bridge.drain(Ready::KERNEL).unwrap();
    let events = bridge.take_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], BridgeEvent::MoreOutput(o) if o.ch == 'h' as u32));
    assert!(matches!(events[1], BridgeEvent::MoreOutput(o) if o.ch == 'i' as u32));
    assert!(matches!(events[2], BridgeEvent::Keystroke(k) if k.code == 'i' as u16));

    let buf = bridge.buffer();
    assert_eq!(buf.text(buf.start(), buf.end()), "hi");
}

#[test]
fn test_events_keep_arrival_order() {
    let (mut bridge, kernel, link) = bridge();
    let mut session = session(Settings::default());
    kernel.push(vec![
        alt('i'),
        KernelEvent::MoreOutput(Output::new(EchoKind::DirectEcho, 'x' as u32)),
    ]);

    bridge.drain(Ready::KERNEL).unwrap();
    let events = bridge.take_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], BridgeEvent::Keystroke(k) if k.code == 'i' as u16));
    assert!(matches!(events[1], BridgeEvent::MoreOutput(o) if o.echo == EchoKind::DirectEcho));

    // The key already sees the echoed text, and the echo is spoken after
    // the line it interrupts
    for event in events {
        session.handle(&mut bridge, event).unwrap();
    }
    assert_eq!(link.take_written(), b"\x18\x010Ix\r\x18x\r".to_vec());
}

#[test]
fn test_console_switch_discards_older_events() {
    let (mut bridge, kernel, _link) = bridge();
    kernel.push(vec![alt('u')]);
    bridge.drain(Ready::KERNEL).unwrap();

    let mut batch = tty("old");
    batch.push(alt('o'));
    batch.push(KernelEvent::ConsoleSwitch { console: 2 });
    batch.extend(tty("new"));
    kernel.push(batch);
    bridge.drain(Ready::KERNEL).unwrap();

    let events = bridge.take_events();
    assert_eq!(events[0], BridgeEvent::ConsoleSwitch(2));
    assert_eq!(events.len(), 4);
    assert!(!events.iter().any(|e| matches!(e, BridgeEvent::Keystroke(_))));
    assert_eq!(bridge.console(), 2);
    let buf = bridge.buffer();
    assert_eq!(buf.text(buf.start(), buf.end()), "new");
}

#[test]
fn test_kernel_closed_reported_once() {
    let (mut bridge, kernel, _link) = bridge();
    kernel.closed.store(true, Ordering::Relaxed);
    bridge.drain(Ready::KERNEL).unwrap();
    bridge.drain(Ready::KERNEL).unwrap();
    assert_eq!(bridge.take_events(), vec![BridgeEvent::KernelClosed]);
}

#[test]
fn test_failed_write_breaks_synth() {
    let (mut bridge, _kernel, link) = bridge();
    link.fail_writes.store(true, Ordering::Relaxed);
    assert!(matches!(bridge.say(b"hello"), Err(AcsError::ChannelBroken)));
    assert!(matches!(bridge.say(b"again"), Err(AcsError::ChannelBroken)));
    assert_eq!(bridge.take_events(), vec![BridgeEvent::SynthBroken]);
    assert!(bridge.channel().is_some_and(|c| c.is_broken()));

    // The session keeps going without speech
    let mut session = session(Settings::default());
    session
        .handle(&mut bridge, BridgeEvent::FifoMessage("say still here".to_string()))
        .unwrap();
}

#[test]
fn test_reopen_restores_speech() {
    let (mut bridge, _kernel, link) = bridge();
    link.fail_writes.store(true, Ordering::Relaxed);
    assert!(bridge.say(b"hello").is_err());
    bridge.take_events();

    let fresh = Loopback::default();
    bridge.reopen_synth(Box::new(fresh.clone())).unwrap();
    bridge.say(b"hello").unwrap();
    assert_eq!(fresh.take_written(), b"hello\r".to_vec());
}

#[test]
fn test_attach_captures_bound_keys() {
    let (mut bridge, kernel, _link) = bridge();
    let session = session(Settings::default());
    session.attach(&mut bridge);
    let captured = kernel.captured.lock().unwrap();
    assert!(captured.contains(&('i' as u16, shift::LALT)));
    assert!(captured.contains(&('u' as u16, shift::LALT | shift::SHIFT)));
}

#[test]
fn test_key_reads_current_line() {
    let (mut bridge, kernel, link) = bridge();
    let mut session = session(Settings::default());
    let mut batch = tty("hello world");
    batch.push(alt('i'));
    kernel.push(batch);

    run_kernel(&mut bridge, &mut session);
    // Speech stops before the line goes out
    assert_eq!(link.take_written(), b"\x18\x010Ihello \x011Iworld\r".to_vec());
    assert!(bridge.still_talking());
    assert_eq!(bridge.buffer().cursor(), Some(bridge.buffer().start()));
}

#[test]
fn test_typed_key_is_echoed() {
    let (mut bridge, kernel, link) = bridge();
    let mut session = session(Settings::default());
    kernel.push(vec![KernelEvent::MoreOutput(Output::new(EchoKind::DirectEcho, 'x' as u32))]);
    run_kernel(&mut bridge, &mut session);
    assert_eq!(link.take_written(), b"x\r".to_vec());

    let quiet = Settings {
        key_echo: false,
        ..Settings::default()
    };
    let mut session = self::session(quiet);
    kernel.push(vec![KernelEvent::MoreOutput(Output::new(EchoKind::DirectEcho, 'y' as u32))]);
    run_kernel(&mut bridge, &mut session);
    assert!(link.take_written().is_empty());
}

#[test]
fn test_fifo_commands() {
    let (mut bridge, _kernel, link) = bridge();
    let mut session = session(Settings::default());

    session
        .handle(&mut bridge, BridgeEvent::FifoMessage("say hello there".to_string()))
        .unwrap();
    assert_eq!(link.take_written(), b"\x18hello there\r".to_vec());

    session
        .handle(&mut bridge, BridgeEvent::FifoMessage("volume 9".to_string()))
        .unwrap();
    assert_eq!(link.take_written(), b"\x019V".to_vec());

    // Bad arguments and unknown commands are only logged
    session
        .handle(&mut bridge, BridgeEvent::FifoMessage("volume loud".to_string()))
        .unwrap();
    session
        .handle(&mut bridge, BridgeEvent::FifoMessage("dance".to_string()))
        .unwrap();
    assert!(link.take_written().is_empty());
}

#[test]
fn test_auto_read_follows_output() {
    let (mut bridge, kernel, link) = bridge();
    let mut session = session(Settings {
        auto_read: true,
        ..Settings::default()
    });
    kernel.push(tty("hello"));
    run_kernel(&mut bridge, &mut session);
    session.idle(&mut bridge).unwrap();

    assert_eq!(link.take_written(), b"\x010Ihello\r".to_vec());
    assert!(session.is_reading());
    assert!(bridge.still_talking());

    let start = bridge.buffer().start();
    link.incoming.lock().unwrap().push(0);
    bridge.drain(Ready::SYNTH).unwrap();
    let events = bridge.take_events();
    assert_eq!(
        events,
        vec![
            BridgeEvent::Speech(FlowNotice::Marker { id: 0, last: 0 }),
            BridgeEvent::Speech(FlowNotice::Done {
                resume: Some(start.offset(5))
            }),
        ]
    );
    for event in events {
        session.handle(&mut bridge, event).unwrap();
    }
    // The end of the buffer ends the reading
    assert!(!session.is_reading());
    assert!(!bridge.still_talking());
}

#[test]
fn test_overflow_during_reading_restarts_at_oldest_text() {
    let (mut bridge, kernel, link) = bridge_with(16);
    let mut session = session(Settings::default());
    kernel.push(tty("one two three"));
    run_kernel(&mut bridge, &mut session);
    let anchor = bridge.buffer().start();

    session.run(&mut bridge, KeyAction::ReadContinuous).unwrap();
    assert_eq!(
        link.take_written(),
        b"\x18\x010Ione \x011Itwo \x012Ithree\r".to_vec()
    );
    assert!(session.is_reading());

    // More output pushes the whole sentence out of the buffer
    kernel.push(tty("\nfour five six seven"));
    run_kernel(&mut bridge, &mut session);
    assert_eq!(bridge.buffer().start(), anchor.offset(17));
    assert!(link.take_written().is_empty());

    link.incoming.lock().unwrap().push(2);
    bridge.drain(Ready::SYNTH).unwrap();
    let events = bridge.take_events();
    assert_eq!(
        events.last(),
        Some(&BridgeEvent::Speech(FlowNotice::Done {
            resume: Some(anchor.offset(13))
        }))
    );
    for event in events {
        session.handle(&mut bridge, event).unwrap();
    }

    let written = link.take_written();
    assert!(written.starts_with(b"overflow\r"));
    assert!(written.ends_with(b"seven\r"));
    assert!(session.is_reading());
    assert!(bridge.still_talking());
}
