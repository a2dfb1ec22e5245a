//! The bridge between the kernel, the reading buffer and the synthesizer
//!
//! `Bridge` owns every piece of live state and the multiplexer that drives
//! it. Each call to `poll_events` waits once, drains whatever became ready,
//! and hands back what happened as an ordered list of `BridgeEvent`s. The
//! reading buffer is already up to date when a keystroke comes out of the
//! list, so a command always reads current text.

use crate::buffer::{BufferMode, ReadingBuffer};
use crate::dict::Dictionaries;
use crate::event::{KernelEvent, KernelSource, Keystroke, Output};
use crate::fifo::Fifo;
use crate::mux::{EventMux, Ready};
use crate::speech::{
    FlowNotice, Setting, SettingOutcome, SpeechFlow, SpeechRequest, SynthChannel, SynthLink,
};
use crate::{AcsError, Result};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::time::Duration;

/// Something the adapter should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A captured key. The buffer already holds all output from the same
    /// batch when it is delivered.
    Keystroke(Keystroke),
    /// One code point of output reached the buffer
    MoreOutput(Output),
    /// The foreground console changed; the buffer was reset
    ConsoleSwitch(u8),
    /// The synthesizer reached a marker or finished
    Speech(FlowNotice),
    /// A line from the message FIFO
    FifoMessage(String),
    /// Speech output is gone until the synthesizer is reopened
    SynthBroken,
    /// The kernel source has shut down
    KernelClosed,
}

pub struct Bridge {
    kernel: Box<dyn KernelSource>,
    buffer: ReadingBuffer,
    channel: Option<SynthChannel>,
    flow: SpeechFlow,
    fifo: Option<Fifo>,
    mux: EventMux,
    queue: VecDeque<BridgeEvent>,
    console: u8,
    broken_reported: bool,
    closed_reported: bool,
}

impl Bridge {
    /// Assemble the bridge and start watching every source
    pub fn new(
        kernel: Box<dyn KernelSource>,
        buffer: ReadingBuffer,
        channel: Option<SynthChannel>,
        first_mark: u8,
        fifo: Option<Fifo>,
        mut mux: EventMux,
    ) -> Result<Self> {
        mux.watch_kernel(&kernel.raw_fds())?;
        mux.watch_synth(channel.as_ref().and_then(|c| c.input_fd()))?;
        mux.watch_fifo(fifo.as_ref().map(|f| f.raw_fd()))?;
        let console = kernel.console();
        Ok(Self {
            kernel,
            buffer,
            broken_reported: channel.is_none(),
            channel,
            flow: SpeechFlow::new(first_mark),
            fifo,
            mux,
            queue: VecDeque::new(),
            console,
            closed_reported: false,
        })
    }

    /// Wait for something to happen and return what did
    pub fn poll_events(&mut self, timeout: Option<Duration>) -> Result<Vec<BridgeEvent>> {
        let ready = self.mux.wait(timeout)?;
        self.drain(ready)?;
        Ok(self.take_events())
    }

    /// Drain every source in `ready`, queueing the events they produce
    pub fn drain(&mut self, ready: Ready) -> Result<()> {
        if ready.contains(Ready::KERNEL) {
            self.drain_kernel()?;
        }
        if ready.contains(Ready::SYNTH) {
            self.drain_synth();
        }
        if ready.contains(Ready::FIFO) {
            self.drain_fifo()?;
        }
        Ok(())
    }

    /// Events queued so far, oldest first
    pub fn take_events(&mut self) -> Vec<BridgeEvent> {
        self.queue.drain(..).collect()
    }

    fn drain_kernel(&mut self) -> Result<()> {
        let mut events = self.kernel.read_events()?;
        trace!("{} kernel event(s)", events.len());

        // Anything before the last switch belongs to a console we left
        let last_switch = events.iter().rposition(|e| matches!(e, KernelEvent::ConsoleSwitch { .. }));
        if let Some(i) = last_switch {
            if let KernelEvent::ConsoleSwitch { console } = events[i] {
                self.switch_console(console);
            }
            events.drain(..=i);
        }

        // The whole batch reaches the buffer first so every key reads
        // current text; the events themselves keep their arrival order
        let output: Vec<Output> = events
            .iter()
            .filter_map(|e| match e {
                KernelEvent::MoreOutput(out) => Some(*out),
                _ => None,
            })
            .collect();
        let snapshot = (self.buffer.mode() == BufferMode::Screen).then(|| self.kernel.screen());
        self.buffer.refresh(&output, snapshot.as_ref());
        for event in events {
            match event {
                KernelEvent::MoreOutput(out) => self.queue.push_back(BridgeEvent::MoreOutput(out)),
                KernelEvent::Keystroke(key) => self.queue.push_back(BridgeEvent::Keystroke(key)),
                KernelEvent::ConsoleSwitch { .. } => {}
            }
        }

        if self.kernel.is_closed() && !self.closed_reported {
            info!("Kernel source closed");
            self.closed_reported = true;
            self.queue.push_back(BridgeEvent::KernelClosed);
        }
        Ok(())
    }

    fn switch_console(&mut self, console: u8) {
        info!("Console switch {} -> {}", self.console, console);
        self.console = console;
        self.buffer.reset();
        self.queue.retain(|e| !matches!(e, BridgeEvent::Keystroke(_)));
        self.queue.push_back(BridgeEvent::ConsoleSwitch(console));
    }

    fn drain_synth(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        let events = match channel.read_events() {
            Ok(events) => events,
            Err(e) => {
                warn!("Synthesizer read failed: {}", e);
                Vec::new()
            }
        };
        for event in events {
            for notice in self.flow.on_event(&mut self.buffer, event) {
                self.queue.push_back(BridgeEvent::Speech(notice));
            }
        }
        if channel.is_broken() {
            self.report_broken();
        }
    }

    fn drain_fifo(&mut self) -> Result<()> {
        let Some(fifo) = self.fifo.as_mut() else {
            return Ok(());
        };
        for message in fifo.read_messages()? {
            self.queue.push_back(BridgeEvent::FifoMessage(message));
        }
        Ok(())
    }

    fn report_broken(&mut self) {
        if self.broken_reported {
            return;
        }
        warn!("Synthesizer channel is broken");
        self.broken_reported = true;
        self.flow.reset();
        if let Err(e) = self.mux.watch_synth(None) {
            debug!("Unwatching synthesizer: {}", e);
        }
        self.queue.push_back(BridgeEvent::SynthBroken);
    }

    fn note<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(AcsError::ChannelBroken)) {
            self.report_broken();
        }
        result
    }

    /// Send text to the synthesizer, returning the buffer cells it covers
    pub fn speak(&mut self, req: SpeechRequest) -> Result<usize> {
        let result = match self.channel.as_mut() {
            Some(channel) => self.flow.send(channel, req),
            None => Err(AcsError::ChannelBroken),
        };
        self.note(result)
    }

    /// Say a short message that does not track the cursor
    pub fn say(&mut self, text: &[u8]) -> Result<()> {
        self.speak(SpeechRequest::snippet(text)).map(|_| ())
    }

    /// Say one character, by name where it has one
    pub fn say_char(&mut self, c: u32, dict: &dyn Dictionaries) -> Result<()> {
        let result = match self.channel.as_mut() {
            Some(channel) => channel.say_char(c, dict),
            None => Err(AcsError::ChannelBroken),
        };
        self.note(result)
    }

    /// Stop speech immediately
    pub fn shutup(&mut self) -> Result<()> {
        let result = match self.channel.as_mut() {
            Some(channel) => self.flow.shutup(channel),
            None => {
                self.flow.reset();
                Err(AcsError::ChannelBroken)
            }
        };
        self.note(result)
    }

    /// Set a voice parameter, or step it up or down a level when `level`
    /// is `None`
    pub fn change_setting(
        &mut self,
        setting: Setting,
        level: Option<i32>,
        up: bool,
    ) -> Result<SettingOutcome> {
        let result = match (self.channel.as_mut(), level) {
            (Some(channel), Some(level)) => channel.set(setting, level),
            (Some(channel), None) => channel.adjust(setting, up),
            (None, _) => Err(AcsError::ChannelBroken),
        };
        self.note(result)
    }

    /// Switch hardware flow control on the synthesizer line
    pub fn set_flow_control(&mut self, hardware: bool) -> Result<()> {
        let result = match self.channel.as_mut() {
            Some(channel) => channel.set_flow_control(hardware),
            None => Err(AcsError::ChannelBroken),
        };
        self.note(result)
    }

    /// Put a new link under the channel and start listening to it again
    pub fn reopen_synth(&mut self, link: Box<dyn SynthLink>) -> Result<()> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(AcsError::Synth("no synthesizer configured".to_string()));
        };
        channel.reopen(link);
        let fd = channel.input_fd();
        self.flow.reset();
        self.mux.watch_synth(fd)?;
        self.broken_reported = false;
        Ok(())
    }

    pub fn still_talking(&self) -> bool {
        self.flow.still_talking()
    }

    pub fn flow(&self) -> &SpeechFlow {
        &self.flow
    }

    pub fn buffer(&self) -> &ReadingBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ReadingBuffer {
        &mut self.buffer
    }

    /// Switch between line and screen mode, loading the screen right away
    pub fn set_mode(&mut self, mode: BufferMode) {
        self.buffer.set_mode(mode);
        if mode == BufferMode::Screen {
            let snapshot = self.kernel.screen();
            self.buffer.refresh(&[], Some(&snapshot));
        }
    }

    pub fn channel(&self) -> Option<&SynthChannel> {
        self.channel.as_ref()
    }

    pub fn channel_mut(&mut self) -> Option<&mut SynthChannel> {
        self.channel.as_mut()
    }

    pub fn kernel_mut(&mut self) -> &mut dyn KernelSource {
        self.kernel.as_mut()
    }

    pub fn console(&self) -> u8 {
        self.console
    }
}
