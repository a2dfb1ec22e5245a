//! Speech flow control
//!
//! Tracks what the synthesizer is saying so the reading cursor can ride
//! along with the voice, and so the bridge knows when the unit is ready for
//! the next sentence.
//!
//! A sentence goes out with an index marker on every word. As the markers come
//! back the reading cursor moves to the word being spoken; when the last one
//! is back the unit is done and the next sentence may be sent. Short snippets
//! (a letter, a word, "louder") go out without markers and are assumed to be
//! spoken instantly. Holding down a key that reads the next letter can
//! therefore pile speech up in the unit's own buffer while `still_talking`
//! reports false.

use super::channel::SynthChannel;
use super::synth::{SynthEvent, MAX_MARKER};
use crate::buffer::{Pos, ReadingBuffer};
use crate::sentence::SentenceChunk;
use crate::Result;
use log::{debug, trace};
use std::collections::BTreeSet;

/// Something to say
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub chunk: SentenceChunk,
    /// Where the chunk was extracted. With an anchor the text is sent with
    /// markers and the cursor follows along; without one it is a snippet.
    pub anchor: Option<Pos>,
}

impl SpeechRequest {
    /// Text read from the buffer at `anchor`
    pub fn tracked(chunk: SentenceChunk, anchor: Pos) -> Self {
        Self {
            chunk,
            anchor: Some(anchor),
        }
    }

    /// A one-off message
    pub fn snippet(text: &[u8]) -> Self {
        Self {
            chunk: SentenceChunk {
                text: text.to_vec(),
                offsets: vec![0; text.len()],
                ..SentenceChunk::default()
            },
            anchor: None,
        }
    }
}

/// What the flow controller has to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowNotice {
    /// The unit reached marker `id`; `last` is the last marker of the utterance
    Marker { id: u8, last: u8 },
    /// The unit finished. Reading continues at `resume`, if it is still in
    /// the buffer.
    Done { resume: Option<Pos> },
}

/// Whether the synthesizer is speaking a tracked sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TalkingState {
    pub outstanding: BTreeSet<u8>,
    pub last_marker_seen: Option<u8>,
    pub still_talking: bool,
}

pub struct SpeechFlow {
    state: TalkingState,
    first_mark: u8,
    /// Marker id to buffer offset, for the utterance in flight
    markers: Vec<(u8, usize)>,
    anchor: Option<Pos>,
    consumed: usize,
}

impl SpeechFlow {
    pub fn new(first_mark: u8) -> Self {
        Self {
            state: TalkingState::default(),
            first_mark: first_mark.min(MAX_MARKER),
            markers: Vec::new(),
            anchor: None,
            consumed: 0,
        }
    }

    pub fn state(&self) -> &TalkingState {
        &self.state
    }

    pub fn still_talking(&self) -> bool {
        self.state.still_talking
    }

    /// Markers left for a single utterance
    fn marker_budget(&self) -> usize {
        (MAX_MARKER - self.first_mark) as usize + 1
    }

    /// Send a request. A tracked chunk with more tokens than markers is cut
    /// short; the returned `consumed` says how much of the buffer went out.
    pub fn send(&mut self, channel: &mut SynthChannel, mut req: SpeechRequest) -> Result<usize> {
        let Some(anchor) = req.anchor else {
            channel.say_string(&req.chunk.text)?;
            return Ok(req.chunk.consumed);
        };

        req.chunk.truncate_tokens(self.marker_budget());
        let chunk = req.chunk;
        let encoded = channel.say_with_markers(&chunk.text, &chunk.offsets, self.first_mark)?;

        self.state.outstanding = encoded.markers.iter().map(|&(id, _)| id).collect();
        self.state.last_marker_seen = None;
        self.state.still_talking = !self.state.outstanding.is_empty();
        self.markers = encoded.markers;
        self.anchor = Some(anchor);
        self.consumed = chunk.consumed;
        debug!(
            "Speaking {} bytes from {} with {} markers",
            chunk.text.len(),
            anchor,
            self.markers.len()
        );
        Ok(chunk.consumed)
    }

    fn resume(&self) -> Option<Pos> {
        self.anchor.map(|a| a.offset(self.consumed))
    }

    fn finish(&mut self) -> FlowNotice {
        self.state.outstanding.clear();
        self.state.still_talking = false;
        debug!("Done talking");
        FlowNotice::Done {
            resume: self.resume(),
        }
    }

    /// Apply one event from the synthesizer
    pub fn on_event(&mut self, buf: &mut ReadingBuffer, event: SynthEvent) -> Vec<FlowNotice> {
        let mut notices = Vec::new();
        match event {
            SynthEvent::Marker(id) => {
                if !self.state.outstanding.contains(&id) {
                    trace!("Ignoring stale marker {}", id);
                    return notices;
                }
                // Markers arrive in order, so anything before this one is spoken
                self.state.outstanding.retain(|&m| m > id);
                self.state.last_marker_seen = Some(id);

                let offset = self.markers.iter().find(|&&(m, _)| m == id).map(|&(_, off)| off);
                if let (Some(anchor), Some(offset)) = (self.anchor, offset) {
                    if !buf.set_cursor(Some(anchor.offset(offset))) {
                        debug!("Marker {} points at text that has scrolled away", id);
                    }
                }
                let last = self.markers.last().map_or(id, |&(m, _)| m);
                notices.push(FlowNotice::Marker { id, last });
                if self.state.outstanding.is_empty() {
                    notices.push(self.finish());
                }
            }
            SynthEvent::TalkingStatus { talking: false } => {
                if self.state.still_talking {
                    notices.push(self.finish());
                }
            }
            SynthEvent::TalkingStatus { talking: true } => trace!("Synthesizer reports talking"),
            SynthEvent::Opaque(b) => trace!("Synthesizer byte {:#04x}", b),
        }
        notices
    }

    /// Stop speech now. The markers still in flight will never come back.
    pub fn shutup(&mut self, channel: &mut SynthChannel) -> Result<()> {
        self.reset();
        channel.interrupt()
    }

    /// Forget the utterance in flight, as after reopening the channel
    pub fn reset(&mut self) {
        self.state = TalkingState::default();
        self.markers.clear();
        self.anchor = None;
        self.consumed = 0;
    }
}
