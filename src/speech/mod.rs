//! Speech output: synthesizer protocols, transports, and flow control

pub mod backends;
pub mod channel;
pub mod flow;
pub mod link;
pub mod synth;

pub use channel::{SettingOutcome, StartValues, SynthChannel};
pub use flow::{FlowNotice, SpeechFlow, SpeechRequest, TalkingState};
pub use link::{open_link, LinkConfig, SynthLink};
pub use synth::{create_codec, Encoded, Setting, SynthCodec, SynthEvent, SynthStyle, MAX_MARKER};
