//! Thump Engine: drum voices driven by a tempo-locked step sequencer.
//!
//! Crate layout:
//! - [`voice`]    : the closed voice set (`Kick`, `Snare`) and `VoiceTable<T>`
//! - [`params`]   : `VoiceParameters`, `Waveform`, clamping
//! - [`pattern`]  : step flags with length, offset and per-step parameter locks
//! - [`store`]    : `ArcSwap` snapshot stores for parameters and patterns
//! - [`clock`]    : transport and per-voice step counters advanced by elapsed time
//! - [`dispatch`] : step boundaries to note commands
//! - [`nodes`]    : oscillator and noise building blocks
//! - [`synth`]    : one sounding note (`VoiceInstance`)
//! - [`mixer`]    : per-voice instance pools, channel levels, soft clip
//! - [`renderer`] : the audio-thread half, implements [`Generator`]
//! - [`graph`]    : `Generator` trait and the `Output<G>` wrapper used by audio callbacks
//! - [`engine`]   : the control-thread half and the public call surface
//!
//! [`Engine::new`] returns the two halves. Keep the [`Engine`] on the thread that handles
//! user input and calls `schedule()`; move the [`Renderer`] into the audio callback. The
//! render path never allocates and never takes a lock.

pub mod clock;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod mixer;
pub mod nodes;
pub mod params;
pub mod pattern;
pub mod renderer;
pub mod reporter;
pub mod store;
pub mod synth;
pub mod time;
pub mod voice;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use config::EngineConfig;
pub use engine::{Engine, Tick};
pub use error::ParseError;
pub use graph::{Generator, Output};
pub use params::{VoiceParameters, Waveform};
pub use pattern::{Pattern, MAX_STEPS};
pub use renderer::Renderer;
pub use reporter::Monitor;
pub use time::{FrameClock, ManualClock, TimeSource, WallClock};
pub use voice::{Voice, VoiceTable, VOICE_COUNT};
