//! Messages from the control side to the render side.
//!
//! Commands are plain `Copy` values so pushing one into the ring never allocates and popping
//! one on the audio thread never frees. Stopping does not travel through the ring: it bumps
//! a shared [`StopEpoch`], which a full ring cannot hold back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::params::VoiceParameters;
use crate::voice::Voice;

/// Start one note.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Trigger {
    pub voice: Voice,
    /// Parameter snapshot taken at dispatch time; the note keeps it for its whole life.
    pub params: VoiceParameters,
    /// Seconds to wait, counted in rendered frames from the moment the command is received.
    pub delay: f32,
}

/// One ring entry: a trigger stamped with the stop epoch it was dispatched under.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Command {
    pub trigger: Trigger,
    pub epoch: u64,
}

/// Counter bumped by every `stop()`. The renderer fades out every note made under an older
/// value and discards triggers from before the stop that were still queued.
#[derive(Clone, Debug, Default)]
pub struct StopEpoch(Arc<AtomicU64>);

impl StopEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Returns the new epoch.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}
