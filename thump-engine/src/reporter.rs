//! Step reporter and the read-only monitor handed to UI threads.
//!
//! Everything here is a relaxed/acquire atomic load or an `ArcSwap` guard: safe to call at
//! display rate from any thread, never blocks the driver or the renderer.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::params::VoiceParameters;
use crate::pattern::Pattern;
use crate::store::{ParameterStore, SequenceStore};
use crate::voice::{Voice, VoiceTable};

/// Last committed step index per voice.
#[derive(Clone, Debug)]
pub struct StepReporter {
    steps: Arc<VoiceTable<AtomicUsize>>,
}

impl Default for StepReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepReporter {
    pub fn new() -> Self {
        Self { steps: Arc::new(VoiceTable::from_fn(|_| AtomicUsize::new(0))) }
    }

    #[inline]
    pub fn publish(&self, voice: Voice, step: usize) {
        self.steps[voice].store(step, Ordering::Release);
    }

    #[inline]
    pub fn get(&self, voice: Voice) -> usize {
        self.steps[voice].load(Ordering::Acquire)
    }
}

/// Cloneable, `Send + Sync` read-only view of a running engine.
#[derive(Clone)]
pub struct Monitor {
    pub(crate) steps: StepReporter,
    pub(crate) params: Arc<ParameterStore>,
    pub(crate) sequences: Arc<SequenceStore>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) tempo_bits: Arc<AtomicU64>,
}

impl Monitor {
    /// Current step index, `0 <= step < length`.
    #[inline]
    pub fn step(&self, voice: Voice) -> usize {
        self.steps.get(voice)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        f64::from_bits(self.tempo_bits.load(Ordering::Acquire))
    }

    pub fn voice_parameters(&self, voice: Voice) -> VoiceParameters {
        self.params.get(voice)
    }

    pub fn pattern(&self, voice: Voice) -> Arc<Pattern> {
        self.sequences.load(voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_published_steps() {
        let reporter = StepReporter::new();
        let reader = reporter.clone();
        reporter.publish(Voice::Snare, 5);
        assert_eq!(reader.get(Voice::Snare), 5);
        assert_eq!(reader.get(Voice::Kick), 0);
    }

    #[test]
    fn monitor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Monitor>();
    }
}
