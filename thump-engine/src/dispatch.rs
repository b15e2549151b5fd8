//! Trigger dispatcher: turns step boundaries into note commands for the renderer.

use rtrb::Producer;

use crate::clock::Boundary;
use crate::command::{Command, StopEpoch, Trigger};
use crate::params::VoiceParameters;
use crate::pattern::Pattern;
use crate::voice::{Voice, VoiceTable};

/// Largest per-voice nudge (seconds).
pub const MAX_NUDGE_S: f64 = 0.25;

pub struct Dispatcher {
    tx: Producer<Command>,
    stop: StopEpoch,
    epoch: u64,
    lookahead: f64,
    nudge: VoiceTable<f64>,
    dropped: u64,
}

impl Dispatcher {
    pub fn new(tx: Producer<Command>, lookahead: f64, stop: StopEpoch) -> Self {
        Self {
            tx,
            epoch: stop.get(),
            stop,
            lookahead: if lookahead.is_finite() { lookahead.max(0.0) } else { 0.0 },
            nudge: VoiceTable::default(),
            dropped: 0,
        }
    }

    #[inline] pub fn dropped(&self) -> u64 { self.dropped }

    pub fn set_nudge(&mut self, voice: Voice, seconds: f64) -> f64 {
        let s = if seconds.is_finite() { seconds.clamp(0.0, MAX_NUDGE_S) } else { 0.0 };
        if s != seconds {
            tracing::debug!(%voice, seconds, clamped = s, "nudge clamped");
        }
        self.nudge[voice] = s;
        s
    }

    /// Dispatch one boundary. Rests send nothing. A hit carries the step lock if the step has
    /// one, otherwise `current` (the voice's committed parameters). Returns whether a note
    /// was queued.
    pub fn on_boundary(&mut self, boundary: Boundary, pattern: &Pattern, current: VoiceParameters) -> bool {
        let Some(lock) = pattern.hit(boundary.step) else {
            return false;
        };
        let delay = (self.lookahead + self.nudge[boundary.voice] - boundary.lateness).max(0.0);
        self.send(Trigger {
            voice: boundary.voice,
            params: lock.unwrap_or(current),
            delay: delay as f32,
        })
    }

    /// Start a note as soon as the renderer sees it, outside the grid.
    pub fn play_now(&mut self, voice: Voice, params: VoiceParameters) -> bool {
        self.send(Trigger { voice, params: params.sanitized(), delay: 0.0 })
    }

    /// Fade out every note sent so far, including ones still queued or waiting on their
    /// delay. Never blocked by a full queue.
    pub fn release_all(&mut self) {
        self.epoch = self.stop.bump();
    }

    fn send(&mut self, trigger: Trigger) -> bool {
        match self.tx.push(Command { trigger, epoch: self.epoch }) {
            Ok(()) => true,
            Err(_) => {
                self.dropped += 1;
                tracing::warn!(dropped = self.dropped, "render queue full, note dropped");
                false
            }
        }
    }
}
