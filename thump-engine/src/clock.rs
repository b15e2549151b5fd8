//! Sequencer clock: transport state and per-voice step counters driven by elapsed time.
//!
//! The clock never looks at a wall clock itself. Callers hand it a delta (seconds since the
//! previous tick) and it walks every step boundary that delta crosses, in time order, handing
//! each one to a callback. How often it is ticked changes nothing about where boundaries fall.
//!
//! Per-voice lane state:
//!
//! ```text
//!   current   loop index the next boundary will play
//!   elapsed   time accumulated since the previous boundary
//! ```
//!
//! A boundary fires when `elapsed` reaches one step duration. It plays `current`, moves
//! `current` to the next loop index and keeps the overshoot as `elapsed`, so no time is lost
//! between ticks.

use crate::voice::{Voice, VoiceTable};

/// Slowest accepted tempo.
pub const MIN_TEMPO_BPM: f64 = 1.0;
/// Fastest accepted tempo.
pub const MAX_TEMPO_BPM: f64 = 999.0;

// Absorbs rounding when a delta is meant to land exactly on a boundary.
const BOUNDARY_EPS: f64 = 1.0e-9;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Running,
}

/// A crossed step boundary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Boundary {
    pub voice: Voice,
    /// Loop index being played.
    pub step: usize,
    /// How long before the end of the current tick the boundary actually happened (seconds).
    pub lateness: f64,
}

/// What one `advance` call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Advance {
    pub boundaries: usize,
    /// The boundary budget ran out; the remaining time is carried into the next tick.
    pub deferred: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Lane {
    current: usize,
    elapsed: f64,
}

#[derive(Clone, Debug)]
pub struct SequencerClock {
    transport: Transport,
    tempo_bpm: f64,
    steps_per_beat: u32,
    lanes: VoiceTable<Lane>,
}

impl SequencerClock {
    pub fn new(tempo_bpm: f64, steps_per_beat: u32) -> Self {
        let mut clock = Self {
            transport: Transport::Stopped,
            tempo_bpm: 120.0,
            steps_per_beat: steps_per_beat.max(1),
            lanes: VoiceTable::default(),
        };
        clock.set_tempo(tempo_bpm);
        clock
    }

    #[inline] pub fn transport(&self) -> Transport { self.transport }
    #[inline] pub fn is_running(&self) -> bool { self.transport == Transport::Running }
    #[inline] pub fn tempo(&self) -> f64 { self.tempo_bpm }
    #[inline] pub fn steps_per_beat(&self) -> u32 { self.steps_per_beat }

    /// Seconds per step at the current tempo.
    #[inline]
    pub fn step_duration(&self) -> f64 {
        60.0 / self.tempo_bpm / f64::from(self.steps_per_beat)
    }

    #[inline]
    pub fn current_step(&self, voice: Voice) -> usize {
        self.lanes[voice].current
    }

    /// `Stopped -> Running`, restarting every lane from the pattern head.
    /// Returns `false` (and changes nothing) when already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.rewind();
        self.transport = Transport::Running;
        true
    }

    /// `Running -> Stopped`. Lanes are rewound too so the reported position returns to the
    /// head. Returns `false` when already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.transport = Transport::Stopped;
        self.rewind();
        true
    }

    fn rewind(&mut self) {
        for (_, lane) in self.lanes.iter_mut() {
            *lane = Lane::default();
        }
    }

    /// Clamp to `[MIN_TEMPO_BPM, MAX_TEMPO_BPM]`; non-finite values are ignored.
    ///
    /// Time already accumulated inside the current step is kept as is: the new duration only
    /// governs what is left of it.
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        if !bpm.is_finite() {
            tracing::debug!(bpm, "non-finite tempo ignored");
            return self.tempo_bpm;
        }
        let clamped = bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
        if clamped != bpm {
            tracing::debug!(bpm, clamped, "tempo clamped");
        }
        self.tempo_bpm = clamped;
        clamped
    }

    /// Pull a lane back inside a (possibly shorter) loop. Returns the lane's step afterwards.
    pub fn fit_to_length(&mut self, voice: Voice, length: usize) -> usize {
        let lane = &mut self.lanes[voice];
        if lane.current >= length.max(1) {
            lane.current = 0;
        }
        lane.current
    }

    /// Accumulate `dt` seconds on every lane and fire each crossed boundary in time order,
    /// at most `budget` of them. A no-op while stopped.
    ///
    /// `length_of` is asked for a voice's loop length at each of its boundaries, so length
    /// edits made between ticks are honored from the next boundary on.
    pub fn advance(
        &mut self,
        dt: f64,
        budget: usize,
        mut length_of: impl FnMut(Voice) -> usize,
        mut on_boundary: impl FnMut(Boundary),
    ) -> Advance {
        let mut report = Advance::default();
        if !self.is_running() {
            return report;
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        for (_, lane) in self.lanes.iter_mut() {
            lane.elapsed += dt;
        }

        let dur = self.step_duration();
        loop {
            // The lane holding the most time crossed its boundary earliest.
            let due = self
                .lanes
                .iter()
                .filter(|(_, lane)| lane.elapsed + BOUNDARY_EPS >= dur)
                .fold(None::<(Voice, f64)>, |best, (voice, lane)| match best {
                    Some((_, e)) if e >= lane.elapsed => best,
                    _ => Some((voice, lane.elapsed)),
                });
            let Some((voice, _)) = due else { break };

            if report.boundaries >= budget {
                report.deferred = true;
                break;
            }

            let length = length_of(voice).max(1);
            let lane = &mut self.lanes[voice];
            let step = lane.current % length;
            lane.elapsed = (lane.elapsed - dur).max(0.0);
            lane.current = (step + 1) % length;
            report.boundaries += 1;
            on_boundary(Boundary { voice, step, lateness: lane.elapsed });
        }
        report
    }
}
