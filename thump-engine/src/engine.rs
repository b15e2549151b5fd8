//! Engine root: the control-side half of the engine and its whole public call surface.
//!
//! [`Engine`] is driven from one thread (UI loop, timer, FFI caller). It owns the sequencer
//! clock and the trigger dispatcher, and is the only writer of the parameter and sequence
//! stores. Its counterpart [`Renderer`] is moved to the audio thread. The two halves share
//! nothing but a lock-free command ring, a stop epoch and a handful of atomics, so nothing here can block
//! audio and nothing on the audio side can block a call here.
//!
//! ```text
//!   driver ── schedule() ──> SequencerClock ──> Dispatcher ──[ring]──> Renderer ──> out
//!        └── set_*() ──> ParameterStore / SequenceStore (ArcSwap snapshots)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::RingBuffer;

use crate::clock::SequencerClock;
use crate::command::StopEpoch;
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::mixer::ChannelLevels;
use crate::params::VoiceParameters;
use crate::pattern::Pattern;
use crate::renderer::Renderer;
use crate::reporter::{Monitor, StepReporter};
use crate::store::{ParameterStore, SequenceStore};
use crate::time::{FrameClock, TimeSource, WallClock};
use crate::voice::Voice;

/// Outcome of one `schedule()`/`advance()` call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Step boundaries crossed (all voices).
    pub boundaries: usize,
    /// Notes queued for the renderer.
    pub notes: usize,
    /// Boundaries left for the next call because the per-call cap was reached.
    pub deferred: bool,
}

pub struct Engine<T: TimeSource = WallClock> {
    config: EngineConfig,
    clock: SequencerClock,
    dispatcher: Dispatcher,
    params: Arc<ParameterStore>,
    sequences: Arc<SequenceStore>,
    steps: StepReporter,
    levels: ChannelLevels,
    running: Arc<AtomicBool>,
    tempo_bits: Arc<AtomicU64>,
    time: T,
    last_tick: Option<f64>,
}

impl Engine<WallClock> {
    /// Engine timed by the system's monotonic clock.
    pub fn new(config: EngineConfig) -> (Self, Renderer) {
        Self::with_time_source(config, WallClock::default())
    }
}

impl Engine<FrameClock> {
    /// Engine timed by the frames its renderer has produced. Musical time then follows the
    /// audio device exactly, and stands still while no audio is being rendered.
    pub fn with_frame_clock(config: EngineConfig) -> (Self, Renderer) {
        Self::assemble(config, Renderer::frame_clock)
    }
}

impl<T: TimeSource> Engine<T> {
    pub fn with_time_source(config: EngineConfig, time: T) -> (Self, Renderer) {
        Self::assemble(config, move |_| time)
    }

    fn assemble(config: EngineConfig, time: impl FnOnce(&Renderer) -> T) -> (Self, Renderer) {
        let config = config.normalized();
        let (tx, rx) = RingBuffer::new(config.command_capacity);
        let levels = ChannelLevels::new();
        let stop = StopEpoch::new();
        let renderer = Renderer::new(rx, levels.clone(), stop.clone(), config.sample_rate);
        let clock = SequencerClock::new(config.tempo_bpm, config.steps_per_beat);
        let tempo_bits = Arc::new(AtomicU64::new(clock.tempo().to_bits()));

        tracing::debug!(?config, "engine created");
        let engine = Self {
            config,
            clock,
            dispatcher: Dispatcher::new(tx, config.lookahead, stop),
            params: Arc::new(ParameterStore::new()),
            sequences: Arc::new(SequenceStore::new()),
            steps: StepReporter::new(),
            levels,
            running: Arc::new(AtomicBool::new(false)),
            tempo_bits,
            time: time(&renderer),
            last_tick: None,
        };
        (engine, renderer)
    }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }
    #[inline] pub fn time_source(&self) -> &T { &self.time }
    #[inline] pub fn is_running(&self) -> bool { self.clock.is_running() }

    /// Commands the renderer never got because its queue was full.
    #[inline] pub fn dropped_commands(&self) -> u64 { self.dispatcher.dropped() }

    // ----------------------------------- transport -----------------------------------

    /// Start playback from the head of every pattern. No-op while running.
    pub fn start(&mut self) {
        if !self.clock.start() {
            return;
        }
        self.last_tick = Some(self.time.now());
        self.publish_steps();
        self.running.store(true, Ordering::Release);
        tracing::info!(tempo = self.clock.tempo(), "transport started");
    }

    /// Stop playback, fade every note out and rewind. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.clock.stop() {
            return;
        }
        self.dispatcher.release_all();
        self.last_tick = None;
        self.publish_steps();
        self.running.store(false, Ordering::Release);
        tracing::info!("transport stopped");
    }

    /// Advance musical time by however much the time source moved since the previous call
    /// (or since `start`). No-op while stopped.
    pub fn schedule(&mut self) -> Tick {
        let Some(last) = self.last_tick else {
            return Tick::default();
        };
        let now = self.time.now();
        self.last_tick = Some(now.max(last));
        self.advance(now - last)
    }

    /// Advance musical time by `dt` seconds, for hosts that keep time themselves.
    pub fn advance(&mut self, dt: f64) -> Tick {
        let Self { config, clock, dispatcher, params, sequences, steps, .. } = self;
        let mut notes = 0;
        let report = clock.advance(
            dt,
            config.max_boundaries_per_tick,
            |voice| sequences.length(voice),
            |boundary| {
                let pattern = sequences.load(boundary.voice);
                if dispatcher.on_boundary(boundary, &pattern, params.get(boundary.voice)) {
                    notes += 1;
                }
            },
        );
        for voice in Voice::ALL {
            steps.publish(voice, clock.current_step(voice));
        }
        if report.deferred {
            tracing::warn!(
                dt,
                fired = report.boundaries,
                "step boundary budget exhausted, carrying the rest into the next tick"
            );
        }
        Tick { boundaries: report.boundaries, notes, deferred: report.deferred }
    }

    fn publish_steps(&self) {
        for voice in Voice::ALL {
            self.steps.publish(voice, self.clock.current_step(voice));
        }
    }

    // ----------------------------------- voices --------------------------------------

    /// Sound one note right away, outside the grid and regardless of the transport.
    pub fn play_voice_once(&mut self, voice: Voice, params: VoiceParameters) {
        self.dispatcher.play_now(voice, params);
    }

    /// [`play_voice_once`](Self::play_voice_once) with the voice's committed parameters.
    pub fn play_voice(&mut self, voice: Voice) {
        let params = self.params.get(voice);
        self.dispatcher.play_now(voice, params);
    }

    /// Replace a voice's parameters. Takes effect from the next note; sounding notes keep
    /// the parameters they started with.
    pub fn set_voice_parameters(&mut self, voice: Voice, params: VoiceParameters) {
        self.params.set(voice, params);
    }

    pub fn voice_parameters(&self, voice: Voice) -> VoiceParameters {
        self.params.get(voice)
    }

    /// Output level of a voice in [0, 1], applied to sounding notes with a short glide.
    pub fn set_channel_level(&mut self, voice: Voice, level: f32) -> f32 {
        self.levels.set(voice, level)
    }

    pub fn channel_level(&self, voice: Voice) -> f32 {
        self.levels.get(voice)
    }

    /// Delay every sequenced note of `voice` by up to a quarter second (swing, flams).
    pub fn set_nudge(&mut self, voice: Voice, seconds: f64) -> f64 {
        self.dispatcher.set_nudge(voice, seconds)
    }

    // ----------------------------------- patterns ------------------------------------

    /// Replace the step flags. Loop length and offset are kept.
    pub fn set_pattern(&mut self, voice: Voice, steps: &[bool]) {
        self.sequences.update(voice, |p| p.set_steps(steps));
    }

    /// Replace the whole pattern (flags, length, offset, locks).
    pub fn load_pattern(&mut self, voice: Voice, pattern: Pattern) {
        let length = pattern.length();
        self.sequences.replace(voice, pattern);
        self.fit_lane(voice, length);
    }

    pub fn set_pattern_length(&mut self, voice: Voice, n: usize) {
        let length = self.sequences.update(voice, |p| p.set_length(n)).length();
        self.fit_lane(voice, length);
    }

    pub fn set_offset(&mut self, voice: Voice, k: i64) {
        self.sequences.update(voice, |p| p.set_offset(k));
    }

    /// Pin parameters to one raw step position (`None` clears the lock).
    pub fn set_step_lock(&mut self, voice: Voice, position: usize, params: Option<VoiceParameters>) {
        self.sequences.update(voice, |p| p.set_lock(position, params));
    }

    pub fn pattern(&self, voice: Voice) -> Arc<Pattern> {
        self.sequences.load(voice)
    }

    fn fit_lane(&mut self, voice: Voice, length: usize) {
        let step = self.clock.fit_to_length(voice, length);
        self.steps.publish(voice, step);
    }

    // ----------------------------------- tempo / steps -------------------------------

    /// Shared tempo for every voice, clamped to [1, 999] BPM. Returns the tempo in effect.
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        let bpm = self.clock.set_tempo(bpm);
        self.tempo_bits.store(bpm.to_bits(), Ordering::Release);
        bpm
    }

    #[inline] pub fn tempo(&self) -> f64 { self.clock.tempo() }

    #[inline] pub fn step_duration(&self) -> f64 { self.clock.step_duration() }

    /// Last committed step index of `voice`, `0 <= step < length`.
    #[inline]
    pub fn step(&self, voice: Voice) -> usize {
        self.steps.get(voice)
    }

    /// Read-only handle for other threads.
    pub fn monitor(&self) -> Monitor {
        Monitor {
            steps: self.steps.clone(),
            params: Arc::clone(&self.params),
            sequences: Arc::clone(&self.sequences),
            running: Arc::clone(&self.running),
            tempo_bits: Arc::clone(&self.tempo_bits),
        }
    }
}
