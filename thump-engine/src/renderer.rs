//! Audio-thread half of the engine.
//!
//! The renderer pulls commands from the lock-free ring, feeds them to the mixer and produces
//! mono samples. Its per-frame path never locks, never allocates and never blocks; it also
//! publishes its position after every frame, which is what [`FrameClock`] reads.

use std::sync::Arc;

use rtrb::Consumer;

use crate::command::{Command, StopEpoch};
use crate::graph::Generator;
use crate::mixer::{ChannelLevels, Mixer};
use crate::time::{AudioPosition, FrameClock};
use crate::voice::Voice;

/// Frames between two looks at the command ring when pulled sample by sample.
pub const CONTROL_BLOCK: usize = 32;

pub struct Renderer {
    rx: Consumer<Command>,
    mixer: Mixer,
    stop: StopEpoch,
    epoch: u64,
    position: Arc<AudioPosition>,
    rendered: u64,
    // start of the current sample-rate segment
    segment_frames: u64,
    segment_seconds: f64,
    countdown: usize,
}

impl Renderer {
    pub(crate) fn new(rx: Consumer<Command>, levels: ChannelLevels, stop: StopEpoch, sr: f32) -> Self {
        Self {
            rx,
            mixer: Mixer::new(levels, sr),
            epoch: stop.get(),
            stop,
            position: Arc::new(AudioPosition::default()),
            rendered: 0,
            segment_frames: 0,
            segment_seconds: 0.0,
            countdown: 0,
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.mixer.sample_rate() }
    #[inline] pub fn frames_rendered(&self) -> u64 { self.rendered }

    /// Clock that follows this renderer's output.
    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(Arc::clone(&self.position))
    }

    /// Audio time rendered so far, in seconds, across any sample rate changes.
    pub fn seconds_rendered(&self) -> f64 {
        let frames = self.rendered - self.segment_frames;
        self.segment_seconds + frames as f64 / f64::from(self.mixer.sample_rate())
    }

    /// Notes of `voice` held right now (pending, sounding or fading).
    pub fn live_instances(&self, voice: Voice) -> usize {
        self.mixer.live(voice)
    }

    /// Notes pushed out because a voice's pool was full.
    pub fn stolen(&self) -> u64 {
        self.mixer.stolen()
    }

    fn control(&mut self) {
        let epoch = self.stop.get();
        if epoch != self.epoch {
            self.mixer.release_all();
            self.epoch = epoch;
        }
        while let Ok(Command { trigger, epoch }) = self.rx.pop() {
            if epoch < self.epoch {
                // queued before a stop
                continue;
            }
            if epoch > self.epoch {
                self.mixer.release_all();
                self.epoch = epoch;
            }
            self.mixer.trigger(&trigger);
        }
        self.mixer.refresh_levels();
        self.countdown = CONTROL_BLOCK;
    }

    #[inline]
    fn publish(&self) {
        self.position.publish(self.rendered, self.seconds_rendered());
    }

    /// Fill a mono block. Commands queued before the call take effect on its first frame.
    pub fn render(&mut self, out: &mut [f32]) {
        self.control();
        for s in out.iter_mut() {
            *s = Generator::next(self);
        }
    }

    /// Fill an interleaved block, duplicating the mono signal to every channel.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.control();
        for frame in out.chunks_mut(channels.max(1)) {
            let s = Generator::next(self);
            frame.iter_mut().for_each(|x| *x = s);
        }
    }
}

impl Generator for Renderer {
    fn reset(&mut self, sr: f32) {
        if sr != self.mixer.sample_rate() {
            self.segment_seconds = self.seconds_rendered();
            self.segment_frames = self.rendered;
            self.mixer.set_sample_rate(sr);
            self.publish();
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.countdown == 0 {
            self.control();
        }
        self.countdown -= 1;
        self.rendered += 1;
        self.publish();
        self.mixer.next()
    }
}
