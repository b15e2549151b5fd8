//! Realtime synthesis graph core.
//!
//! This module defines the minimal `Generator` trait and a lightweight `Output<G>`
//! wrapper that owns a generator, tracks the host sample rate and produces one
//! **mono** sample at a time with zero heap work per sample.

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the output is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f32;
}

/// Owns a generator on the audio thread.
///
/// The audio callback should call `next(sr)` for every output frame. If the `sr` reported
/// by the host changes, the generator is `reset(sr)` once and playback continues.
pub struct Output<G: Generator> {
    sr: f32,
    gen: G,
}

impl<G: Generator> Output<G> {
    /// Wrap a generator already configured for `sr`.
    #[inline]
    pub fn new(gen: G, sr: f32) -> Self {
        Self { sr, gen }
    }

    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        if sr != self.sr {
            self.sr = sr;
            self.gen.reset(sr);
        }
        self.gen.next()
    }

    /// Fill an interleaved buffer, duplicating the mono sample to every channel.
    #[inline]
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize, sr: f32) {
        for frame in out.chunks_mut(channels.max(1)) {
            let s = self.next(sr);
            frame.iter_mut().for_each(|x| *x = s);
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    #[inline]
    pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }
}
