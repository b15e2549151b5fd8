//! Building blocks for drum voices.
//!
//! Zero-allocation, per-sample components. Everything here is small and cheap to move; no
//! locks, no heap.
//!
//! Contents:
//! - `Osc`   : phase-accumulator oscillator over the tonal [`Waveform`]s
//! - `Noise` : white noise from a seeded small RNG
//!
//! Frequency is **Hz**; methods expect the current **sample rate** when stepping.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thump_core::dsp::{sin, wrap_phase01, TAU};

use crate::params::Waveform;

/// Naive (not band-limited) shapes; aliasing is buried under the envelope of a drum hit.
/// `Noise` has no phase shape and reads as silence here.
#[inline]
fn osc_sample(phase01: f32, wave: Waveform) -> f32 {
    match wave {
        Waveform::Sine => sin(TAU * phase01),
        Waveform::Square => if phase01 < 0.5 { 1.0 } else { -1.0 },
        Waveform::Saw => 2.0 * phase01 - 1.0,
        // rises from 0 at phase 0 so a retrigger starts without a step
        Waveform::Triangle => {
            if phase01 < 0.25 {
                4.0 * phase01
            } else if phase01 < 0.75 {
                2.0 - 4.0 * phase01
            } else {
                4.0 * phase01 - 4.0
            }
        }
        Waveform::Noise => 0.0,
    }
}

/// Oscillator that restarts at phase 0 on every note.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32, // [0,1)
    wave: Waveform,
}

impl Osc {
    #[inline] pub fn new(wave: Waveform) -> Self { Self { phase: 0.0, wave } }
    #[inline] pub fn phase(&self) -> f32 { self.phase }

    /// Sample at the current phase, then advance by `freq / sr`.
    #[inline]
    pub fn next(&mut self, freq_hz: f32, sr: f32) -> f32 {
        let s = osc_sample(self.phase, self.wave);
        self.phase = wrap_phase01(self.phase + freq_hz / sr);
        s
    }
}

/// White noise in [-1, 1).
#[derive(Clone, Debug)]
pub struct Noise {
    rng: SmallRng,
}

impl Noise {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        2.0 * self.rng.gen::<f32>() - 1.0
    }
}
