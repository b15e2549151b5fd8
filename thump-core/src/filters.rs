//! One-pole high-pass.
//!
//! Used to thin out raw noise before it is mixed into a drum voice. Allocation free and
//! `no_std` friendly. Uses the leaky-integrator form rather than a bilinear/TPT match,
//! which is plenty for gentle tonal shaping.

use crate::dsp::{kill_denormals, one_pole_coeff_hz};

/// One-pole high-pass using the standard “leaky integrator” form:
///
/// Difference equation:
/// `y[n] = x[n] - x[n-1] + b * y[n-1]`, with `b = exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleHP {
    b: f32,
    x1: f32,
    y1: f32,
}

impl OnePoleHP {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        Self {
            b: one_pole_coeff_hz(cut_hz.max(0.0), sr.max(1.0)),
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.b * self.y1;
        self.x1 = x;
        self.y1 = kill_denormals(y);
        self.y1
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pole_hp_blocks_dc() {
        let sr = 48000.0;
        let mut hp = OnePoleHP::new(20.0, sr);
        let mut y = 0.0;
        for _ in 0..(sr as usize) {
            y = hp.process(1.0);
        }
        assert!(y.abs() < 1e-2, "y={}", y);
    }

    #[test]
    fn one_pole_hp_passes_alternating_signal() {
        let mut hp = OnePoleHP::new(1000.0, 48000.0);
        let mut peak = 0.0f32;
        for i in 0..4800 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            peak = peak.max(hp.process(x).abs());
        }
        assert!(peak > 0.9, "peak={peak}");
    }
}
