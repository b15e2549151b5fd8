//! Percussive envelopes and parameter slewing primitives.
//!
//! Provided shapes:
//! - `DecayEnvelope` : linear attack, hold, then exponential (RC-like) decay
//! - `PitchSweep`    : exponential frequency-ratio sweep with adjustable curvature
//! - `ReleaseRamp`   : short linear fade used to retire a note without a click
//! - `SlewLimiter`   : one-pole slew/smoother for arbitrary control signals
//!
//! The percussive shapes are closed-form functions of the note's age (seconds), so a note
//! is fully described by its parameters plus one counter, and its end is known up front.
//! All of them are `no_std` friendly and avoid heap allocations.

use crate::dsp::{clamp, exp, kill_denormals, ln, one_pole_coeff_ms, powf};

/// Amplitude below which a note counts as silent (−80 dB).
pub const SILENCE: f32 = 1.0e-4;

/// Attack ramp length used by [`DecayEnvelope::from_decay`].
pub const ATTACK_S: f32 = 0.001;

/// Shortest decay time constant; a `decay` of 0 maps here.
pub const MIN_DECAY_S: f32 = 0.005;

/// Decay time constant at `decay = 1`.
pub const MAX_DECAY_S: f32 = 0.5;

// -------------------------------- Decay envelope ---------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Hold,
    Decay,
    Done,
}

/// Attack / hold / exponential decay, evaluated from the note age.
///
/// ```text
///   amp(t) = t / attack                          t < attack
///          = 1                                   t < attack + hold
///          = exp(-(t - attack - hold) / tau)     t < lifetime
///          = 0                                   otherwise
/// ```
///
/// `lifetime` is the age where the decay reaches [`SILENCE`]; it is finite because `tau`
/// is bounded below.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayEnvelope {
    attack: f32,
    hold: f32,
    tau: f32,
    lifetime: f32,
}

impl DecayEnvelope {
    /// Times in seconds. Negative or non-finite times collapse to their minimums.
    #[inline]
    pub fn new(attack_s: f32, hold_s: f32, tau_s: f32) -> Self {
        let attack = clamp(attack_s, 0.0, 10.0);
        let hold = clamp(hold_s, 0.0, 10.0);
        let tau = clamp(tau_s, MIN_DECAY_S, 10.0);
        let lifetime = attack + hold + tau * ln(1.0 / SILENCE);
        Self { attack, hold, tau, lifetime }
    }

    /// Map a normalized `decay` knob in [0, 1] to the drum envelope: the note holds for
    /// `tau` and then falls with time constant `tau`, `tau = max(MIN_DECAY_S, decay * MAX_DECAY_S)`.
    #[inline]
    pub fn from_decay(decay: f32) -> Self {
        let tau = clamp(decay, 0.0, 1.0) * MAX_DECAY_S;
        let tau = if tau < MIN_DECAY_S { MIN_DECAY_S } else { tau };
        Self::new(ATTACK_S, tau, tau)
    }

    /// Age (seconds) after which the envelope is silent.
    #[inline] pub fn lifetime(&self) -> f32 { self.lifetime }

    /// Age at which the envelope reaches full level.
    #[inline] pub fn peak_age(&self) -> f32 { self.attack }

    #[inline]
    pub fn stage(&self, age: f32) -> EnvelopeStage {
        if age >= self.lifetime {
            EnvelopeStage::Done
        } else if age < self.attack {
            EnvelopeStage::Attack
        } else if age < self.attack + self.hold {
            EnvelopeStage::Hold
        } else {
            EnvelopeStage::Decay
        }
    }

    #[inline]
    pub fn amplitude(&self, age: f32) -> f32 {
        match self.stage(age) {
            EnvelopeStage::Attack => age / self.attack,
            EnvelopeStage::Hold => 1.0,
            EnvelopeStage::Decay => kill_denormals(exp(-(age - self.attack - self.hold) / self.tau)),
            EnvelopeStage::Done => 0.0,
        }
    }
}

// -------------------------------- Pitch sweep ------------------------------------

/// Frequency multiplier that starts at `1 + amount` and settles at exactly 1 after `window`.
///
/// `ratio(t) = (1 + amount) ^ ((1 - t/window) ^ curve)`. With `curve = 1` this is a plain
/// exponential ramp; larger curves drop faster at the start (harder punch).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PitchSweep {
    log_ratio: f32,
    window: f32,
    curve: f32,
}

impl PitchSweep {
    #[inline]
    pub fn new(amount: f32, window_s: f32, curve: f32) -> Self {
        let amount = if amount > 0.0 { amount } else { 0.0 };
        Self {
            log_ratio: ln(1.0 + amount),
            window: if window_s > 0.0 { window_s } else { 0.0 },
            curve: clamp(curve, 0.1, 16.0),
        }
    }

    #[inline]
    pub fn ratio(&self, age: f32) -> f32 {
        if age >= self.window || self.log_ratio == 0.0 {
            return 1.0;
        }
        let remaining = 1.0 - age / self.window;
        exp(self.log_ratio * powf(remaining, self.curve))
    }
}

// -------------------------------- Release ramp -----------------------------------

/// Linear fade from 1 to 0 over `time` seconds, evaluated from the time since release.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReleaseRamp {
    time: f32,
}

impl ReleaseRamp {
    #[inline]
    pub fn new(time_s: f32) -> Self {
        Self { time: if time_s > 0.0 { time_s } else { 0.0 } }
    }

    #[inline]
    pub fn gain(&self, since_release: f32) -> f32 {
        if self.time <= 0.0 || since_release >= self.time {
            0.0
        } else {
            1.0 - since_release / self.time
        }
    }

    #[inline]
    pub fn is_done(&self, since_release: f32) -> bool {
        since_release >= self.time
    }
}

// -------------------------------- Slew Limiter -----------------------------------

/// One-pole slew/smoother: `y += (x - y) * (1 - a)`
///
/// Use `alpha = one_pole_coeff_ms(t_ms, sr)`.
#[derive(Copy, Clone, Debug)]
pub struct SlewLimiter {
    alpha: f32,
    y:     f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(t_ms: f32, sr: f32) -> Self {
        Self { alpha: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) {
        self.alpha = one_pole_coeff_ms(t_ms, sr);
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.alpha);
        self.y = kill_denormals(self.y);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------
