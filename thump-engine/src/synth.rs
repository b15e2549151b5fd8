//! Voice synthesis: one sounding note from trigger to silence.
//!
//! A note is its parameter snapshot plus an age counter. Envelope, pitch sweep and transient
//! are closed-form functions of that age (see `thump_core::envelopes`); the only running
//! state is oscillator phase, the noise generator and the noise high-pass.
//!
//! Kick
//! ```text
//!   f(t)   = frequency * sweep(t)            sweep: (1 + pitch) -> 1 over 20 ms
//!   x(t)   = osc(f) * (1 + shape * e^(-t / 2 ms))          click
//! ```
//! Snare
//! ```text
//!   x(t)   = lerp(osc(f), hp(noise), blend) * (1 + shape * e^(-t / 4 ms))   snap
//! ```
//! Both are clamped to [-1, 1] and then scaled by `envelope(t) * volume`.

use thump_core::dsp::{clamp, exp, lerp};
use thump_core::envelopes::{DecayEnvelope, PitchSweep, ReleaseRamp};
use thump_core::filters::OnePoleHP;

use crate::command::Trigger;
use crate::nodes::{Noise, Osc};
use crate::params::{VoiceParameters, Waveform};
use crate::voice::Voice;

/// Time for the pitch sweep to settle on the base frequency.
pub const SWEEP_WINDOW_S: f32 = 0.02;
/// Fade applied when a note is released early (`stop()`, voice stealing).
pub const RELEASE_S: f32 = 0.01;

const KICK_CLICK_S: f32 = 0.002;
const SNARE_SNAP_S: f32 = 0.004;
const SNARE_NOISE_HP_HZ: f32 = 1_000.0;

/// Shape a raw tone/noise pair into the voice's pre-envelope sample, at note age `age`.
#[inline]
pub fn shape_sample(voice: Voice, params: &VoiceParameters, age: f32, tone: f32, noise: f32) -> f32 {
    let x = match voice {
        Voice::Kick => tone * (1.0 + params.shape * exp(-age / KICK_CLICK_S)),
        Voice::Snare => lerp(tone, noise, params.blend) * (1.0 + params.shape * exp(-age / SNARE_SNAP_S)),
    };
    clamp(x, -1.0, 1.0)
}

#[derive(Clone, Debug)]
pub struct VoiceInstance {
    voice: Voice,
    params: VoiceParameters,
    envelope: DecayEnvelope,
    sweep: PitchSweep,
    osc: Osc,
    noise: Noise,
    noise_hp: OnePoleHP,
    release: ReleaseRamp,
    sr: f32,
    age: u64,
    delay: u64,
    released_at: Option<u64>,
    finished: bool,
}

impl VoiceInstance {
    pub fn new(trigger: &Trigger, sr: f32, seed: u64) -> Self {
        let params = trigger.params;
        let sr = sr.max(1.0);
        Self {
            voice: trigger.voice,
            params,
            envelope: DecayEnvelope::from_decay(params.decay),
            sweep: PitchSweep::new(params.pitch, SWEEP_WINDOW_S, 1.0 + 3.0 * params.shape),
            osc: Osc::new(params.waveform),
            noise: Noise::new(seed),
            noise_hp: OnePoleHP::new(SNARE_NOISE_HP_HZ, sr),
            release: ReleaseRamp::new(RELEASE_S),
            sr,
            age: 0,
            delay: (trigger.delay.max(0.0) * sr).round() as u64,
            released_at: None,
            finished: false,
        }
    }

    #[inline] pub fn voice(&self) -> Voice { self.voice }
    #[inline] pub fn params(&self) -> &VoiceParameters { &self.params }
    #[inline] pub fn is_pending(&self) -> bool { self.delay > 0 }
    #[inline] pub fn is_finished(&self) -> bool { self.finished }
    #[inline] pub fn is_released(&self) -> bool { self.released_at.is_some() }

    /// Age in seconds (time since the note became audible).
    #[inline]
    pub fn age(&self) -> f32 {
        self.age as f32 / self.sr
    }

    /// Natural length of the note in seconds; finite for every parameter set.
    #[inline]
    pub fn lifetime(&self) -> f32 {
        self.envelope.lifetime()
    }

    /// Start the short fade-out. A note still waiting on its delay is simply cancelled.
    pub fn release(&mut self) {
        if self.is_pending() {
            self.finished = true;
        } else if self.released_at.is_none() {
            self.released_at = Some(self.age);
        }
    }

    /// Next output sample (envelope and volume applied). Returns 0 once finished.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.finished {
            return 0.0;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }

        let t = self.age();
        let fade = match self.released_at {
            Some(at) => {
                let since = (self.age - at) as f32 / self.sr;
                if self.release.is_done(since) {
                    self.finished = true;
                    return 0.0;
                }
                self.release.gain(since)
            }
            None => 1.0,
        };
        if t >= self.envelope.lifetime() {
            self.finished = true;
            return 0.0;
        }

        let noise = self.noise.next();
        let tone = match self.params.waveform {
            Waveform::Noise => noise,
            _ => self.osc.next(self.params.frequency * self.sweep.ratio(t), self.sr),
        };
        let noise = match self.voice {
            Voice::Snare => self.noise_hp.process(noise),
            Voice::Kick => noise,
        };

        let x = shape_sample(self.voice, &self.params, t, tone, noise);
        self.age += 1;
        x * self.envelope.amplitude(t) * self.params.volume * fade
    }
}
