//! Voice parameters: the immutable snapshot a note is synthesized from.
//!
//! Parameters are replaced wholesale, never edited in place while something reads them.
//! Every field is clamped on the way in; a malformed value from a UI never rejects the
//! update and never leaves a voice permanently silent.

use core::fmt;
use core::str::FromStr;

use thump_core::dsp::clamp;

use crate::error::ParseError;
use crate::voice::Voice;

/// Lowest frequency a voice will be tuned to (Hz).
pub const MIN_FREQUENCY: f32 = 20.0;
/// Highest frequency a voice will be tuned to (Hz).
pub const MAX_FREQUENCY: f32 = 12_000.0;
/// Upper bound of the pitch-sweep amount (sweep starts at `frequency * (1 + pitch)`).
pub const MAX_PITCH: f32 = 24.0;

/// Oscillator waveform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Triangle,
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Triangle,
        Waveform::Noise,
    ];

    /// Numeric id used across the C ABI (`0 = sine` … `4 = noise`).
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Saw => "saw",
            Waveform::Triangle => "triangle",
            Waveform::Noise => "noise",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sqr" => Ok(Waveform::Square),
            "saw" | "sawtooth" => Ok(Waveform::Saw),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "noise" => Ok(Waveform::Noise),
            _ => Err(ParseError::UnknownWaveform(s.to_string())),
        }
    }
}

/// Synthesis parameters for one voice.
///
/// - `frequency`: resting oscillator frequency in Hz
/// - `pitch`: sweep amount; a note starts at `frequency * (1 + pitch)`
/// - `decay`, `shape`, `blend`, `volume`: normalized to [0, 1]
///
/// `shape` is the single transient-character knob (click on the kick, snap on the snare).
/// `blend` is the noise/tone mix and only affects the snare.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoiceParameters {
    pub frequency: f32,
    pub pitch: f32,
    pub waveform: Waveform,
    pub decay: f32,
    pub shape: f32,
    pub blend: f32,
    pub volume: f32,
}

impl VoiceParameters {
    pub const fn kick() -> Self {
        Self {
            frequency: 40.0,
            pitch: 1.0,
            waveform: Waveform::Sine,
            decay: 0.1,
            shape: 0.0,
            blend: 0.0,
            volume: 0.7,
        }
    }

    pub const fn snare() -> Self {
        Self {
            frequency: 120.0,
            pitch: 20.0,
            waveform: Waveform::Triangle,
            decay: 0.1,
            shape: 0.5,
            blend: 0.5,
            volume: 0.7,
        }
    }

    pub const fn default_for(voice: Voice) -> Self {
        match voice {
            Voice::Kick => Self::kick(),
            Voice::Snare => Self::snare(),
        }
    }

    /// Copy with every field forced into its valid range. NaN lands on the lower bound.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            frequency: bounded("frequency", self.frequency, MIN_FREQUENCY, MAX_FREQUENCY),
            pitch: bounded("pitch", self.pitch, 0.0, MAX_PITCH),
            waveform: self.waveform,
            decay: bounded("decay", self.decay, 0.0, 1.0),
            shape: bounded("shape", self.shape, 0.0, 1.0),
            blend: bounded("blend", self.blend, 0.0, 1.0),
            volume: bounded("volume", self.volume, 0.0, 1.0),
        }
    }
}

fn bounded(field: &'static str, value: f32, lo: f32, hi: f32) -> f32 {
    let out = clamp(value, lo, hi);
    if out != value {
        tracing::debug!(field, value, clamped = out, "voice parameter out of range");
    }
    out
}
