#![cfg_attr(not(feature = "std"), no_std)]
//! Thump Core: no_std-ready DSP primitives for percussive voices.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm` as the math backend
//! - `fast-math`: enable approximations (polys/rationals) for sin/tanh
//!
//! Modules
//! - [`dsp`]       : math backend, phase wrap, soft clip, one-pole coefficients
//! - [`envelopes`] : percussive decay envelope, pitch sweep, release ramp, slew limiter
//! - [`filters`]   : one-pole high-pass
//!
//! Design
//! - No heap allocations; sample-by-sample primitives
//! - Envelopes are closed-form functions of note age, so every note has a finite,
//!   precomputed lifetime

pub mod dsp;
pub mod envelopes;
pub mod filters;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, kill_denormals, lerp, soft_clip, wrap_phase01, TAU};
    pub use crate::envelopes::{DecayEnvelope, EnvelopeStage, PitchSweep, ReleaseRamp, SlewLimiter};
    pub use crate::filters::OnePoleHP;
}
