//! Time sources for `schedule()`.
//!
//! The engine only ever asks "what time is it now" and works with the difference from the
//! previous tick. Where that time comes from is up to the host:
//! - [`WallClock`]   : monotonic system time
//! - [`FrameClock`]  : frames the renderer has produced, i.e. the audio device's clock
//! - [`ManualClock`] : advanced explicitly (tests, offline rendering)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait TimeSource {
    /// Seconds since an arbitrary, fixed origin. Must never go backwards.
    fn now(&self) -> f64;
}

#[derive(Clone, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl TimeSource for WallClock {
    #[inline]
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Where the renderer is: frames produced and the audio time they add up to.
///
/// The renderer is the only writer. Seconds are accumulated per sample-rate segment, so a
/// host rate change moves the clock on at the new rate without rewriting time already played.
#[derive(Debug, Default)]
pub struct AudioPosition {
    frames: AtomicU64,
    seconds_bits: AtomicU64,
}

impl AudioPosition {
    pub(crate) fn publish(&self, frames: u64, seconds: f64) {
        self.frames.store(frames, Ordering::Release);
        self.seconds_bits.store(seconds.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn seconds(&self) -> f64 {
        f64::from_bits(self.seconds_bits.load(Ordering::Acquire))
    }
}

/// Reads the renderer's published position.
#[derive(Clone, Debug)]
pub struct FrameClock {
    position: Arc<AudioPosition>,
}

impl FrameClock {
    pub fn new(position: Arc<AudioPosition>) -> Self {
        Self { position }
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.position.frames()
    }
}

impl TimeSource for FrameClock {
    #[inline]
    fn now(&self) -> f64 {
        self.position.seconds()
    }
}

/// Shared, explicitly advanced clock. Clones observe the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }

    pub fn advance_secs(&self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.advance(Duration::from_secs_f64(secs));
        }
    }

    /// Jump to an absolute time. Moving backwards is ignored.
    pub fn set(&self, at: Duration) {
        self.nanos.fetch_max(at.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl TimeSource for ManualClock {
    #[inline]
    fn now(&self) -> f64 {
        self.nanos.load(Ordering::Acquire) as f64 * 1.0e-9
    }
}
