//! Engine configuration.

/// Construction-time settings. Everything else (tempo, patterns, parameters) is live.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Render sample rate (Hz).
    pub sample_rate: f32,
    /// Initial tempo.
    pub tempo_bpm: f64,
    /// Grid resolution; 4 means sixteenth notes.
    pub steps_per_beat: u32,
    /// Scheduling latency added to every sequenced note (seconds). Should exceed the gap
    /// between two `schedule()` calls for sample-accurate spacing.
    pub lookahead: f64,
    /// Most step boundaries a single `schedule()` call will fire.
    pub max_boundaries_per_tick: usize,
    /// Capacity of the control-to-render command ring.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            tempo_bpm: 90.0,
            steps_per_beat: 4,
            lookahead: 0.05,
            max_boundaries_per_tick: 64,
            command_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sr: f32) -> Self { self.sample_rate = sr; self }
    pub fn with_tempo(mut self, bpm: f64) -> Self { self.tempo_bpm = bpm; self }
    pub fn with_steps_per_beat(mut self, n: u32) -> Self { self.steps_per_beat = n; self }
    pub fn with_lookahead(mut self, seconds: f64) -> Self { self.lookahead = seconds; self }
    pub fn with_max_boundaries_per_tick(mut self, n: usize) -> Self { self.max_boundaries_per_tick = n; self }
    pub fn with_command_capacity(mut self, n: usize) -> Self { self.command_capacity = n; self }

    /// Copy with unusable values replaced by something that works.
    pub(crate) fn normalized(self) -> Self {
        let d = Self::default();
        Self {
            sample_rate: if self.sample_rate.is_finite() && self.sample_rate >= 1_000.0 { self.sample_rate } else { d.sample_rate },
            tempo_bpm: self.tempo_bpm,
            steps_per_beat: self.steps_per_beat.max(1),
            lookahead: if self.lookahead.is_finite() { self.lookahead.clamp(0.0, 1.0) } else { d.lookahead },
            max_boundaries_per_tick: self.max_boundaries_per_tick.max(1),
            command_capacity: self.command_capacity.max(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_chain() {
        let c = EngineConfig::default().with_tempo(120.0).with_lookahead(0.0).with_sample_rate(44_100.0);
        assert_eq!(c.tempo_bpm, 120.0);
        assert_eq!(c.lookahead, 0.0);
        assert_eq!(c.sample_rate, 44_100.0);
        assert_eq!(c.steps_per_beat, 4);
    }

    #[test]
    fn normalized_repairs_nonsense() {
        let c = EngineConfig {
            sample_rate: f32::NAN,
            tempo_bpm: 90.0,
            steps_per_beat: 0,
            lookahead: -1.0,
            max_boundaries_per_tick: 0,
            command_capacity: 0,
        }
        .normalized();
        assert_eq!(c.sample_rate, 48_000.0);
        assert_eq!(c.steps_per_beat, 1);
        assert_eq!(c.lookahead, 0.0);
        assert_eq!(c.max_boundaries_per_tick, 1);
        assert_eq!(c.command_capacity, 8);
    }
}
