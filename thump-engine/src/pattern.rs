//! Step patterns: which grid positions of a voice play, and with what.
//!
//! A [`Pattern`] holds the raw step flags plus two views onto them: `length` (how many
//! positions a loop lasts) and `offset` (where inside the flags the loop starts). The raw
//! flags may be longer or shorter than `length`; positions wrap around them.

use core::fmt;
use core::str::FromStr;

use crate::error::ParseError;
use crate::params::VoiceParameters;

/// Longest pattern loop and largest step array a pattern will hold.
pub const MAX_STEPS: usize = 64;

/// Steps in a fresh pattern (one bar of sixteenths).
pub const DEFAULT_STEPS: usize = 16;

/// Ordered step flags with a loop length, a rotation and optional per-step parameter locks.
///
/// Invariants, kept by every setter:
/// - `1 <= length <= MAX_STEPS`
/// - `offset < length`
/// - `steps.len() <= MAX_STEPS` and `locks.len() == steps.len()`
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    steps: Vec<bool>,
    locks: Vec<Option<VoiceParameters>>,
    length: usize,
    offset: usize,
}

impl Default for Pattern {
    fn default() -> Self {
        Self::empty(DEFAULT_STEPS)
    }
}

impl Pattern {
    /// `size` inactive steps, looping over all of them.
    pub fn empty(size: usize) -> Self {
        Self::from_steps(vec![false; size.min(MAX_STEPS)])
    }

    /// Loop length follows the number of steps given.
    pub fn from_steps(steps: impl Into<Vec<bool>>) -> Self {
        let mut steps: Vec<bool> = steps.into();
        steps.truncate(MAX_STEPS);
        let length = steps.len().max(1);
        let locks = vec![None; steps.len()];
        Self { steps, locks, length, offset: 0 }
    }

    #[inline] pub fn steps(&self) -> &[bool] { &self.steps }
    #[inline] pub fn length(&self) -> usize { self.length }
    #[inline] pub fn offset(&self) -> usize { self.offset }

    /// Replace the step flags. Length and offset stay; locks on surviving positions stay.
    pub fn set_steps(&mut self, steps: &[bool]) {
        let n = steps.len().min(MAX_STEPS);
        if n < steps.len() {
            tracing::debug!(given = steps.len(), kept = n, "pattern truncated");
        }
        self.steps.clear();
        self.steps.extend_from_slice(&steps[..n]);
        self.locks.resize(n, None);
    }

    /// Clamp `n` into `[1, MAX_STEPS]`, then pull `offset` back inside the new loop.
    pub fn set_length(&mut self, n: usize) {
        let length = n.clamp(1, MAX_STEPS);
        if length != n {
            tracing::debug!(requested = n, length, "pattern length clamped");
        }
        self.length = length;
        if self.offset >= length {
            self.offset = length - 1;
        }
    }

    /// Rotation, taken modulo the loop length (negative values count back from the end).
    pub fn set_offset(&mut self, k: i64) {
        self.offset = k.rem_euclid(self.length as i64) as usize;
    }

    /// Attach (or with `None`, clear) a parameter lock on a raw step position.
    /// Positions outside the step array are ignored.
    pub fn set_lock(&mut self, position: usize, params: Option<VoiceParameters>) {
        match self.locks.get_mut(position) {
            Some(slot) => *slot = params.map(VoiceParameters::sanitized),
            None => tracing::debug!(position, steps = self.steps.len(), "lock outside pattern ignored"),
        }
    }

    /// Raw step position that loop index `i` reads.
    #[inline]
    pub fn source_index(&self, i: usize) -> Option<usize> {
        if i >= self.length || self.steps.is_empty() {
            return None;
        }
        Some((i + self.offset) % self.steps.len())
    }

    #[inline]
    pub fn is_active(&self, i: usize) -> bool {
        self.source_index(i).map_or(false, |s| self.steps[s])
    }

    /// What a boundary at loop index `i` plays: `None` for a rest, `Some(lock)` for a hit,
    /// where `lock` overrides the voice's current parameters when present.
    #[inline]
    pub fn hit(&self, i: usize) -> Option<Option<VoiceParameters>> {
        let s = self.source_index(i)?;
        if self.steps[s] { Some(self.locks[s]) } else { None }
    }

    /// The loop as it plays, one flag per index `0..length`.
    pub fn effective(&self) -> Vec<bool> {
        (0..self.length).map(|i| self.is_active(i)).collect()
    }
}

/// One character per step: `x` active, `.` inactive.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &on in &self.steps {
            f.write_str(if on { "x" } else { "." })?;
        }
        Ok(())
    }
}

/// `x X 1 *` mark a hit, `. - 0 _` a rest; whitespace and `|` are bar separators.
impl FromStr for Pattern {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut steps = Vec::with_capacity(s.len());
        for (position, c) in s.chars().enumerate() {
            match c {
                'x' | 'X' | '1' | '*' => steps.push(true),
                '.' | '-' | '0' | '_' => steps.push(false),
                '|' => {}
                c if c.is_whitespace() => {}
                found => return Err(ParseError::InvalidStep { position, found }),
            }
        }
        if steps.is_empty() {
            return Err(ParseError::EmptyPattern);
        }
        Ok(Self::from_steps(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    #[test]
    fn offset_rotates_evaluation_order() {
        let mut pat = Pattern::from_steps([true, false, true, false]);
        pat.set_offset(2);
        assert_eq!(pat.source_index(0), Some(2));
        assert_eq!(pat.source_index(1), Some(3));
        assert_eq!(pat.source_index(2), Some(0));
        assert_eq!(pat.source_index(3), Some(1));
        assert_eq!(pat.effective(), vec![true, false, true, false]);

        let mut pat = p("xx..");
        pat.set_offset(1);
        assert_eq!(pat.effective(), vec![true, false, false, true]);
    }

    #[test]
    fn offset_wraps_both_ways() {
        let mut pat = p("x...");
        pat.set_offset(6);
        assert_eq!(pat.offset(), 2);
        pat.set_offset(-1);
        assert_eq!(pat.offset(), 3);
    }

    #[test]
    fn shrinking_length_reclamps_offset() {
        let mut pat = p("x.x.x.x.");
        pat.set_offset(7);
        pat.set_length(4);
        assert_eq!(pat.length(), 4);
        assert!(pat.offset() < pat.length());
        for i in 0..MAX_STEPS {
            // never reads out of range, whatever the index
            let _ = pat.is_active(i);
        }
    }

    #[test]
    fn length_is_clamped() {
        let mut pat = p("x...");
        pat.set_length(0);
        assert_eq!(pat.length(), 1);
        pat.set_length(10_000);
        assert_eq!(pat.length(), MAX_STEPS);
    }

    #[test]
    fn length_longer_than_steps_wraps_over_them() {
        let mut pat = p("x.");
        pat.set_length(4);
        assert_eq!(pat.effective(), vec![true, false, true, false]);
    }

    #[test]
    fn empty_steps_are_silent() {
        let mut pat = Pattern::from_steps(Vec::new());
        assert_eq!(pat.length(), 1);
        assert!(!pat.is_active(0));
        pat.set_steps(&[true]);
        assert!(pat.is_active(0));
    }

    #[test]
    fn set_steps_keeps_length_and_locks() {
        let mut pat = p("x.x.");
        let lock = VoiceParameters { frequency: 55.0, ..VoiceParameters::kick() };
        pat.set_lock(2, Some(lock));
        pat.set_length(3);
        pat.set_steps(&[true, true, true, true, true, true]);
        assert_eq!(pat.length(), 3);
        assert_eq!(pat.hit(2), Some(Some(lock)));
        assert_eq!(pat.hit(1), Some(None));
    }

    #[test]
    fn locks_only_fire_on_active_steps() {
        let mut pat = p("x.");
        pat.set_lock(1, Some(VoiceParameters::snare()));
        assert_eq!(pat.hit(1), None);
        pat.set_lock(9, Some(VoiceParameters::snare()));
        assert_eq!(pat.hit(0), Some(None));
    }

    #[test]
    fn parses_step_strings() {
        let pat = p("x..x | X-0* _1");
        assert_eq!(
            pat.steps(),
            &[true, false, false, true, true, false, false, true, false, true]
        );
        assert_eq!(pat.to_string(), "x..xx..x.x");
        assert_eq!("x.o.".parse::<Pattern>(), Err(ParseError::InvalidStep { position: 2, found: 'o' }));
        assert_eq!(" | ".parse::<Pattern>(), Err(ParseError::EmptyPattern));
    }
}
