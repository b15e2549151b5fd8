//! The closed set of drum voices and a fixed-size table keyed by them.
//!
//! Everything per-voice in the engine (parameters, patterns, clock lanes, instance pools,
//! step counters) lives in a [`VoiceTable`], so adding a voice means adding a variant here
//! and its synthesis branch, nothing structural.

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;

use crate::error::ParseError;

/// Number of voices in the table.
pub const VOICE_COUNT: usize = 2;

/// An independently synthesized drum sound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Voice {
    Kick,
    Snare,
}

impl Voice {
    pub const ALL: [Voice; VOICE_COUNT] = [Voice::Kick, Voice::Snare];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Voice::Kick => 0,
            Voice::Snare => 1,
        }
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Voice::Kick => "kick",
            Voice::Snare => "snare",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kick" | "bd" => Ok(Voice::Kick),
            "snare" | "sd" => Ok(Voice::Snare),
            _ => Err(ParseError::UnknownVoice(s.to_string())),
        }
    }
}

/// One `T` per voice, indexable by [`Voice`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoiceTable<T>([T; VOICE_COUNT]);

impl<T> VoiceTable<T> {
    pub fn from_fn(mut f: impl FnMut(Voice) -> T) -> Self {
        Self(core::array::from_fn(|i| f(Voice::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Voice, &T)> {
        Voice::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Voice, &mut T)> {
        Voice::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<Voice> for VoiceTable<T> {
    type Output = T;

    #[inline]
    fn index(&self, voice: Voice) -> &T {
        &self.0[voice.index()]
    }
}

impl<T> IndexMut<Voice> for VoiceTable<T> {
    #[inline]
    fn index_mut(&mut self, voice: Voice) -> &mut T {
        &mut self.0[voice.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_table_order() {
        for (i, voice) in Voice::ALL.iter().enumerate() {
            assert_eq!(voice.index(), i);
            assert_eq!(Voice::from_index(i), Some(*voice));
        }
        assert_eq!(Voice::from_index(VOICE_COUNT), None);
    }

    #[test]
    fn names_parse_back() {
        assert_eq!("Kick".parse::<Voice>(), Ok(Voice::Kick));
        assert_eq!(" snare ".parse::<Voice>(), Ok(Voice::Snare));
        assert!(matches!("hat".parse::<Voice>(), Err(ParseError::UnknownVoice(_))));
    }

    #[test]
    fn table_is_keyed_by_voice() {
        let mut table = VoiceTable::from_fn(|v| v.index() * 10);
        table[Voice::Snare] += 1;
        assert_eq!(table[Voice::Kick], 0);
        assert_eq!(table[Voice::Snare], 11);
        let voices: Vec<Voice> = table.iter().map(|(v, _)| v).collect();
        assert_eq!(voices, Voice::ALL.to_vec());
    }
}
