//! Error types for the textual front doors (voice names, waveform names, step strings).
//!
//! Numeric input never errors: the engine clamps it. Only text that cannot be mapped to
//! anything meaningful is rejected.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Voice name that is not part of the voice table
    UnknownVoice(String),
    /// Waveform name outside sine/square/saw/triangle/noise
    UnknownWaveform(String),
    /// Character in a step string that is neither an "on" nor an "off" marker
    InvalidStep { position: usize, found: char },
    /// Step string with no steps in it
    EmptyPattern,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownVoice(name) => write!(f, "unknown voice: {name:?}"),
            ParseError::UnknownWaveform(name) => write!(f, "unknown waveform: {name:?}"),
            ParseError::InvalidStep { position, found } => {
                write!(f, "invalid step marker {found:?} at position {position}")
            }
            ParseError::EmptyPattern => write!(f, "pattern has no steps"),
        }
    }
}

impl std::error::Error for ParseError {}
