//! Parameter and sequence stores.
//!
//! Both stores hold one immutable snapshot per voice behind an [`ArcSwap`]: readers take a
//! guard and see either the old or the new value, never a half-written one. Writers build
//! the next value off to the side and publish it with a single pointer swap.
//!
//! The engine root is the only writer. The render thread never reads these directly; it
//! receives the parameters a note needs inside the trigger command.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::params::VoiceParameters;
use crate::pattern::Pattern;
use crate::voice::{Voice, VoiceTable};

pub struct ParameterStore {
    slots: VoiceTable<ArcSwap<VoiceParameters>>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            slots: VoiceTable::from_fn(|v| ArcSwap::from_pointee(VoiceParameters::default_for(v))),
        }
    }

    /// Sanitize and publish.
    pub fn set(&self, voice: Voice, params: VoiceParameters) {
        self.slots[voice].store(Arc::new(params.sanitized()));
    }

    /// Committed snapshot (a copy; parameters are small).
    #[inline]
    pub fn get(&self, voice: Voice) -> VoiceParameters {
        **self.slots[voice].load()
    }
}

pub struct SequenceStore {
    slots: VoiceTable<ArcSwap<Pattern>>,
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceStore {
    pub fn new() -> Self {
        Self { slots: VoiceTable::from_fn(|_| ArcSwap::from_pointee(Pattern::default())) }
    }

    #[inline]
    pub fn load(&self, voice: Voice) -> Arc<Pattern> {
        self.slots[voice].load_full()
    }

    pub fn replace(&self, voice: Voice, pattern: Pattern) {
        self.slots[voice].store(Arc::new(pattern));
    }

    /// Copy-on-write edit. Returns the published pattern.
    pub fn update(&self, voice: Voice, edit: impl FnOnce(&mut Pattern)) -> Arc<Pattern> {
        let mut next = Pattern::clone(&self.slots[voice].load());
        edit(&mut next);
        let next = Arc::new(next);
        self.slots[voice].store(Arc::clone(&next));
        next
    }

    #[inline]
    pub fn length(&self, voice: Voice) -> usize {
        self.slots[voice].load().length()
    }
}
