//! Render/mix stage: the fixed pools of sounding notes and the channel levels over them.
//!
//! Each voice holds at most `MAX_INSTANCES` notes that have not been released. A trigger
//! beyond that steals the oldest one: it gets the short release fade and finishes in one of
//! the spare slots, so retriggers overlap instead of cutting each other off and the pool
//! never grows. Nothing here allocates after construction.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thump_core::dsp::{clamp, soft_clip};
use thump_core::envelopes::SlewLimiter;

use crate::command::Trigger;
use crate::synth::VoiceInstance;
use crate::voice::{Voice, VoiceTable};

/// Simultaneous notes per voice.
pub const MAX_INSTANCES: usize = 8;

/// Slots per voice: the held notes plus room for as many stolen ones fading out.
const POOL_SLOTS: usize = 2 * MAX_INSTANCES;

/// Glide time for channel level changes.
pub const LEVEL_SLEW_MS: f32 = 10.0;

/// Live per-voice output level in [0, 1], shared between control and render side as `f32`
/// bits in atomics. Unlike a note's `volume`, a level change reaches notes already sounding.
#[derive(Clone, Debug)]
pub struct ChannelLevels {
    bits: Arc<VoiceTable<AtomicU32>>,
}

impl Default for ChannelLevels {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelLevels {
    pub fn new() -> Self {
        Self { bits: Arc::new(VoiceTable::from_fn(|_| AtomicU32::new(1.0f32.to_bits()))) }
    }

    pub fn set(&self, voice: Voice, level: f32) -> f32 {
        let level = clamp(level, 0.0, 1.0);
        self.bits[voice].store(level.to_bits(), Ordering::Relaxed);
        level
    }

    #[inline]
    pub fn get(&self, voice: Voice) -> f32 {
        f32::from_bits(self.bits[voice].load(Ordering::Relaxed))
    }
}

struct Slot {
    instance: VoiceInstance,
    born: u64,
}

impl Slot {
    /// Counts against `MAX_INSTANCES`: not released and not cancelled.
    #[inline]
    fn is_held(&self) -> bool {
        !self.instance.is_released() && !self.instance.is_finished()
    }
}

type Pool = [Option<Slot>; POOL_SLOTS];

pub struct Mixer {
    pools: VoiceTable<Pool>,
    levels: ChannelLevels,
    targets: VoiceTable<f32>,
    slew: VoiceTable<SlewLimiter>,
    sr: f32,
    born: u64,
    stolen: u64,
}

impl Mixer {
    pub fn new(levels: ChannelLevels, sr: f32) -> Self {
        let sr = sr.max(1.0);
        let targets = VoiceTable::from_fn(|v| levels.get(v));
        let slew = VoiceTable::from_fn(|v| {
            let mut s = SlewLimiter::new(LEVEL_SLEW_MS, sr);
            s.reset(targets[v]);
            s
        });
        Self {
            pools: VoiceTable::from_fn(|_| core::array::from_fn(|_| None)),
            levels,
            targets,
            slew,
            sr,
            born: 0,
            stolen: 0,
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
    #[inline] pub fn stolen(&self) -> u64 { self.stolen }

    /// New rate for everything that follows. Sounding notes are dropped.
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.clear();
        for (voice, s) in self.slew.iter_mut() {
            s.set_time_ms(LEVEL_SLEW_MS, self.sr);
            s.reset(self.targets[voice]);
        }
    }

    pub fn clear(&mut self) {
        for (_, pool) in self.pools.iter_mut() {
            pool.iter_mut().for_each(|slot| *slot = None);
        }
    }

    /// Notes of `voice` currently held (pending, sounding or fading).
    pub fn live(&self, voice: Voice) -> usize {
        self.pools[voice].iter().filter(|s| s.is_some()).count()
    }

    pub fn trigger(&mut self, trigger: &Trigger) {
        self.born = self.born.wrapping_add(1);
        let slot = Slot {
            instance: VoiceInstance::new(trigger, self.sr, self.born),
            born: self.born,
        };
        let pool = &mut self.pools[trigger.voice];

        if pool.iter().flatten().filter(|s| s.is_held()).count() >= MAX_INSTANCES {
            if let Some(oldest) = pool.iter_mut().flatten().filter(|s| s.is_held()).min_by_key(|s| s.born) {
                oldest.instance.release();
                self.stolen += 1;
            }
        }

        // With every slot busy, at least MAX_INSTANCES of them are fading; the oldest of
        // those is the nearest to silence.
        let index = pool.iter().position(Option::is_none).unwrap_or_else(|| {
            pool.iter()
                .enumerate()
                .filter(|(_, s)| s.as_ref().map_or(false, |s| !s.is_held()))
                .min_by_key(|(_, s)| s.as_ref().map_or(u64::MAX, |s| s.born))
                .map_or(0, |(i, _)| i)
        });
        pool[index] = Some(slot);
    }

    pub fn release_all(&mut self) {
        for (_, pool) in self.pools.iter_mut() {
            for slot in pool.iter_mut().flatten() {
                slot.instance.release();
            }
        }
    }

    /// Pick up level changes made on the control side.
    pub fn refresh_levels(&mut self) {
        for (voice, target) in self.targets.iter_mut() {
            *target = self.levels.get(voice);
        }
    }

    /// Sum one frame of every live note, apply channel levels and soft clip.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let mut out = 0.0;
        for (voice, pool) in self.pools.iter_mut() {
            let level = self.slew[voice].process(self.targets[voice]);
            let mut sum = 0.0;
            for slot in pool.iter_mut() {
                let done = match slot {
                    Some(s) => {
                        sum += s.instance.next();
                        s.instance.is_finished()
                    }
                    None => false,
                };
                if done {
                    *slot = None;
                }
            }
            out += sum * level;
        }
        soft_clip(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::VoiceParameters;

    const SR: f32 = 48_000.0;

    fn hit(voice: Voice) -> Trigger {
        Trigger { voice, params: VoiceParameters::default_for(voice), delay: 0.0 }
    }

    #[test]
    fn finished_notes_are_pruned() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        mixer.trigger(&hit(Voice::Kick));
        assert_eq!(mixer.live(Voice::Kick), 1);
        for _ in 0..(SR as usize) {
            mixer.next();
        }
        assert_eq!(mixer.live(Voice::Kick), 0);
    }

    fn held(mixer: &Mixer, voice: Voice) -> Vec<u64> {
        mixer.pools[voice].iter().flatten().filter(|s| s.is_held()).map(|s| s.born).collect()
    }

    #[test]
    fn retrigger_overlaps_then_steals_oldest() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        for _ in 0..MAX_INSTANCES {
            mixer.trigger(&hit(Voice::Snare));
            mixer.next();
        }
        assert_eq!(mixer.live(Voice::Snare), MAX_INSTANCES);
        assert_eq!(mixer.stolen(), 0);
        mixer.trigger(&hit(Voice::Snare));
        assert_eq!(mixer.stolen(), 1);
        // the oldest (born first) is fading out, the rest are still held
        let held = held(&mixer, Voice::Snare);
        assert_eq!(held.len(), MAX_INSTANCES);
        assert_eq!(held.iter().min(), Some(&2));
        assert_eq!(mixer.live(Voice::Snare), MAX_INSTANCES + 1);
        for _ in 0..((crate::synth::RELEASE_S * SR) as usize + 4) {
            mixer.next();
        }
        assert_eq!(mixer.live(Voice::Kick), 0);
        assert!(mixer.pools[Voice::Snare].iter().flatten().all(|s| s.born != 1));
    }

    #[test]
    fn stealing_fades_instead_of_cutting() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        let body = VoiceParameters { decay: 1.0, volume: 0.1, ..VoiceParameters::kick() };
        for _ in 0..MAX_INSTANCES {
            mixer.trigger(&Trigger { voice: Voice::Kick, params: body, delay: 0.0 });
        }
        // past the sweep and the attack every note is a steady 40 Hz sine; steal near a peak
        let mut prev = 0.0;
        for _ in 0..4_800 {
            prev = mixer.next();
        }
        for _ in 0..4_800 {
            if prev.abs() > 0.5 {
                break;
            }
            prev = mixer.next();
        }
        assert!(prev.abs() > 0.5);

        mixer.trigger(&Trigger { voice: Voice::Kick, params: body, delay: 0.0 });
        assert_eq!(mixer.stolen(), 1);
        let mut worst = 0.0f32;
        for _ in 0..64 {
            let s = mixer.next();
            worst = worst.max((s - prev).abs());
            prev = s;
        }
        assert!(worst < 0.02, "jump of {worst} while stealing");
    }

    #[test]
    fn busy_fading_slots_make_room_for_new_notes() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        let long = VoiceParameters { decay: 1.0, ..VoiceParameters::snare() };
        for _ in 0..(POOL_SLOTS + 3) {
            mixer.trigger(&Trigger { voice: Voice::Snare, params: long, delay: 0.0 });
        }
        assert_eq!(mixer.live(Voice::Snare), POOL_SLOTS);
        assert_eq!(held(&mixer, Voice::Snare).len(), MAX_INSTANCES);
        let newest = mixer.born;
        assert!(held(&mixer, Voice::Snare).contains(&newest));
    }

    #[test]
    fn release_all_silences_within_release_time() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        let long = VoiceParameters { decay: 1.0, ..VoiceParameters::kick() };
        mixer.trigger(&Trigger { voice: Voice::Kick, params: long, delay: 0.0 });
        mixer.trigger(&hit(Voice::Snare));
        for _ in 0..256 {
            mixer.next();
        }
        mixer.release_all();
        for _ in 0..((crate::synth::RELEASE_S * SR) as usize + 4) {
            mixer.next();
        }
        assert_eq!(mixer.live(Voice::Kick) + mixer.live(Voice::Snare), 0);
    }

    #[test]
    fn output_is_soft_clipped() {
        let mut mixer = Mixer::new(ChannelLevels::new(), SR);
        let loud = VoiceParameters { volume: 1.0, shape: 1.0, ..VoiceParameters::kick() };
        for _ in 0..MAX_INSTANCES {
            mixer.trigger(&Trigger { voice: Voice::Kick, params: loud, delay: 0.0 });
        }
        for _ in 0..4800 {
            let s = mixer.next();
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn channel_level_glides_to_target() {
        let levels = ChannelLevels::new();
        let mut mixer = Mixer::new(levels.clone(), SR);
        assert_eq!(levels.set(Voice::Kick, 3.0), 1.0);
        levels.set(Voice::Kick, 0.0);
        mixer.refresh_levels();
        mixer.next();
        let first = mixer.slew[Voice::Kick].value();
        assert!(first > 0.9, "level jumped to {first}");
        for _ in 0..(SR as usize / 10) {
            mixer.next();
        }
        assert!(mixer.slew[Voice::Kick].value() < 1e-3);
        assert_eq!(mixer.slew[Voice::Snare].value(), 1.0);
    }
}
