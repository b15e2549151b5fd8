//! C ABI wrapper for the Thump drum engine.
//!
//! Exposes the engine's narrow call surface (transport, `schedule`, voice parameters,
//! patterns, tempo, step polling) plus a render entry point.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Two opaque handles: `ThumpEngine` (control side) and `ThumpRenderer` (audio side).
//!   Create the engine, take its renderer once, and destroy both when done.
//! - Voices are numbered `THUMP_VOICE_KICK = 0`, `THUMP_VOICE_SNARE = 1`; other numbers are
//!   ignored.
//! - Numeric input is clamped, never rejected. Null handles are ignored; getters return -1.
//! - Musical time follows the frames rendered through the renderer, so nothing advances
//!   until the host renders audio.
//!
//! Threading
//! - Call `thump_engine_*` from one thread (UI/timer) and `thump_renderer_*` from the audio
//!   thread. The two halves do not lock each other.

use thump_engine::time::FrameClock;
use thump_engine::{Engine, EngineConfig, Generator, Renderer, Voice, VoiceParameters, Waveform};

pub const THUMP_VOICE_KICK: u32 = 0;
pub const THUMP_VOICE_SNARE: u32 = 1;

/// Opaque control-side handle.
pub struct ThumpEngine {
    inner: Engine<FrameClock>,
    renderer: Option<Renderer>,
}

/// Opaque audio-side handle.
pub struct ThumpRenderer {
    inner: Renderer,
    gain: f32,
}

/// Voice parameters as seen from C. `waveform`: 0 sine, 1 square, 2 saw, 3 triangle,
/// 4 noise; anything else plays as sine.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct ThumpVoiceParams {
    pub frequency: f32,
    pub pitch: f32,
    pub waveform: u32,
    pub decay: f32,
    pub shape: f32,
    pub blend: f32,
    pub volume: f32,
}

impl From<ThumpVoiceParams> for VoiceParameters {
    fn from(p: ThumpVoiceParams) -> Self {
        VoiceParameters {
            frequency: p.frequency,
            pitch: p.pitch,
            waveform: Waveform::from_index(p.waveform).unwrap_or_default(),
            decay: p.decay,
            shape: p.shape,
            blend: p.blend,
            volume: p.volume,
        }
    }
}

impl From<VoiceParameters> for ThumpVoiceParams {
    fn from(p: VoiceParameters) -> Self {
        ThumpVoiceParams {
            frequency: p.frequency,
            pitch: p.pitch,
            waveform: Waveform::ALL.iter().position(|w| *w == p.waveform).unwrap_or(0) as u32,
            decay: p.decay,
            shape: p.shape,
            blend: p.blend,
            volume: p.volume,
        }
    }
}

#[inline]
fn engine_mut<'a>(engine: *mut ThumpEngine) -> Option<&'a mut ThumpEngine> {
    unsafe { engine.as_mut() }
}

#[inline]
fn engine_ref<'a>(engine: *const ThumpEngine) -> Option<&'a ThumpEngine> {
    unsafe { engine.as_ref() }
}

#[inline]
fn voice(id: u32) -> Option<Voice> {
    Voice::from_index(id as usize)
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine rendering at `sample_rate` with an initial tempo.
/// Returns a non-null pointer.
#[no_mangle]
pub extern "C" fn thump_engine_create(sample_rate: f32, tempo_bpm: f64) -> *mut ThumpEngine {
    let config = EngineConfig::default().with_sample_rate(sample_rate).with_tempo(tempo_bpm);
    let (inner, renderer) = Engine::with_frame_clock(config);
    Box::into_raw(Box::new(ThumpEngine { inner, renderer: Some(renderer) }))
}

/// Destroy an engine previously returned by `thump_engine_create`.
#[no_mangle]
pub extern "C" fn thump_engine_destroy(engine: *mut ThumpEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)); }
    }
}

/// Hand out the engine's renderer. Succeeds once; later calls return null.
#[no_mangle]
pub extern "C" fn thump_engine_take_renderer(engine: *mut ThumpEngine) -> *mut ThumpRenderer {
    let Some(e) = engine_mut(engine) else { return std::ptr::null_mut() };
    match e.renderer.take() {
        Some(inner) => Box::into_raw(Box::new(ThumpRenderer { inner, gain: 1.0 })),
        None => std::ptr::null_mut(),
    }
}

/// Destroy a renderer returned by `thump_engine_take_renderer`.
#[no_mangle]
pub extern "C" fn thump_renderer_destroy(renderer: *mut ThumpRenderer) {
    if !renderer.is_null() {
        unsafe { drop(Box::from_raw(renderer)); }
    }
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` of audio into an interleaved f32 buffer with `channels` channels.
/// The mix is mono; the sample is duplicated to all channels.
///
/// Returns the number of frames rendered (0 on error).
#[no_mangle]
pub extern "C" fn thump_renderer_render_interleaved_f32(
    renderer: *mut ThumpRenderer,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    if renderer.is_null() || out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    let r = unsafe { &mut *renderer };
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, (frames as usize) * (channels as usize)) };

    r.inner.render_interleaved(out, channels as usize);
    if r.gain != 1.0 {
        out.iter_mut().for_each(|s| *s *= r.gain);
    }
    frames
}

/// Tell the renderer the host's sample rate changed. Sounding notes are dropped; musical
/// time carries on at the new rate.
#[no_mangle]
pub extern "C" fn thump_renderer_reset(renderer: *mut ThumpRenderer, sample_rate: f32) {
    if renderer.is_null() || !(sample_rate.is_finite() && sample_rate > 0.0) { return; }
    let r = unsafe { &mut *renderer };
    r.inner.reset(sample_rate);
}

/// Set overall output gain. Values are clamped to [0, +inf).
#[no_mangle]
pub extern "C" fn thump_renderer_set_gain(renderer: *mut ThumpRenderer, gain: f32) {
    if renderer.is_null() { return; }
    let r = unsafe { &mut *renderer };
    r.gain = if gain.is_finite() { gain.max(0.0) } else { 1.0 };
}

// --- Transport -------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn thump_engine_start(engine: *mut ThumpEngine) {
    if let Some(e) = engine_mut(engine) {
        e.inner.start();
    }
}

#[no_mangle]
pub extern "C" fn thump_engine_stop(engine: *mut ThumpEngine) {
    if let Some(e) = engine_mut(engine) {
        e.inner.stop();
    }
}

/// Advance the sequencer to the renderer's current time. Call periodically (every 10-40 ms).
/// Returns the number of notes queued.
#[no_mangle]
pub extern "C" fn thump_engine_schedule(engine: *mut ThumpEngine) -> u32 {
    match engine_mut(engine) {
        Some(e) => e.inner.schedule().notes as u32,
        None => 0,
    }
}

#[no_mangle]
pub extern "C" fn thump_engine_is_running(engine: *const ThumpEngine) -> bool {
    engine_ref(engine).map_or(false, |e| e.inner.is_running())
}

// --- Voices ----------------------------------------------------------------------

/// Trigger one note now. With `params == NULL` the voice's current parameters are used.
#[no_mangle]
pub extern "C" fn thump_engine_play_voice(engine: *mut ThumpEngine, voice_id: u32, params: *const ThumpVoiceParams) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    match unsafe { params.as_ref() } {
        Some(p) => e.inner.play_voice_once(v, (*p).into()),
        None => e.inner.play_voice(v),
    }
}

#[no_mangle]
pub extern "C" fn thump_engine_set_voice_params(engine: *mut ThumpEngine, voice_id: u32, params: *const ThumpVoiceParams) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    if let Some(p) = unsafe { params.as_ref() } {
        e.inner.set_voice_parameters(v, (*p).into());
    }
}

/// Copy the committed parameters of a voice into `out`. Returns false on bad arguments.
#[no_mangle]
pub extern "C" fn thump_engine_get_voice_params(engine: *const ThumpEngine, voice_id: u32, out: *mut ThumpVoiceParams) -> bool {
    let (Some(e), Some(v)) = (engine_ref(engine), voice(voice_id)) else { return false };
    match unsafe { out.as_mut() } {
        Some(out) => {
            *out = e.inner.voice_parameters(v).into();
            true
        }
        None => false,
    }
}

/// Delay every sequenced note of a voice by `seconds`, clamped to [0, 0.25].
#[no_mangle]
pub extern "C" fn thump_engine_set_nudge(engine: *mut ThumpEngine, voice_id: u32, seconds: f64) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    e.inner.set_nudge(v, seconds);
}

/// Live output level of a voice in [0, 1].
#[no_mangle]
pub extern "C" fn thump_engine_set_channel_level(engine: *mut ThumpEngine, voice_id: u32, level: f32) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    e.inner.set_channel_level(v, level);
}

// --- Patterns / tempo ------------------------------------------------------------

/// Replace a voice's step flags with `len` booleans read from `steps`.
#[no_mangle]
pub extern "C" fn thump_engine_set_pattern(engine: *mut ThumpEngine, voice_id: u32, steps: *const bool, len: usize) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    if steps.is_null() && len > 0 { return; }
    let steps = if len == 0 { &[][..] } else { unsafe { std::slice::from_raw_parts(steps, len) } };
    e.inner.set_pattern(v, steps);
}

#[no_mangle]
pub extern "C" fn thump_engine_set_pattern_length(engine: *mut ThumpEngine, voice_id: u32, length: u32) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    e.inner.set_pattern_length(v, length as usize);
}

#[no_mangle]
pub extern "C" fn thump_engine_set_offset(engine: *mut ThumpEngine, voice_id: u32, offset: i64) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    e.inner.set_offset(v, offset);
}

/// Pin parameters to one step position of a voice's pattern. `params == NULL` clears it.
#[no_mangle]
pub extern "C" fn thump_engine_set_step_lock(
    engine: *mut ThumpEngine,
    voice_id: u32,
    position: u32,
    params: *const ThumpVoiceParams,
) {
    let (Some(e), Some(v)) = (engine_mut(engine), voice(voice_id)) else { return };
    let lock = unsafe { params.as_ref() }.map(|p| VoiceParameters::from(*p));
    e.inner.set_step_lock(v, position as usize, lock);
}

#[no_mangle]
pub extern "C" fn thump_engine_set_tempo(engine: *mut ThumpEngine, bpm: f64) {
    if let Some(e) = engine_mut(engine) {
        e.inner.set_tempo(bpm);
    }
}

/// Current step of a voice, or -1 for a null handle or unknown voice.
#[no_mangle]
pub extern "C" fn thump_engine_get_step(engine: *const ThumpEngine, voice_id: u32) -> i32 {
    match (engine_ref(engine), voice(voice_id)) {
        (Some(e), Some(v)) => e.inner.step(v) as i32,
        _ => -1,
    }
}
