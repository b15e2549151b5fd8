//! End-to-end behavior of the engine through its public surface, timed by a manual clock.

use std::time::Duration;

use thump_core::envelopes::DecayEnvelope;
use thump_engine::{Engine, EngineConfig, ManualClock, Pattern, Renderer, Voice, VoiceParameters};

const SR: usize = 48_000;

fn engine_at(bpm: f64) -> (Engine<ManualClock>, Renderer, ManualClock) {
    let clock = ManualClock::new();
    let config = EngineConfig::default()
        .with_sample_rate(SR as f32)
        .with_tempo(bpm)
        .with_lookahead(0.0);
    let (engine, renderer) = Engine::with_time_source(config, clock.clone());
    (engine, renderer, clock)
}

fn pattern(s: &str) -> Pattern {
    s.parse().expect("valid pattern")
}

fn render_secs(renderer: &mut Renderer, secs: f64) -> Vec<f32> {
    let mut buf = vec![0.0f32; (secs * SR as f64) as usize];
    renderer.render(&mut buf);
    buf
}

#[test]
fn one_step_per_schedule_at_120_bpm() {
    let (mut engine, mut renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Kick, pattern("x.x."));
    engine.start();
    assert_eq!(engine.step(Voice::Kick), 0);

    clock.advance(Duration::from_millis(125));
    let tick = engine.schedule();
    assert_eq!(engine.step(Voice::Kick), 1);
    assert_eq!(tick.notes, 1, "index 0 is active");
    render_secs(&mut renderer, 0.001);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);

    clock.advance(Duration::from_millis(125));
    let tick = engine.schedule();
    assert_eq!(engine.step(Voice::Kick), 2);
    assert_eq!(tick.notes, 0, "index 1 is inactive");
}

#[test]
fn offset_rotates_what_plays() {
    let (mut engine, _renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Snare, pattern("xx.."));
    engine.set_offset(Voice::Snare, 2);
    assert_eq!(engine.pattern(Voice::Snare).effective(), vec![false, false, true, true]);

    engine.start();
    let mut played = Vec::new();
    for _ in 0..4 {
        clock.advance(Duration::from_millis(125));
        played.push(engine.schedule().notes == 1);
    }
    assert_eq!(played, vec![false, false, true, true]);
}

#[test]
fn offset_two_on_alternating_pattern() {
    let (mut engine, _renderer, _clock) = engine_at(120.0);
    engine.load_pattern(Voice::Kick, pattern("x.x."));
    engine.set_offset(Voice::Kick, 2);
    let p = engine.pattern(Voice::Kick);
    let order: Vec<usize> = (0..4).filter_map(|i| p.source_index(i)).collect();
    assert_eq!(order, vec![2, 3, 0, 1]);
    assert_eq!(p.effective(), vec![true, false, true, false]);
}

#[test]
fn whole_loop_returns_to_start_for_any_tempo() {
    for bpm in [33.0, 90.0, 120.0, 177.7, 300.0] {
        for len in [1usize, 5, 16] {
            let (mut engine, _renderer, _clock) = engine_at(bpm);
            engine.set_pattern_length(Voice::Kick, len);
            engine.start();
            let dur = engine.step_duration();
            engine.advance(dur * 3.0);
            let before = engine.step(Voice::Kick);
            engine.advance(dur * len as f64);
            assert_eq!(engine.step(Voice::Kick), before, "bpm={bpm} len={len}");
        }
    }
}

#[test]
fn length_change_mid_run_keeps_everything_in_range() {
    let (mut engine, _renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Kick, pattern("x.x.x.x.x.x.x.x."));
    engine.set_offset(Voice::Kick, 13);
    engine.start();
    for n in [16usize, 3, 9, 1, 64, 2] {
        engine.set_pattern_length(Voice::Kick, n);
        let p = engine.pattern(Voice::Kick);
        assert!(p.offset() < p.length());
        assert!(engine.step(Voice::Kick) < p.length());
        clock.advance(Duration::from_millis(130));
        engine.schedule();
        assert!(engine.step(Voice::Kick) < engine.pattern(Voice::Kick).length());
    }
}

#[test]
fn edits_only_affect_later_boundaries() {
    let (mut engine, mut renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Kick, pattern("xxxx"));
    engine.start();

    clock.advance(Duration::from_millis(125));
    assert_eq!(engine.schedule().notes, 1);

    // silencing the pattern after dispatch leaves the queued note alone
    engine.set_pattern(Voice::Kick, &[false; 4]);
    render_secs(&mut renderer, 0.01);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);

    // edits between boundaries are picked up by the next one
    clock.advance(Duration::from_millis(60));
    engine.schedule();
    engine.set_pattern(Voice::Kick, &[true; 4]);
    clock.advance(Duration::from_millis(65));
    assert_eq!(engine.schedule().notes, 1);
}

#[test]
fn parameters_are_frozen_per_note() {
    let (mut engine, mut renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Kick, pattern("x"));
    let long = VoiceParameters { decay: 1.0, ..VoiceParameters::kick() };
    engine.set_voice_parameters(Voice::Kick, long);
    engine.start();
    clock.advance(Duration::from_millis(125));
    engine.schedule();
    render_secs(&mut renderer, 0.01);

    // a short decay set now does not cut the sounding note short
    engine.set_voice_parameters(Voice::Kick, VoiceParameters { decay: 0.0, ..long });
    render_secs(&mut renderer, 0.2);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);
    assert_eq!(engine.voice_parameters(Voice::Kick).decay, 0.0);
}

#[test]
fn stop_then_start_rewinds_every_voice() {
    let (mut engine, _renderer, clock) = engine_at(120.0);
    engine.start();
    clock.advance(Duration::from_millis(125 * 5));
    engine.schedule();
    assert_eq!(engine.step(Voice::Kick), 5);
    engine.stop();
    engine.start();
    for voice in Voice::ALL {
        assert_eq!(engine.step(voice), 0);
    }
}

#[test]
fn stop_fades_out_sounding_notes() {
    let (mut engine, mut renderer, clock) = engine_at(120.0);
    engine.set_voice_parameters(Voice::Kick, VoiceParameters { decay: 1.0, ..VoiceParameters::kick() });
    engine.load_pattern(Voice::Kick, pattern("x"));
    engine.start();
    clock.advance(Duration::from_millis(125));
    engine.schedule();
    render_secs(&mut renderer, 0.05);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);

    engine.stop();
    let tail = render_secs(&mut renderer, 0.02);
    assert_eq!(renderer.live_instances(Voice::Kick), 0);
    // faded, not cut: the first samples after stop are still sounding
    assert!(tail[..48].iter().any(|s| *s != 0.0));
    assert!(tail[tail.len() - 48..].iter().all(|s| *s == 0.0));
}

#[test]
fn late_schedule_keeps_every_step() {
    let (mut engine, _renderer, clock) = engine_at(120.0);
    engine.load_pattern(Voice::Snare, pattern("x.x.x.x."));
    engine.start();
    clock.advance(Duration::from_secs(1));
    let tick = engine.schedule();
    assert_eq!(tick.boundaries, 16);
    assert_eq!(tick.notes, 4);
    assert!(!tick.deferred);
    assert_eq!(engine.step(Voice::Snare), 0);
}

#[test]
fn starved_tick_is_capped_then_caught_up() {
    let clock = ManualClock::new();
    let config = EngineConfig::default().with_tempo(120.0).with_lookahead(0.0).with_max_boundaries_per_tick(8);
    let (mut engine, _renderer) = Engine::with_time_source(config, clock.clone());
    engine.start();
    clock.advance(Duration::from_secs(2));
    let first = engine.schedule();
    assert_eq!(first.boundaries, 8);
    assert!(first.deferred);
    let mut total = first.boundaries;
    while total < 32 {
        total += engine.schedule().boundaries;
    }
    assert_eq!(total, 32);
    assert_eq!(engine.step(Voice::Kick), 0);
}

#[test]
fn zero_decay_note_ends() {
    let (mut engine, mut renderer, _clock) = engine_at(120.0);
    for voice in Voice::ALL {
        let params = VoiceParameters { decay: 0.0, ..VoiceParameters::default_for(voice) };
        engine.play_voice_once(voice, params);
    }
    render_secs(&mut renderer, 0.005);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);
    assert_eq!(renderer.live_instances(Voice::Snare), 1);
    render_secs(&mut renderer, 0.1);
    assert_eq!(renderer.live_instances(Voice::Kick), 0);
    assert_eq!(renderer.live_instances(Voice::Snare), 0);
}

#[test]
fn envelope_is_monotonic_after_peak_and_bounded() {
    for i in 0..=20 {
        let env = DecayEnvelope::from_decay(i as f32 / 20.0);
        assert!(env.lifetime() < 6.0);
        let mut prev = env.amplitude(env.peak_age());
        let mut t = env.peak_age();
        while t <= env.lifetime() {
            let a = env.amplitude(t);
            assert!(a <= prev + 1e-6);
            prev = a;
            t += 0.001;
        }
    }
}

#[test]
fn lookahead_places_notes_on_the_grid_whatever_the_poll_period() {
    let clock = ManualClock::new();
    let config = EngineConfig::default().with_tempo(120.0).with_lookahead(0.25);
    let (mut engine, mut renderer) = Engine::with_time_source(config, clock.clone());
    engine.set_voice_parameters(Voice::Kick, VoiceParameters { decay: 0.0, ..VoiceParameters::kick() });
    engine.load_pattern(Voice::Kick, pattern("x"));
    engine.start();

    // one coarse tick covering two boundaries (at 0.125 s and 0.25 s)
    clock.advance(Duration::from_millis(250));
    assert_eq!(engine.schedule().notes, 2);
    let out = render_secs(&mut renderer, 0.3);

    let onset = |from: usize| from + out[from..].iter().position(|s| *s != 0.0).unwrap_or(out.len());
    let first = onset(0);
    let second = onset(first + 3_000);
    // delays are 0.25 - 0.125 and 0.25 - 0: one step apart
    assert!((6_000..6_004).contains(&first), "first onset at {first}");
    assert!((12_000..12_004).contains(&second), "second onset at {second}");
}

#[test]
fn channel_level_reaches_sounding_notes() {
    let (mut engine, mut renderer, _clock) = engine_at(120.0);
    let long = VoiceParameters { decay: 1.0, ..VoiceParameters::kick() };
    engine.play_voice_once(Voice::Kick, long);
    render_secs(&mut renderer, 0.01);
    engine.set_channel_level(Voice::Kick, 0.0);
    let out = render_secs(&mut renderer, 0.2);
    assert_eq!(renderer.live_instances(Voice::Kick), 1);
    let tail_peak = out[out.len() - 480..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(tail_peak < 1e-4, "tail peak {tail_peak}");
}

#[test]
fn monitor_sees_committed_state_from_another_thread() {
    let (mut engine, _renderer, clock) = engine_at(120.0);
    let monitor = engine.monitor();
    engine.load_pattern(Voice::Snare, pattern("x.x."));
    engine.start();
    clock.advance(Duration::from_millis(375));
    engine.schedule();
    let (step, running, pat) = std::thread::spawn(move || {
        (monitor.step(Voice::Snare), monitor.is_running(), monitor.pattern(Voice::Snare).to_string())
    })
    .join()
    .expect("monitor thread");
    assert_eq!(step, 3);
    assert!(running);
    assert_eq!(pat, "x.x.");
}
