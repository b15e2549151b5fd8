//! Criterion benchmarks for the render path.
//!
//! Run with: cargo bench -p thump-engine

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use thump_engine::mixer::MAX_INSTANCES;
use thump_engine::{Engine, EngineConfig, ManualClock, Voice, VoiceParameters};

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK: usize = 512;

fn bench_render_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_block");
    group.throughput(Throughput::Elements(BLOCK as u64));

    for notes in [1usize, 4, MAX_INSTANCES] {
        group.bench_with_input(BenchmarkId::new("notes_per_voice", notes), &notes, |b, &notes| {
            let config = EngineConfig::default().with_sample_rate(SAMPLE_RATE).with_command_capacity(1024);
            let (mut engine, mut renderer) = Engine::with_time_source(config, ManualClock::new());
            let mut buf = vec![0.0f32; BLOCK];
            b.iter(|| {
                for voice in Voice::ALL {
                    for _ in 0..notes {
                        let long = VoiceParameters { decay: 1.0, ..VoiceParameters::default_for(voice) };
                        engine.play_voice_once(voice, long);
                    }
                }
                renderer.render(black_box(&mut buf));
            });
        });
    }
    group.finish();
}

fn bench_schedule(c: &mut Criterion) {
    let clock = ManualClock::new();
    let config = EngineConfig::default().with_lookahead(0.0).with_command_capacity(4096);
    let (mut engine, mut renderer) = Engine::with_time_source(config, clock.clone());
    engine.load_pattern(Voice::Kick, "x...x...x...x...".parse().expect("pattern"));
    engine.load_pattern(Voice::Snare, "....x.......x...".parse().expect("pattern"));
    engine.start();
    let mut buf = vec![0.0f32; BLOCK];

    c.bench_function("schedule_20ms_tick", |b| {
        b.iter(|| {
            clock.advance(Duration::from_millis(20));
            black_box(engine.schedule());
            renderer.render(&mut buf);
        });
    });
}

criterion_group!(benches, bench_render_block, bench_schedule);
criterion_main!(benches);
