//! Thump CLI: real-time drum machine player and offline renderer.
//!
//! `play` opens an output device and drives the engine the way an interactive front end
//! would: a coarse timer calls `schedule()`, and the step display is polled in between.
//! `render` does the same against a frame-counted clock and writes a WAV file.

mod audio;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cpal::traits::{DeviceTrait, StreamTrait};
use thump_engine::{Engine, EngineConfig, Monitor, Pattern, TimeSource, Voice, Waveform};

/// Kick + snare step sequencer
#[derive(Parser)]
#[command(name = "thump")]
#[command(version, about)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play patterns on an output device
    Play {
        #[command(flatten)]
        groove: GrooveArgs,

        /// Output device name (see `devices`)
        #[arg(long)]
        device: Option<String>,

        /// Requested sample rate (Hz)
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Requested channel count
        #[arg(long)]
        channels: Option<u16>,

        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration: Option<f64>,

        /// What musical time is measured against
        #[arg(long, value_enum, default_value = "audio")]
        clock: ClockSource,

        /// Don't draw the step display
        #[arg(long)]
        quiet: bool,
    },

    /// Render patterns to a mono 32-bit float WAV file
    Render {
        #[command(flatten)]
        groove: GrooveArgs,

        /// Output file
        #[arg(short, long, default_value = "thump.wav")]
        out: PathBuf,

        /// Length of the render in seconds
        #[arg(long, default_value = "8")]
        duration: f64,

        #[arg(long, default_value = "48000")]
        sample_rate: u32,
    },

    /// List output devices
    Devices,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ClockSource {
    /// Monotonic system clock
    Wall,
    /// Frames rendered by the output stream
    Audio,
}

/// Tempo, patterns and voice settings shared by `play` and `render`.
#[derive(Args, Debug)]
struct GrooveArgs {
    /// Tempo in BPM
    #[arg(short, long, default_value = "90")]
    tempo: f64,

    /// Kick steps: x = hit, . = rest (spaces and | are ignored)
    #[arg(long, default_value = "x...x...x...x...")]
    kick: Pattern,

    /// Snare steps
    #[arg(long, default_value = "....x.......x...")]
    snare: Pattern,

    #[arg(long)]
    kick_length: Option<usize>,

    #[arg(long)]
    snare_length: Option<usize>,

    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    kick_offset: i64,

    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    snare_offset: i64,

    /// Kick oscillator: sine, square, saw, triangle, noise
    #[arg(long)]
    kick_wave: Option<Waveform>,

    #[arg(long)]
    snare_wave: Option<Waveform>,

    /// Kick base frequency (Hz)
    #[arg(long)]
    kick_freq: Option<f32>,

    /// Snare base frequency (Hz)
    #[arg(long)]
    snare_freq: Option<f32>,

    /// Kick decay, 0..1
    #[arg(long)]
    kick_decay: Option<f32>,

    /// Snare decay, 0..1
    #[arg(long)]
    snare_decay: Option<f32>,

    /// Snare noise/tone mix, 0..1
    #[arg(long)]
    snare_blend: Option<f32>,

    /// Delay every snare hit by this many seconds (0..0.25)
    #[arg(long)]
    snare_nudge: Option<f64>,

    /// Interval between `schedule()` calls in milliseconds
    #[arg(long, default_value = "20")]
    tick_ms: u64,

    /// Scheduling lookahead in seconds; keep it above the tick interval
    #[arg(long, default_value = "0.05")]
    lookahead: f64,

    /// Master gain applied after the mix
    #[arg(short, long, default_value = "0.8")]
    gain: f32,
}

impl GrooveArgs {
    fn config(&self, sample_rate: f32) -> EngineConfig {
        EngineConfig::default()
            .with_sample_rate(sample_rate)
            .with_tempo(self.tempo)
            .with_lookahead(self.lookahead)
    }

    fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Load patterns and voice settings into a fresh engine.
    fn apply<T: TimeSource>(&self, engine: &mut Engine<T>) {
        let voices = [
            (Voice::Kick, &self.kick, self.kick_length, self.kick_offset, self.kick_wave, self.kick_freq, self.kick_decay),
            (Voice::Snare, &self.snare, self.snare_length, self.snare_offset, self.snare_wave, self.snare_freq, self.snare_decay),
        ];
        for (voice, pattern, length, offset, wave, freq, decay) in voices {
            engine.load_pattern(voice, pattern.clone());
            if let Some(n) = length {
                engine.set_pattern_length(voice, n);
            }
            engine.set_offset(voice, offset);

            let mut params = engine.voice_parameters(voice);
            if let Some(w) = wave { params.waveform = w; }
            if let Some(f) = freq { params.frequency = f; }
            if let Some(d) = decay { params.decay = d; }
            if voice == Voice::Snare {
                if let Some(b) = self.snare_blend { params.blend = b; }
            }
            engine.set_voice_parameters(voice, params);
        }
        if let Some(n) = self.snare_nudge {
            engine.set_nudge(Voice::Snare, n);
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Devices => audio::list_output_devices(),
        Commands::Play { groove, device, sample_rate, channels, duration, clock, quiet } => {
            play(&groove, device.as_deref(), sample_rate, channels, duration, clock, quiet)
        }
        Commands::Render { groove, out, duration, sample_rate } => render(&groove, &out, duration, sample_rate),
    }
}

fn play(
    groove: &GrooveArgs,
    device: Option<&str>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    duration: Option<f64>,
    clock: ClockSource,
    quiet: bool,
) -> Result<()> {
    let device = audio::pick_device(device)?;
    let sup_cfg = audio::choose_config(&device, sample_rate, channels)?;
    let sample_format = sup_cfg.sample_format();
    let cfg = sup_cfg.config();
    let config = groove.config(cfg.sample_rate.0 as f32);

    println!("Using device: {}", device.name().unwrap_or_else(|_| "<unnamed>".into()));
    println!("Stream config: {cfg:?} (sample_format: {sample_format:?})");
    println!("Tempo: {:.1} BPM | Tick: {} ms | Clock: {clock:?}", groove.tempo, groove.tick_ms);

    match clock {
        ClockSource::Wall => {
            let (engine, renderer) = Engine::new(config);
            let stream = audio::open_stream(&device, &cfg, sample_format, renderer, groove.gain)?;
            drive(engine, &stream, groove, duration, quiet)
        }
        ClockSource::Audio => {
            let (engine, renderer) = Engine::with_frame_clock(config);
            let stream = audio::open_stream(&device, &cfg, sample_format, renderer, groove.gain)?;
            drive(engine, &stream, groove, duration, quiet)
        }
    }
}

/// Timer loop: `schedule()` every tick, step display redrawn several times per tick.
fn drive<T: TimeSource>(
    mut engine: Engine<T>,
    stream: &cpal::Stream,
    groove: &GrooveArgs,
    duration: Option<f64>,
    quiet: bool,
) -> Result<()> {
    groove.apply(&mut engine);
    stream.play().context("starting output stream")?;
    engine.start();

    let monitor = engine.monitor();
    let tick = groove.tick();
    let poll = tick / 4;
    let began = Instant::now();
    let mut next_tick = began;
    let mut shown = None;

    loop {
        let now = Instant::now();
        if now >= next_tick {
            engine.schedule();
            next_tick += tick;
        }
        if !quiet {
            let steps = (monitor.step(Voice::Kick), monitor.step(Voice::Snare));
            if shown != Some(steps) {
                draw(&monitor)?;
                shown = Some(steps);
            }
        }
        if duration.map_or(false, |d| began.elapsed().as_secs_f64() >= d) {
            break;
        }
        std::thread::sleep(poll.min(next_tick.saturating_duration_since(Instant::now())).max(Duration::from_millis(1)));
    }

    engine.stop();
    // let the release fade play out
    std::thread::sleep(Duration::from_millis(100));
    if !quiet {
        println!();
    }
    if engine.dropped_commands() > 0 {
        tracing::warn!(dropped = engine.dropped_commands(), "notes were dropped");
    }
    Ok(())
}

fn draw(monitor: &Monitor) -> Result<()> {
    let mut line = String::new();
    for voice in Voice::ALL {
        let pattern = monitor.pattern(voice);
        // the step reported is the one that plays next; mark the one that just played
        let len = pattern.length();
        let playing = (monitor.step(voice) + len - 1) % len;
        line.push_str(&format!("{voice:>5} "));
        for i in 0..len {
            let c = match (i == playing, pattern.is_active(i)) {
                (true, true) => 'X',
                (true, false) => '_',
                (false, true) => 'x',
                (false, false) => '.',
            };
            line.push(c);
        }
        line.push_str("  ");
    }
    let mut out = std::io::stdout().lock();
    write!(out, "\r{line}")?;
    out.flush()?;
    Ok(())
}

fn render(groove: &GrooveArgs, path: &Path, duration: f64, sample_rate: u32) -> Result<()> {
    let sr = sample_rate.max(1);
    let (mut engine, mut renderer) = Engine::with_frame_clock(groove.config(sr as f32));
    groove.apply(&mut engine);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sr,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    let block = ((groove.tick().as_secs_f64() * f64::from(sr)) as usize).max(1);
    let total = (duration.max(0.0) * f64::from(sr)) as usize;
    let mut buf = vec![0.0f32; block];
    let gain = groove.gain;

    engine.start();
    let mut written = 0usize;
    while written < total {
        engine.schedule();
        let n = block.min(total - written);
        renderer.render(&mut buf[..n]);
        for s in &buf[..n] {
            writer.write_sample((s * gain).clamp(-1.0, 1.0))?;
        }
        written += n;
    }

    // release tail
    engine.stop();
    let tail = (0.05 * f64::from(sr)) as usize;
    buf.resize(tail.max(block), 0.0);
    renderer.render(&mut buf[..tail]);
    for s in &buf[..tail] {
        writer.write_sample((s * gain).clamp(-1.0, 1.0))?;
    }
    writer.finalize().context("finalizing wav")?;

    tracing::info!(path = %path.display(), frames = written + tail, "render finished");
    println!("Wrote {} ({:.2} s at {} Hz)", path.display(), (written + tail) as f64 / f64::from(sr), sr);
    Ok(())
}
