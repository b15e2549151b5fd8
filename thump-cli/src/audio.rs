//! Output device selection and the cpal stream around the renderer.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use thump_engine::{Output, Renderer};

pub fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices ({}):", host.id().name());
    let default = host.default_output_device().and_then(|d| d.name().ok());
    for dev in host.output_devices().context("enumerating output devices")? {
        let name = dev.name().unwrap_or_else(|_| "<unnamed>".into());
        let mark = if default.as_deref() == Some(name.as_str()) { " (default)" } else { "" };
        println!("- {name}{mark}");
    }
    Ok(())
}

pub fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices().context("enumerating output devices")? {
            if d.name().map(|n| n == name).unwrap_or(false) {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device().ok_or_else(|| anyhow!("no default output device"))
}

pub fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return device.default_output_config().context("querying default output config");
    }

    // Pick the closest SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs().context("querying output configs")? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => u64::from(ch.abs_diff(c)), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) if (sr_min..=sr_max).contains(&sr) => 0,
            Some(sr) => u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))),
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("device reports no output configs"))?;
    let sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(sr))
}

/// Open an output stream for `sample_format`, feeding every channel the renderer's mono mix.
pub fn open_stream(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    renderer: Renderer,
    gain: f32,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, cfg, renderer, gain),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, cfg, renderer, gain),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, cfg, renderer, gain),
        other => bail!("unsupported device sample format: {other:?}"),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    renderer: Renderer,
    gain: f32,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let sr = cfg.sample_rate.0 as f32;
    let channels = usize::from(cfg.channels).max(1);
    let mut out = Output::new(renderer, sr);

    let err_fn = |e: cpal::StreamError| {
        let s = e.to_string();
        // under/overruns are routine on busy machines
        if s.contains("underrun") || s.contains("overrun") {
            tracing::debug!(error = %s, "stream xrun");
        } else {
            tracing::error!(error = %s, "stream error");
        }
    };

    let stream = device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in output.chunks_mut(channels) {
                    let s = (out.next(sr) * gain).clamp(-1.0, 1.0);
                    let v: T = T::from_sample(s);
                    for ch in frame.iter_mut() {
                        *ch = v;
                    }
                }
            },
            err_fn,
            None,
        )
        .context("building output stream")?;
    Ok(stream)
}
