use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use cwazy_cw::AudioError;
use regex::Regex;
use ringbuf::HeapConsumer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::render::{Command, Renderer};

/// Start an output stream on the default (or regex-matched) device that
/// renders the graph described by `commands`.
///
/// The callback publishes the number of frames rendered so far to `clock`.
/// Noise nodes are seeded from `noise_seed`. Returns the playing stream and
/// its sample rate.
pub(crate) fn start_output(
    device_regex: Option<&str>,
    commands: HeapConsumer<Command>,
    clock: Arc<AtomicU64>,
    noise_seed: u32,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let device = select_output_device(&host, device_regex)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Device(e.to_string()))?;
    let sample_format = config.sample_format();
    let config: cpal::StreamConfig = config.into();
    let sample_rate_hz = config.sample_rate.0;

    log::info!(
        "audio output: {} ({} Hz, {} channels, {:?})",
        device.name().unwrap_or_else(|_| "<unknown>".to_string()),
        sample_rate_hz,
        config.channels,
        sample_format
    );

    let renderer = Renderer::new(sample_rate_hz as f32, noise_seed);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config, renderer, commands, clock)?
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &config, renderer, commands, clock)?
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &config, renderer, commands, clock)?
        }
        other => {
            return Err(AudioError::Device(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    Ok((stream, sample_rate_hz))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
    mut commands: HeapConsumer<Command>,
    clock: Arc<AtomicU64>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let err_fn = |err| log::warn!("audio stream error: {}", err);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                while let Some(command) = commands.pop() {
                    renderer.apply(command);
                }
                renderer.render(data, channels, |s: f32| T::from_sample(s));
                clock.store(renderer.frame(), Ordering::Release);
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

fn select_output_device(
    host: &cpal::Host,
    device_regex: Option<&str>,
) -> Result<cpal::Device, AudioError> {
    if let Some(pattern) = device_regex {
        let re = Regex::new(pattern).map_err(|e| AudioError::Device(e.to_string()))?;
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        for dev in devices {
            let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
            if re.is_match(&name) {
                return Ok(dev);
            }
        }
        return Err(AudioError::Device(format!(
            "no output device matched {:?}",
            pattern
        )));
    }

    host.default_output_device()
        .ok_or_else(|| AudioError::Device("no default output device available".to_string()))
}
