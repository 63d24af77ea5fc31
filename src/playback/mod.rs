//! Playback of the recording.
//!
//! The recording is decoded fully into memory, which also yields its exact
//! duration, and then played through a cpal output stream at full volume.

pub mod decode;

use crate::recording::devices::{open_device, Direction};
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Playback gain; the recording is played back unattenuated.
const VOLUME: f32 = 1.0;

/// A decoded mono recording.
#[derive(Debug, Clone)]
pub struct Clip {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact length of the clip.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Length rounded up to whole seconds; how long playback blocks the session.
    pub fn blocking_duration(&self) -> Duration {
        Duration::from_secs(self.duration().as_secs_f64().ceil() as u64)
    }
}

/// A device that plays recordings back.
pub trait Playback {
    /// Opens and decodes the recording at `path`.
    fn open(&mut self, path: &Path) -> Result<Clip>;

    /// Starts playing `clip`; returns immediately.
    fn play(&mut self, clip: &Clip) -> Result<()>;

    /// Stops any clip that is still playing.
    fn stop(&mut self);
}

/// Plays through cpal on the configured output device.
pub struct CpalPlayback {
    /// Device name, index, or "default"
    device_name: String,
    stream: Option<cpal::Stream>,
}

impl CpalPlayback {
    pub fn new(device_name: String) -> Self {
        Self {
            device_name,
            stream: None,
        }
    }
}

impl Playback for CpalPlayback {
    fn open(&mut self, path: &Path) -> Result<Clip> {
        decode::decode_file(path)
    }

    fn play(&mut self, clip: &Clip) -> Result<()> {
        self.stop();
        if clip.is_empty() {
            tracing::warn!("Recording is empty, nothing to play");
            return Ok(());
        }

        let device = open_device(Direction::Output, &self.device_name)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown device".to_string());
        let device_config = device.default_output_config()?;
        let sample_format = device_config.sample_format();
        let config: cpal::StreamConfig = device_config.into();

        tracing::info!(
            "Playing {:.2}s clip recorded at {}Hz on {} ({}Hz, {} channels)",
            clip.duration().as_secs_f64(),
            clip.sample_rate(),
            device_name,
            config.sample_rate.0,
            config.channels
        );

        let stream = match sample_format {
            cpal::SampleFormat::I16 => build_output_stream::<i16>(&device, &config, clip)?,
            cpal::SampleFormat::U16 => build_output_stream::<u16>(&device, &config, clip)?,
            cpal::SampleFormat::I32 => build_output_stream::<i32>(&device, &config, clip)?,
            cpal::SampleFormat::F32 => build_output_stream::<f32>(&device, &config, clip)?,
            other => return Err(anyhow!("Unsupported output sample format: {other:?}")),
        };
        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Playback stream closed");
        }
    }
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    clip: &Clip,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let samples = Arc::clone(&clip.samples);
    let channels = config.channels.max(1) as usize;
    let step = clip.sample_rate() as f64 / config.sample_rate.0 as f64;
    let mut position = 0.0f64;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let value = T::from_sample(sample_at(&samples, position) * VOLUME);
                frame.fill(value);
                position += step;
            }
        },
        |err| {
            tracing::error!("Audio output stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}

/// Linearly interpolated sample at a fractional position; silence past the end.
fn sample_at(samples: &[f32], position: f64) -> f32 {
    let index = position.floor() as usize;
    let Some(&current) = samples.get(index) else {
        return 0.0;
    };
    let next = samples.get(index + 1).copied().unwrap_or(current);
    let fraction = (position - index as f64) as f32;
    current + (next - current) * fraction
}
