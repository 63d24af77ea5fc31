//! Microphone capture.
//!
//! `CpalCapture` records from an input device into an in-memory mono PCM buffer,
//! answers level queries from the most recent samples, and on stop writes the take
//! to a temporary WAV that ffmpeg encodes into the destination file.
//!
//! Stream failures are reported asynchronously as `CaptureEvent`s on a channel, so
//! the device thread never touches session state.

use super::devices::{open_device, Direction};
use super::ffmpeg;
use super::level::InputLevel;
use super::settings::AudioSettings;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use hound::WavWriter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Asynchronous notification from a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Capture ended without being asked to stop
    Completed { success: bool },
    /// The capture engine reported an error
    Failed(String),
}

pub type CaptureEventSender = mpsc::UnboundedSender<CaptureEvent>;
pub type CaptureEventReceiver = mpsc::UnboundedReceiver<CaptureEvent>;

/// Creates the channel a capture device reports its events on.
pub fn event_channel() -> (CaptureEventSender, CaptureEventReceiver) {
    mpsc::unbounded_channel()
}

/// What a stopped capture left at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    /// The recording was encoded to the destination
    Saved,
    /// Nothing was captured; any previous file at the destination was removed
    Empty,
}

/// A device that records microphone input to a file.
pub trait Capture {
    /// Starts recording; the file at `destination` is replaced when capture stops.
    fn start(&mut self, destination: &Path, settings: &AudioSettings) -> Result<()>;

    /// Level of the most recently captured audio.
    fn current_level(&self) -> InputLevel;

    /// Stops recording and writes the file.
    fn stop(&mut self) -> Result<Take>;
}

/// Length of the window level queries are measured over.
const LEVEL_WINDOW_DIVISOR: u32 = 20;

/// Records through cpal from the configured input device.
pub struct CpalCapture {
    /// Device name, index, or "default"
    device_name: String,
    events: CaptureEventSender,
    /// Captured samples (i16 PCM mono)
    samples: Arc<Mutex<Vec<i16>>>,
    /// Active input stream, kept alive while recording
    stream: Option<cpal::Stream>,
    /// Native rate of the device being recorded
    device_sample_rate: u32,
    /// Finds the encoder before any audio is captured
    locate_encoder: fn() -> Result<PathBuf>,
    target: Option<Target>,
}

/// Where and how the current take is saved.
struct Target {
    destination: PathBuf,
    ffmpeg_path: PathBuf,
    settings: AudioSettings,
}

impl CpalCapture {
    pub fn new(device_name: String, events: CaptureEventSender) -> Self {
        Self {
            device_name,
            events,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            device_sample_rate: AudioSettings::VOICE.sample_rate,
            locate_encoder: ffmpeg::find_ffmpeg,
            target: None,
        }
    }

    fn lock_samples(&self) -> MutexGuard<'_, Vec<i16>> {
        lock(&self.samples)
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample,
        i16: FromSample<T>,
    {
        let samples = Arc::clone(&self.samples);
        let channels = config.channels as usize;
        let events = self.events.clone();

        let stream = device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                append_mono(data, &samples, channels);
            },
            move |err| {
                tracing::error!("Audio input stream error: {}", err);
                let event = match err {
                    cpal::StreamError::DeviceNotAvailable => CaptureEvent::Completed { success: false },
                    other => CaptureEvent::Failed(other.to_string()),
                };
                // The session may already have gone away.
                let _ = events.send(event);
            },
            None,
        )?;
        Ok(stream)
    }

    fn write_wav(&self, samples: &[i16], path: &Path) -> Result<()> {
        let wav_spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.device_sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, wav_spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        tracing::debug!("Temporary WAV created: {}", path.display());
        Ok(())
    }
}

impl Capture for CpalCapture {
    fn start(&mut self, destination: &Path, settings: &AudioSettings) -> Result<()> {
        if self.stream.is_some() {
            return Err(anyhow!("Recording already in progress"));
        }

        // A take that cannot be encoded is refused before it is recorded.
        let ffmpeg_path = (self.locate_encoder)()?;

        let device = open_device(Direction::Input, &self.device_name)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let sample_format = device_config.sample_format();
        let config: cpal::StreamConfig = device_config.into();

        if config.sample_rate.0 != settings.sample_rate {
            tracing::info!(
                "Device records at {}Hz; the file will be resampled to {}Hz",
                config.sample_rate.0,
                settings.sample_rate
            );
        }
        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        self.device_sample_rate = config.sample_rate.0;
        self.lock_samples().clear();

        let stream = match sample_format {
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &config)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &config)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(&device, &config)?,
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &config)?,
            other => return Err(anyhow!("Unsupported input sample format: {other:?}")),
        };

        stream.play()?;
        self.stream = Some(stream);
        self.target = Some(Target {
            destination: destination.to_path_buf(),
            ffmpeg_path,
            settings: *settings,
        });

        tracing::info!("Recording to {} ({})", destination.display(), settings);
        Ok(())
    }

    fn current_level(&self) -> InputLevel {
        let samples = self.lock_samples();
        let window = (self.device_sample_rate / LEVEL_WINDOW_DIVISOR).max(1) as usize;
        let start = samples.len().saturating_sub(window);
        InputLevel::from_samples(&samples[start..])
    }

    fn stop(&mut self) -> Result<Take> {
        // Dropping the stream stops the device callback.
        if self.stream.take().is_none() {
            return Ok(Take::Empty);
        }
        let Some(Target {
            destination,
            ffmpeg_path,
            settings,
        }) = self.target.take()
        else {
            return Ok(Take::Empty);
        };

        let samples = std::mem::take(&mut *self.lock_samples());
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
            remove_previous_take(&destination)?;
            return Ok(Take::Empty);
        }

        let duration_secs = samples.len() as f32 / self.device_sample_rate as f32;
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            samples.len(),
            self.device_sample_rate
        );

        let temp_wav = std::env::temp_dir().join(format!("sudovoice_{}.wav", std::process::id()));
        self.write_wav(&samples, &temp_wav)?;
        let encoded = ffmpeg::encode(&ffmpeg_path, &temp_wav, &destination, &settings);

        if let Err(e) = fs::remove_file(&temp_wav) {
            tracing::debug!("Failed to remove temp file: {}", e);
        }
        encoded?;

        let file_size = fs::metadata(&destination)?.len();
        tracing::info!("Audio saved: {} ({} bytes)", destination.display(), file_size);
        Ok(Take::Saved)
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        if self.stream.is_some() {
            tracing::warn!("Capture dropped while recording; discarding take");
        }
    }
}

/// Deletes an earlier recording so an empty take cannot be mistaken for it.
fn remove_previous_take(destination: &Path) -> Result<()> {
    match fs::remove_file(destination) {
        Ok(()) => {
            tracing::info!("Removed previous recording {}", destination.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow!(
            "Unable to remove previous recording {}: {e}",
            destination.display()
        )),
    }
}

fn lock(samples: &Mutex<Vec<i16>>) -> MutexGuard<'_, Vec<i16>> {
    samples.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Downmixes interleaved device samples to mono i16 and appends them.
fn append_mono<T>(data: &[T], samples: &Mutex<Vec<i16>>, channels: usize)
where
    T: Sample,
    i16: FromSample<T>,
{
    let mut samples = lock(samples);
    if channels <= 1 {
        samples.extend(data.iter().map(|&s| s.to_sample::<i16>()));
        return;
    }
    for frame in data.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s.to_sample::<i16>() as i32).sum();
        samples.push((sum / channels as i32) as i16);
    }
}
