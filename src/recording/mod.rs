//! Audio capture for sudovoice.
//!
//! Provides the microphone capture device, input level metering, the fixed
//! encoding settings and ffmpeg-based AAC encoding.

pub mod capture;
pub mod devices;
pub mod ffmpeg;
pub mod level;
pub mod settings;

pub use capture::{event_channel, Capture, CaptureEvent, CaptureEventReceiver, CpalCapture, Take};
pub use level::{meter_width, InputLevel};
pub use settings::AudioSettings;
