//! Input level metering.
//!
//! Levels are reported in dBFS over the most recent window of captured samples and
//! rendered as a run of meter glyphs, one per dB above the meter floor.

/// Level reported for a window with no signal at all.
pub const SILENCE_DB: f32 = -160.0;

/// dB below full scale at which the meter shows zero glyphs.
pub const METER_FLOOR_DB: f32 = 30.0;

/// Peak and average power of the latest captured audio, in dBFS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputLevel {
    pub average_db: f32,
    pub peak_db: f32,
}

impl InputLevel {
    pub const SILENT: InputLevel = InputLevel {
        average_db: SILENCE_DB,
        peak_db: SILENCE_DB,
    };

    /// Measures a window of 16-bit PCM samples.
    ///
    /// Average power is the RMS level; peak power is the largest absolute sample.
    pub fn from_samples(samples: &[i16]) -> Self {
        if samples.is_empty() {
            return Self::SILENT;
        }

        let sum_of_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        let rms = (sum_of_squares / samples.len() as f64).sqrt();
        let peak = samples
            .iter()
            .map(|&s| (s as i32).unsigned_abs())
            .max()
            .unwrap_or(0);

        Self {
            average_db: to_dbfs(rms),
            peak_db: to_dbfs(peak as f64),
        }
    }
}

fn to_dbfs(amplitude: f64) -> f32 {
    if amplitude > 0.0 {
        (20.0 * (amplitude / i16::MAX as f64).log10()) as f32
    } else {
        SILENCE_DB
    }
}

/// Number of meter glyphs for a level: `max(0, floor(30 + level_db))`.
pub fn meter_width(level_db: f32) -> usize {
    let width = (METER_FLOOR_DB + level_db).floor();
    if width.is_finite() && width > 0.0 {
        width as usize
    } else {
        0
    }
}
