//! Fixed encoding settings for the recording file.

use std::fmt;

/// ffmpeg's native AAC encoder exposes quality through its coder choice;
/// `twoloop` is its medium-quality search.
const AAC_CODER: &str = "twoloop";

/// Audio settings for the recording: AAC in an MP4 container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
}

impl AudioSettings {
    /// The only settings sudovoice records with.
    pub const VOICE: AudioSettings = AudioSettings {
        sample_rate: 44_100,
        channels: 1,
        bit_rate: 192_000,
    };

    /// ffmpeg output arguments producing this encoding.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-acodec".to_string(),
            "aac".to_string(),
            "-aac_coder".to_string(),
            AAC_CODER.to_string(),
            "-b:a".to_string(),
            format!("{}k", self.bit_rate / 1000),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            self.channels.to_string(),
            "-f".to_string(),
            "mp4".to_string(),
        ]
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::VOICE
    }
}

impl fmt::Display for AudioSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AAC/MP4 {}Hz, {} channel(s), {} bit/s, {} coder",
            self.sample_rate, self.channels, self.bit_rate, AAC_CODER
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_settings() {
        let settings = AudioSettings::default();
        assert_eq!(settings.sample_rate, 44_100);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.bit_rate, 192_000);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = AudioSettings::VOICE.ffmpeg_args().join(" ");
        assert_eq!(
            args,
            "-acodec aac -aac_coder twoloop -b:a 192k -ar 44100 -ac 1 -f mp4"
        );
    }

    #[test]
    fn test_display_names_coder() {
        assert_eq!(
            AudioSettings::VOICE.to_string(),
            "AAC/MP4 44100Hz, 1 channel(s), 192000 bit/s, twoloop coder"
        );
    }
}
