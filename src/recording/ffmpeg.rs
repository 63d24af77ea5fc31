//! AAC encoding through the ffmpeg binary.
//!
//! Captured PCM is written to a temporary WAV file and handed to ffmpeg, which
//! produces the final AAC/MP4 recording. ffmpeg is looked up in the usual install
//! locations before falling back to a PATH search.

use super::settings::AudioSettings;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locates the ffmpeg binary on the system.
///
/// # Errors
/// - If ffmpeg is neither in a standard location nor on PATH
pub fn find_ffmpeg() -> Result<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/usr/bin/ffmpeg",
        ]
    } else if cfg!(target_os = "linux") {
        &[
            "/usr/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/snap/bin/ffmpeg",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };

    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", path.display());
        return Ok(path);
    }

    let ffmpeg_path = find_in_path("ffmpeg")?;
    tracing::debug!("Found ffmpeg in PATH at: {}", ffmpeg_path.display());
    Ok(ffmpeg_path)
}

/// Searches PATH using `which` (Unix) or `where` (Windows).
fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first) = stdout.lines().next().map(str::trim).filter(|l| !l.is_empty()) {
            return Ok(PathBuf::from(first));
        }
    }

    Err(anyhow!(
        "ffmpeg not found. Please install ffmpeg:\n\
         macOS: brew install ffmpeg\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
         Windows: Download from https://ffmpeg.org/download.html"
    ))
}

/// Builds the full ffmpeg argument list for one encode.
fn encode_args(input_wav: &Path, output_path: &Path, settings: &AudioSettings) -> Vec<String> {
    let mut args = vec![
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input_wav.to_string_lossy().to_string(),
    ];
    args.extend(settings.ffmpeg_args());
    args.push("-y".to_string());
    args.push(output_path.to_string_lossy().to_string());
    args
}

/// Encodes `input_wav` into `output_path` with the ffmpeg at `ffmpeg_path`,
/// overwriting the output.
///
/// # Errors
/// - If ffmpeg cannot be started
/// - If ffmpeg exits unsuccessfully
pub fn encode(
    ffmpeg_path: &Path,
    input_wav: &Path,
    output_path: &Path,
    settings: &AudioSettings,
) -> Result<()> {
    let output = Command::new(ffmpeg_path)
        .args(encode_args(input_wav, output_path, settings))
        .output()
        .map_err(|e| anyhow!("Failed to run ffmpeg: {e}"))?;

    if output.status.success() {
        tracing::debug!("Encoded {} -> {}", input_wav.display(), output_path.display());
        Ok(())
    } else {
        let error_msg = String::from_utf8_lossy(&output.stderr);
        tracing::error!("ffmpeg encoding failed: {}", error_msg);
        Err(anyhow!("Audio encoding failed: {}", error_msg.trim()))
    }
}
