//! Output file validation and destination resolution.
//!
//! The `--out-file` argument is classified once at startup. An empty argument
//! falls back to `~/.sudovoice/recording.m4a`; a directory, or a file whose
//! parent directory does not exist, is refused.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hidden directory under the user's home that holds the default recording.
pub const DEFAULT_DIR_NAME: &str = ".sudovoice";

/// File name of the default recording.
pub const DEFAULT_FILE_NAME: &str = "recording.m4a";

/// Classification of a user-supplied output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// No path was supplied
    Empty,
    /// The path can be written (its parent exists, or it is an existing file)
    Ok,
    /// The path names an existing directory
    DirectoryProvided,
    /// The path's parent directory does not exist
    DirectoryNotFound,
}

/// Reasons the recording destination cannot be used.
#[derive(Debug, Error)]
pub enum OutputPathError {
    #[error("Please provide a path and file name, not just a directory: {}", .0.display())]
    DirectoryProvided(PathBuf),

    #[error("Directory not found for: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("Unable to create {}: {}", .path.display(), .source)]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Classifies `path` without touching the filesystem beyond existence checks.
pub fn classify(path: &str) -> PathStatus {
    if path.is_empty() {
        return PathStatus::Empty;
    }

    let candidate = Path::new(path);
    if candidate.exists() {
        return if candidate.is_dir() {
            PathStatus::DirectoryProvided
        } else {
            PathStatus::Ok
        };
    }

    // A trailing separator names a directory, so that directory is what must exist.
    let parent = if path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) {
        candidate
    } else {
        match candidate.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    };

    if parent.exists() {
        PathStatus::Ok
    } else {
        PathStatus::DirectoryNotFound
    }
}

/// Resolves the recording destination for the given `--out-file` value.
///
/// With an empty value the default `<home>/.sudovoice/recording.m4a` is used and its
/// directory is created when missing. `home` is the user's home directory, if known.
///
/// # Errors
/// - If the path is a directory or its parent directory does not exist
/// - If the default directory cannot be created
pub fn resolve_output_location(
    out_file: &str,
    home: Option<&Path>,
) -> Result<PathBuf, OutputPathError> {
    match classify(out_file) {
        PathStatus::Ok => Ok(PathBuf::from(out_file)),
        PathStatus::DirectoryProvided => Err(OutputPathError::DirectoryProvided(out_file.into())),
        PathStatus::DirectoryNotFound => Err(OutputPathError::DirectoryNotFound(out_file.into())),
        PathStatus::Empty => {
            let hidden_dir = home
                .ok_or(OutputPathError::NoHomeDirectory)?
                .join(DEFAULT_DIR_NAME);
            fs::create_dir_all(&hidden_dir).map_err(|source| OutputPathError::CreateDirectory {
                path: hidden_dir.clone(),
                source,
            })?;
            tracing::debug!("Using default recording directory {}", hidden_dir.display());
            Ok(hidden_dir.join(DEFAULT_FILE_NAME))
        }
    }
}
