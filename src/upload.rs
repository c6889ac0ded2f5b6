//! Upload gate: accepts WAV/MP3 uploads and stages them on disk for the
//! evaluation pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::evaluation::{EvaluationError, StagedAudio};

/// Audio containers accepted for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioContainer {
    Wav,
    Mp3,
}

impl AudioContainer {
    /// Classify a file name by its extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

/// Errors raised while accepting or evaluating an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file name does not end in `.wav` or `.mp3`.
    #[error("Unsupported upload {file_name}: only WAV and MP3 files are accepted")]
    UnsupportedExtension {
        /// Name supplied by the client.
        file_name: String,
    },
    /// The upload exceeds the configured size limit.
    #[error("Upload is {size} bytes, above the {limit}-byte limit")]
    TooLarge {
        /// Upload size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// Writing the staged copy failed.
    #[error("Failed to stage upload in {dir}: {source}")]
    Stage {
        /// Staging directory.
        dir: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The staged upload failed evaluation.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl UploadError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension { .. } => "unsupported_extension",
            Self::TooLarge { .. } => "upload_too_large",
            Self::Stage { .. } => "staging_failed",
            Self::Evaluation(err) => err.code(),
        }
    }
}

/// Validate an upload and write it to a uniquely named file in `dir`.
///
/// Empty uploads are staged as-is; rejecting them is the decoder's job.
pub fn stage_upload(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
    max_bytes: u64,
) -> Result<StagedAudio, UploadError> {
    let container =
        AudioContainer::from_file_name(file_name).ok_or_else(|| UploadError::UnsupportedExtension {
            file_name: file_name.to_string(),
        })?;
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let stage_err = |source| UploadError::Stage {
        dir: dir.to_path_buf(),
        source,
    };
    let suffix = format!(".{}", container.extension());
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(stage_err)?;
    file.write_all(bytes).map_err(stage_err)?;
    file.flush().map_err(stage_err)?;
    let staged = StagedAudio::from_temp_path(file.into_temp_path()).map_err(stage_err)?;
    debug!("Staged {size}-byte upload at {}", staged.path().display());
    Ok(staged)
}
