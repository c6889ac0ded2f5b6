use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

/// An on-disk audio file owned by one evaluation. Dropping the guard deletes
/// the file, whichever way the evaluation ends.
#[derive(Debug)]
pub struct StagedAudio {
    path: PathBuf,
}

impl StagedAudio {
    /// Take ownership of an existing file; it is removed when the guard drops.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Take over a `tempfile` path so this guard, not `tempfile`, removes it.
    pub fn from_temp_path(temp: TempPath) -> io::Result<Self> {
        let path = temp.keep().map_err(|err| err.error)?;
        Ok(Self::adopt(path))
    }

    /// Copy `source` into `dir` and own the copy; `source` is left untouched.
    pub fn copy_into(dir: &Path, source: &Path) -> io::Result<Self> {
        let suffix = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let temp = tempfile::Builder::new()
            .prefix("staged-")
            .suffix(&suffix)
            .tempfile_in(dir)?
            .into_temp_path();
        std::fs::copy(source, &temp)?;
        Self::from_temp_path(temp)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedAudio {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged audio {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Failed to remove staged audio {}: {err}",
                self.path.display()
            ),
        }
    }
}
