//! Request-scoped upload files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{RulError, RulResult};

/// An uploaded payload persisted to a uniquely named file.
///
/// The file is removed by [`TransientUpload::cleanup`] or, failing that, when
/// the value is dropped. Dropping covers early returns and cancelled request
/// futures alike.
#[derive(Debug)]
pub struct TransientUpload {
    path: PathBuf,
    removed: bool,
}

impl TransientUpload {
    /// Write `bytes` to `dir/upload-<uuid>.bin`.
    ///
    /// The guard exists before the write starts, so a partial file from a
    /// failed or cancelled write is removed as well.
    pub async fn persist(dir: &Path, bytes: &[u8]) -> RulResult<Self> {
        let upload = Self {
            path: dir.join(format!("upload-{}.bin", Uuid::new_v4())),
            removed: false,
        };

        tokio::fs::write(&upload.path, bytes).await.map_err(|e| {
            RulError::Io(format!(
                "failed to persist upload to {}: {}",
                upload.path.display(),
                e
            ))
        })?;

        debug!(path = %upload.path.display(), bytes = bytes.len(), "Persisted upload");
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted bytes back.
    pub async fn read(&self) -> RulResult<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            RulError::Io(format!("failed to read upload {}: {}", self.path.display(), e))
        })
    }

    /// Remove the file now. A file that is already gone counts as removed.
    ///
    /// # Errors
    ///
    /// `RulError::FileCleanup` if removal fails. The drop hook does not retry.
    pub fn cleanup(mut self) -> RulResult<()> {
        self.removed = true;
        remove(&self.path)
    }
}

impl Drop for TransientUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = remove(&self.path) {
            warn!(error = %e, "Transient upload left behind");
        }
    }
}

fn remove(path: &Path) -> RulResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed transient upload");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RulError::FileCleanup {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
    }
}
