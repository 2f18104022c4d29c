//! Upload Ingestor: persist, read back, parse, validate.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::feature_set::{parse_feature_document, UploadedFeatureSet};
use super::transient::TransientUpload;
use crate::error::{RulError, RulResult};

/// Turns raw upload bytes into a validated [`UploadedFeatureSet`].
#[derive(Debug, Clone)]
pub struct UploadIngestor {
    dir: PathBuf,
}

impl UploadIngestor {
    /// Create the ingestor, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> RulResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            RulError::Io(format!(
                "failed to create upload dir {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ingest one upload.
    ///
    /// `None` means the request carried no file part. On any rejection the
    /// transient file is gone before this returns.
    ///
    /// # Errors
    ///
    /// - `NoFileUploaded` when `bytes` is `None`
    /// - `UnparsableUpload` / `ShapeMismatch` from validation
    /// - `Io` if the file cannot be written or read back
    pub async fn ingest(&self, bytes: Option<&[u8]>) -> RulResult<IngestedUpload> {
        let bytes = bytes.ok_or(RulError::NoFileUploaded)?;

        let upload = TransientUpload::persist(&self.dir, bytes).await?;
        let stored = upload.read().await?;

        match parse_feature_document(&stored) {
            Ok(features) => {
                debug!(
                    rows = features.row_count(),
                    features = features.feature_count(),
                    "Upload accepted"
                );
                Ok(IngestedUpload { upload, features })
            }
            Err(e) => {
                if let Err(cleanup) = upload.cleanup() {
                    warn!(error = %cleanup, "Transient upload left behind");
                }
                Err(e)
            }
        }
    }
}

/// A validated upload still backed by its transient file.
#[derive(Debug)]
pub struct IngestedUpload {
    upload: TransientUpload,
    features: UploadedFeatureSet,
}

impl IngestedUpload {
    pub fn features(&self) -> &UploadedFeatureSet {
        &self.features
    }

    pub fn path(&self) -> &Path {
        self.upload.path()
    }

    /// Split into the file guard and the parsed features.
    pub fn into_parts(self) -> (TransientUpload, UploadedFeatureSet) {
        (self.upload, self.features)
    }

    /// Remove the transient file. Failure is logged, never returned.
    pub fn finish(self) {
        if let Err(e) = self.upload.cleanup() {
            warn!(error = %e, "Transient upload left behind");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("nested").join("uploads");

        let ingestor = UploadIngestor::new(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(ingestor.dir(), dir.as_path());
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected_without_touching_disk() {
        let root = TempDir::new().unwrap();
        let ingestor = UploadIngestor::new(root.path()).unwrap();

        let err = ingestor.ingest(None).await.unwrap_err();

        assert!(matches!(err, RulError::NoFileUploaded));
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_accepted_upload_is_removed_on_finish() {
        let root = TempDir::new().unwrap();
        let ingestor = UploadIngestor::new(root.path()).unwrap();

        let ingested = ingestor
            .ingest(Some(br#"{"data": [[1, 2], [3, 4]], "features": 2}"#))
            .await
            .unwrap();
        assert!(ingested.path().exists());
        assert_eq!(ingested.features().row_count(), 2);

        ingested.finish();
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_rejected_upload_leaves_no_file() {
        let root = TempDir::new().unwrap();
        let ingestor = UploadIngestor::new(root.path()).unwrap();

        let shape = ingestor
            .ingest(Some(br#"{"data": [[1, 2]], "features": 3}"#))
            .await
            .unwrap_err();
        let garbage = ingestor.ingest(Some(b"not numbers")).await.unwrap_err();

        assert!(matches!(shape, RulError::ShapeMismatch { .. }));
        assert!(matches!(garbage, RulError::UnparsableUpload(_)));
        assert!(is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_dropping_parts_removes_file() {
        let root = TempDir::new().unwrap();
        let ingestor = UploadIngestor::new(root.path()).unwrap();

        let ingested = ingestor.ingest(Some(b"1 2 3\n")).await.unwrap();
        let (upload, features) = ingested.into_parts();
        assert_eq!(features.feature_count(), 3);
        drop(upload);

        assert!(is_empty(root.path()));
    }
}
