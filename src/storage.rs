//! On-disk layout for staged uploads and generated results.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::{RESULT_EXTENSION, RESULTS_URL_PREFIX};
use crate::rules::ImageKind;
use crate::upstream::SourceImage;

/// The uploads and results directories.
#[derive(Clone, Debug)]
pub struct Storage {
    uploads_dir: PathBuf,
    results_dir: PathBuf,
}

impl Storage {
    /// Builds storage over the two given directories.
    pub fn new(uploads_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Where staged uploads go.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Where generated images go.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Creates both directories if they are missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::create_dir_all(&self.results_dir).await?;
        Ok(())
    }

    /// Writes one source image to `uploads/<uuid>.<ext>`.
    pub async fn stage_upload(
        &self,
        file_name: &str,
        kind: ImageKind,
        bytes: &[u8],
    ) -> std::io::Result<SourceImage> {
        let path = self
            .uploads_dir
            .join(format!("{}.{}", Uuid::new_v4(), kind.extension()));
        tokio::fs::write(&path, bytes).await?;
        debug!("Staged {} as {}", file_name, path.display());
        Ok(SourceImage {
            path,
            file_name: file_name.to_string(),
            kind,
        })
    }

    /// Deletes staged uploads, logging rather than failing on errors.
    pub async fn discard(&self, staged: &[SourceImage]) {
        for image in staged {
            match tokio::fs::remove_file(&image.path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!("Failed to remove {}: {}", image.path.display(), err),
            }
        }
    }

    /// Writes a generated image to `results/<uuid>.png` and returns its public URL.
    pub async fn store_result(&self, bytes: &[u8]) -> std::io::Result<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), RESULT_EXTENSION);
        tokio::fs::write(self.results_dir.join(&filename), bytes).await?;
        Ok(format!("{RESULTS_URL_PREFIX}/{filename}"))
    }
}
