//! services/api/src/adapters/storage.rs
//!
//! Filesystem implementation of the `ObjectStorage` port. Objects live at
//! `{root}/{bucket}/{key}` and are served publicly under `{public_url}/{bucket}/{key}`.

use async_trait::async_trait;
use legal_lens_core::ports::{ObjectStorage, PortError, PortResult};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct FsStorageAdapter {
    root: PathBuf,
    public_url: String,
}

impl FsStorageAdapter {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `bucket/key` below the root, refusing anything that could escape it.
    fn object_path(&self, bucket: &str, key: &str) -> PortResult<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(PortError::Unexpected(format!(
                "invalid object key '{}/{}'",
                bucket, key
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

#[async_trait]
impl ObjectStorage for FsStorageAdapter {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> PortResult<()> {
        let path = self.object_path(bucket, key)?;
        debug!(%bucket, %key, size = data.len(), %content_type, "storage: upload");

        if !upsert && fs::try_exists(&path).await.map_err(io_error)? {
            return Err(PortError::Unexpected(format!(
                "object {}/{} already exists",
                bucket, key
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        // Write to a temp file and rename so readers never see a partial object.
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".part");
        let temp_path = path.with_file_name(temp_name);
        if let Err(e) = write_then_rename(&temp_path, &path, data).await {
            warn!(path = %path.display(), error = %e, "storage: write failed");
            match fs::remove_file(&temp_path).await {
                Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                    warn!(path = %temp_path.display(), error = %cleanup, "storage: temp file left behind")
                }
                _ => {}
            }
            return Err(io_error(e));
        }
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> PortResult<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, bucket, key)
    }
}
