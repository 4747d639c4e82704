//! JSON file snapshot store.
//!
//! Each component is written to `<data_dir>/<component file name>`. Writes go
//! to a sibling `.tmp` file first and are renamed into place, so a reader
//! never observes a half-written document.

use super::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use toolwise_application::{SnapshotComponent, SnapshotStore, SnapshotStoreError};
use tracing::debug;

/// File-backed [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    dir: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$XDG_DATA_HOME/toolwise` (or the platform equivalent).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("toolwise"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, component: SnapshotComponent) -> PathBuf {
        self.dir.join(component.file_name())
    }

    async fn write_atomic(&self, path: &Path, document: &Value) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let bytes =
            serde_json::to_vec_pretty(document).map_err(|e| StoreError::corrupt(path, e))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io(path, e))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::corrupt(path, e))
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn save(
        &self,
        component: SnapshotComponent,
        document: &Value,
    ) -> Result<(), SnapshotStoreError> {
        let path = self.path_for(component);
        self.write_atomic(&path, document)
            .await
            .map_err(|e| e.into_port_error(component))
    }

    async fn load(&self, component: SnapshotComponent) -> Result<Option<Value>, SnapshotStoreError> {
        let path = self.path_for(component);
        self.read(&path)
            .await
            .map_err(|e| e.into_port_error(component))
    }
}
