//! Error types for file-backed snapshot storage

use std::path::PathBuf;
use thiserror::Error;
use toolwise_application::{SnapshotComponent, SnapshotStoreError};

/// Errors raised while reading or writing snapshot files
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} does not contain valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            source,
        }
    }

    /// Attach the component and convert to the port's error type.
    pub fn into_port_error(self, component: SnapshotComponent) -> SnapshotStoreError {
        let message = self.to_string();
        match self {
            StoreError::Io { .. } => SnapshotStoreError::Io { component, message },
            StoreError::Corrupt { .. } => SnapshotStoreError::Corrupt { component, message },
        }
    }
}
