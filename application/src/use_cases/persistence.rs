//! Snapshot persistence helpers shared by the four services.
//!
//! Every service persists one JSON document through the [`SnapshotStore`]
//! port. Failures never propagate past the service boundary: they are logged
//! and reported as `false`, and the in-memory state is left as it was.

use crate::ports::snapshot_store::{SnapshotComponent, SnapshotStore, SnapshotStoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors raised while persisting or restoring a component snapshot
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Store(#[from] SnapshotStoreError),

    #[error("Failed to encode {component} snapshot: {source}")]
    Encode {
        component: SnapshotComponent,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed {component} snapshot: {source}")]
    Decode {
        component: SnapshotComponent,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) async fn save_document<T: Serialize>(
    store: &dyn SnapshotStore,
    component: SnapshotComponent,
    document: &T,
) -> Result<(), PersistenceError> {
    let value = serde_json::to_value(document)
        .map_err(|source| PersistenceError::Encode { component, source })?;
    store.save(component, &value).await?;
    Ok(())
}

/// `Ok(None)` when the store has no document for `component`.
pub(crate) async fn load_document<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    component: SnapshotComponent,
) -> Result<Option<T>, PersistenceError> {
    let Some(value) = store.load(component).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| PersistenceError::Decode { component, source })
}

/// Save and log; `true` on success.
pub(crate) async fn persist_logged<T: Serialize>(
    store: &dyn SnapshotStore,
    component: SnapshotComponent,
    document: &T,
) -> bool {
    match save_document(store, component, document).await {
        Ok(()) => {
            debug!("Persisted {} snapshot", component);
            true
        }
        Err(e) => {
            error!("Failed to persist {} snapshot: {}", component, e);
            false
        }
    }
}

/// Outcome of [`load_logged`].
#[derive(Debug)]
pub(crate) enum Loaded<T> {
    /// A document to apply
    Document(T),
    /// Nothing was saved for the component
    Missing,
    /// The failure was logged; the caller keeps its current state
    Failed,
}

/// Load and log.
pub(crate) async fn load_logged<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    component: SnapshotComponent,
) -> Loaded<T> {
    match load_document(store, component).await {
        Ok(Some(doc)) => Loaded::Document(doc),
        Ok(None) => {
            info!("No {} snapshot found, starting empty", component);
            Loaded::Missing
        }
        Err(e) => {
            error!("Failed to load {} snapshot, keeping current state: {}", component, e);
            Loaded::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::snapshot_store::MemorySnapshotStore;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        value: u32,
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let store = MemorySnapshotStore::new();
        let loaded: Option<Doc> = load_document(&store, SnapshotComponent::Usage).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_mismatched_document_is_decode_error() {
        let store = MemorySnapshotStore::new();
        store.insert(SnapshotComponent::Usage, serde_json::json!({"other": true}));
        let result: Result<Option<Doc>, _> = load_document(&store, SnapshotComponent::Usage).await;
        assert!(matches!(result, Err(PersistenceError::Decode { .. })));

        let logged: Loaded<Doc> = load_logged(&store, SnapshotComponent::Usage).await;
        assert!(matches!(logged, Loaded::Failed));
        let missing: Loaded<Doc> = load_logged(&store, SnapshotComponent::Patterns).await;
        assert!(matches!(missing, Loaded::Missing));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemorySnapshotStore::new();
        assert!(persist_logged(&store, SnapshotComponent::Patterns, &Doc { value: 3 }).await);
        let loaded: Loaded<Doc> = load_logged(&store, SnapshotComponent::Patterns).await;
        assert!(matches!(loaded, Loaded::Document(Doc { value: 3 })));
    }
}
