//! Snapshot storage port
//!
//! Defines where component snapshots are persisted. Each pipeline component
//! serializes its state into one JSON document; the store only moves those
//! documents to and from durable storage.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Pipeline component owning one persisted snapshot document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotComponent {
    Usage,
    Evaluations,
    Patterns,
    Recommendations,
}

impl SnapshotComponent {
    pub const ALL: [SnapshotComponent; 4] = [
        SnapshotComponent::Usage,
        SnapshotComponent::Evaluations,
        SnapshotComponent::Patterns,
        SnapshotComponent::Recommendations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotComponent::Usage => "usage",
            SnapshotComponent::Evaluations => "evaluations",
            SnapshotComponent::Patterns => "patterns",
            SnapshotComponent::Recommendations => "recommendations",
        }
    }

    /// File name used by file-backed stores.
    pub fn file_name(&self) -> &'static str {
        match self {
            SnapshotComponent::Usage => "usage-tracker.json",
            SnapshotComponent::Evaluations => "outcome-evaluator.json",
            SnapshotComponent::Patterns => "pattern-analyzer.json",
            SnapshotComponent::Recommendations => "recommendation-engine.json",
        }
    }
}

impl std::fmt::Display for SnapshotComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while moving snapshot documents
#[derive(Error, Debug)]
pub enum SnapshotStoreError {
    #[error("I/O error on {component} snapshot: {message}")]
    Io {
        component: SnapshotComponent,
        message: String,
    },

    #[error("Corrupt {component} snapshot: {message}")]
    Corrupt {
        component: SnapshotComponent,
        message: String,
    },
}

/// Durable storage for component snapshots.
///
/// `save` must not leave a torn document behind if the process dies midway.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist the document for `component`, replacing any previous one.
    async fn save(
        &self,
        component: SnapshotComponent,
        document: &Value,
    ) -> Result<(), SnapshotStoreError>;

    /// Load the document for `component`; `Ok(None)` when none was saved yet.
    async fn load(&self, component: SnapshotComponent) -> Result<Option<Value>, SnapshotStoreError>;
}

/// Store that keeps nothing. Loads always find no snapshot.
pub struct NoSnapshotStore;

#[async_trait]
impl SnapshotStore for NoSnapshotStore {
    async fn save(&self, _component: SnapshotComponent, _document: &Value) -> Result<(), SnapshotStoreError> {
        Ok(())
    }

    async fn load(&self, _component: SnapshotComponent) -> Result<Option<Value>, SnapshotStoreError> {
        Ok(None)
    }
}

/// In-memory store, for tests and embedding without a filesystem.
#[derive(Default)]
pub struct MemorySnapshotStore {
    documents: std::sync::Mutex<std::collections::HashMap<SnapshotComponent, Value>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a raw document, bypassing `save`.
    pub fn insert(&self, component: SnapshotComponent, document: Value) {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(component, document);
    }

    pub fn get(&self, component: SnapshotComponent) -> Option<Value> {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&component)
            .cloned()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, component: SnapshotComponent, document: &Value) -> Result<(), SnapshotStoreError> {
        self.insert(component, document.clone());
        Ok(())
    }

    async fn load(&self, component: SnapshotComponent) -> Result<Option<Value>, SnapshotStoreError> {
        Ok(self.get(component))
    }
}
