//! Snapshot storage on the local filesystem.
//!
//! Provides [`JsonFileSnapshotStore`], one pretty-printed JSON file per
//! pipeline component, implementing the
//! [`SnapshotStore`](toolwise_application::SnapshotStore) port.

mod error;
mod json_file_store;

pub use error::StoreError;
pub use json_file_store::JsonFileSnapshotStore;
