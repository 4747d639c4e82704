//! Infrastructure layer for toolwise
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: file-backed snapshot storage, the JSONL
//! insight log, and configuration file loading.

pub mod config;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileAnalyzerConfig, FileConfig, FileEvaluatorConfig,
    FileRecommenderConfig, FileStorageConfig, FileTrackerConfig,
};
pub use logging::JsonlInsightLogger;
pub use storage::{JsonFileSnapshotStore, StoreError};
