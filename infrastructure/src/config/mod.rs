//! Configuration file loading for toolwise
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLWISE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolwise.toml` or `./.toolwise.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/toolwise/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAnalyzerConfig, FileConfig, FileEvaluatorConfig,
    FileRecommenderConfig, FileStorageConfig, FileTrackerConfig,
};
pub use loader::ConfigLoader;
