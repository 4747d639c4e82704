//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_FILES: [&str; 2] = ["toolwise.toml", ".toolwise.toml"];
const ENV_PREFIX: &str = "TOOLWISE_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLWISE_`-prefixed environment variables (`__` separates sections,
    ///    e.g. `TOOLWISE_ANALYZER__MIN_SAMPLE_SIZE=5`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolwise.toml` or `./.toolwise.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/toolwise/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path, Self::global_config_path(), Path::new("."))
            .extract()
            .map_err(Box::new)
    }

    fn figment(
        config_path: Option<&Path>,
        global_path: Option<PathBuf>,
        project_dir: &Path,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(path) = Self::project_config_in(project_dir) {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/toolwise/config.toml if set,
    /// otherwise falls back to ~/.config/toolwise/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolwise").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Describe the config file locations being used, in priority order.
    pub fn config_sources(config_path: Option<&Path>) -> Vec<String> {
        let mut sources = vec![format!("Environment: {}* variables", ENV_PREFIX)];

        if let Some(path) = config_path {
            sources.push(format!("[FOUND] Explicit: {}", path.display()));
        }

        match Self::project_config_path() {
            Some(path) => sources.push(format!("[FOUND] Project: {}", path.display())),
            None => sources.push("[     ] Project: ./toolwise.toml or ./.toolwise.toml".into()),
        }

        if let Some(path) = Self::global_config_path() {
            let marker = if path.exists() { "[FOUND]" } else { "[     ]" };
            sources.push(format!("{} Global:  {}", marker, path.display()));
        }

        sources.push("[     ] Default: built-in defaults".into());
        sources
    }
}
