//! Configuration file loader with multi-source merging.

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use super::file_config::FileConfig;

/// Loads and merges council configuration from files and environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `COUNCIL_*` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./council.toml` or `./.council.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/council/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // COUNCIL_COUNCIL__MIN_AGENTS=5, COUNCIL_HEALTH__HISTORY_CAP=50, …
        figment = figment.merge(Env::prefixed("COUNCIL_").split("__"));

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration (for --no-config style usage).
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("council").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists).
    pub fn project_config_path() -> Option<PathBuf> {
        for filename in &["council.toml", ".council.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}
