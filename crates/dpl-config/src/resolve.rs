//! Locating the analysis config file.
//!
//! Resolution order: CLI argument → environment variables → XDG paths →
//! system config → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to the analysis config (or None if not found).
    pub analysis: Option<PathBuf>,

    /// Where it was found (for diagnostics).
    pub source: ConfigSource,
}

/// Which rule of the search found the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config`.
    CliArgument,

    /// `DPL_CONFIG` or `DPL_CONFIG_DIR`.
    Environment,

    /// `$XDG_CONFIG_HOME/datapoint-loss/`.
    XdgConfig,

    /// Found in /etc/datapoint-loss/.
    SystemConfig,

    /// Nothing found.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

pub const ENV_CONFIG_PATH: &str = "DPL_CONFIG";
pub const ENV_CONFIG_DIR: &str = "DPL_CONFIG_DIR";

/// Config file names, tried in order inside each directory.
const CONFIG_FILENAMES: [&str; 2] = ["analysis.toml", "analysis.json"];

/// Directory name under the XDG and system config roots.
const APP_NAME: &str = "datapoint-loss";

/// Resolve the analysis config path.
///
/// 1. Explicit CLI path (returned even when missing, so loading reports it)
/// 2. `DPL_CONFIG`
/// 3. `DPL_CONFIG_DIR` + `analysis.toml` / `analysis.json`
/// 4. XDG config directory (`~/.config/datapoint-loss/`)
/// 5. System config (`/etc/datapoint-loss/`)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    // An explicit path the user asked for must not silently fall through.
    if let Some(path) = cli_path {
        return ConfigPaths {
            analysis: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = first_in_dir(Path::new(&config_dir)) {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = first_in_dir(&dir) {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    if let Some(path) = first_in_dir(&system_config_dir()) {
        return found(path, ConfigSource::SystemConfig);
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        analysis: Some(path),
        source,
    }
}

fn first_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Get the XDG config directory for datapoint-loss.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// `/etc/datapoint-loss`.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
