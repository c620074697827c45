//! No-mock configuration validation + resolution tests.
//!
//! Covers:
//! - Loading real JSON and TOML files from a temp directory
//! - Resolution order (CLI > DPL_CONFIG > DPL_CONFIG_DIR > XDG)
//! - Snapshot hashes independent of the file format

use dpl_config::resolve::{resolve_config, ConfigSource, ENV_CONFIG_DIR, ENV_CONFIG_PATH};
use dpl_config::{load_config, AnalysisConfig, ValidationError};
use dpl_math::StandardWeight;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: [&str; 3] = [ENV_CONFIG_PATH, ENV_CONFIG_DIR, "XDG_CONFIG_HOME"];

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

/// Clear resolution variables and point XDG at an empty directory.
fn isolated_env(xdg: &Path) -> EnvGuard {
    let guard = EnvGuard::new(&ENV_KEYS);
    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_CONFIG_DIR);
    env::set_var("XDG_CONFIG_HOME", xdg);
    guard
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write config");
}

#[test]
fn defaults_when_nothing_is_configured() {
    with_env_lock(|| {
        let xdg = TempDir::new().unwrap();
        let _env = isolated_env(xdg.path());

        let paths = resolve_config(None);
        // a system-wide config would legitimately win here
        if paths.source != ConfigSource::SystemConfig {
            assert_eq!(paths.source, ConfigSource::BuiltinDefault);
            assert!(paths.analysis.is_none());

            let loaded = load_config(None).unwrap();
            assert_eq!(loaded.config, AnalysisConfig::default());
            assert!(loaded.snapshot.source_hash.is_none());
        }
    });
}

#[test]
fn env_path_beats_config_dir_and_xdg() {
    with_env_lock(|| {
        let xdg = TempDir::new().unwrap();
        let _env = isolated_env(xdg.path());
        write(
            &xdg.path().join("datapoint-loss").join("analysis.toml"),
            "bins = 3\n",
        );

        let paths = resolve_config(None);
        assert_eq!(paths.source, ConfigSource::XdgConfig);

        let dir = TempDir::new().unwrap();
        write(&dir.path().join("analysis.json"), r#"{"bins": 7}"#);
        env::set_var(ENV_CONFIG_DIR, dir.path());
        let loaded = load_config(None).unwrap();
        assert_eq!(loaded.paths.source, ConfigSource::Environment);
        assert_eq!(loaded.config.bins, 7);

        let direct = dir.path().join("custom.toml");
        write(&direct, "bins = 11\n");
        env::set_var(ENV_CONFIG_PATH, &direct);
        let loaded = load_config(None).unwrap();
        assert_eq!(loaded.paths.analysis.as_deref(), Some(direct.as_path()));
        assert_eq!(loaded.config.bins, 11);
    });
}

#[test]
fn cli_path_beats_environment() {
    with_env_lock(|| {
        let xdg = TempDir::new().unwrap();
        let _env = isolated_env(xdg.path());
        let dir = TempDir::new().unwrap();

        let env_file = dir.path().join("env.json");
        write(&env_file, r#"{"bins": 1}"#);
        env::set_var(ENV_CONFIG_PATH, &env_file);

        let cli_file = dir.path().join("cli.json");
        write(&cli_file, r#"{"bins": 2}"#);
        let loaded = load_config(Some(&cli_file)).unwrap();
        assert_eq!(loaded.paths.source, ConfigSource::CliArgument);
        assert_eq!(loaded.config.bins, 2);
    });
}

#[test]
fn missing_cli_path_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
    assert_eq!(err.code(), 30);
}

#[test]
fn json_and_toml_with_same_settings_share_config_hash() {
    let dir = TempDir::new().unwrap();
    let json = dir.path().join("analysis.json");
    write(
        &json,
        r#"{"weight": "entropy", "grid": {"points": 201, "include_endpoints": false}, "targets": [0, 1]}"#,
    );
    let toml_path = dir.path().join("analysis.toml");
    write(
        &toml_path,
        "weight = \"entropy\"\ntargets = [0, 1]\n\n[grid]\npoints = 201\ninclude_endpoints = false\n",
    );

    let a = load_config(Some(&json)).unwrap();
    let b = load_config(Some(&toml_path)).unwrap();
    assert_eq!(a.config.weight, StandardWeight::Entropy);
    assert!(a.snapshot.matches(&b.snapshot));
    assert_ne!(a.snapshot.source_hash, b.snapshot.source_hash);
}

#[test]
fn categorical_grouping_from_toml() {
    let cfg = AnalysisConfig::from_toml_str(
        r#"
[grouping]
kind = "categorical"
levels = [
  { attribute = "sex_f", label = "female" },
  { attribute = "sex_m", label = "male" },
]
"#,
    )
    .unwrap();
    let grouping = cfg.grouping.expect("grouping parsed");
    assert_eq!(grouping.labels(), vec!["female", "male"]);
}

#[test]
fn malformed_documents_are_parse_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("analysis.toml");
    write(&path, "weight = [\n");
    assert!(matches!(
        load_config(Some(&path)),
        Err(ValidationError::ParseError(_))
    ));

    let path = dir.path().join("analysis.json");
    write(&path, r#"{"weight": "cubic"}"#);
    assert!(matches!(
        load_config(Some(&path)),
        Err(ValidationError::ParseError(_))
    ));
}
