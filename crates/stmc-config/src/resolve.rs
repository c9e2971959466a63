//! Configuration resolution, path discovery and environment overrides.
//!
//! Resolution order: explicit path → environment variables → XDG paths → defaults.

use crate::validate::{validate_config, ValidationError, ValidationResult};
use crate::TestConfig;
use std::path::{Path, PathBuf};

/// Where the configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "STMC_CONFIG";
pub const ENV_CONFIG_DIR: &str = "STMC_CONFIG_DIR";
pub const ENV_METHOD: &str = "STMC_METHOD";
pub const ENV_ALPHA: &str = "STMC_ALPHA";
pub const ENV_BETA: &str = "STMC_BETA";
pub const ENV_GAMMA: &str = "STMC_GAMMA";
pub const ENV_DELTA: &str = "STMC_DELTA";
pub const ENV_SAMPLE_BOUND: &str = "STMC_SAMPLE_BOUND";
pub const ENV_MIN_ITERS: &str = "STMC_MIN_ITERS";
pub const ENV_AFTER_COMPLETION: &str = "STMC_AFTER_COMPLETION";

/// Config file names, probed in this order inside a directory.
const CONFIG_FILENAMES: [&str; 2] = ["stmc.json", "stmc.toml"];

/// Application name for XDG directories.
const APP_NAME: &str = "stmc";

/// Resolve the configuration file path.
///
/// 1. Explicit path (if it exists)
/// 2. `STMC_CONFIG` (direct path)
/// 3. `STMC_CONFIG_DIR` + file name
/// 4. XDG config directory (`~/.config/stmc/`)
/// 5. Built-in defaults (None)
pub fn resolve_config_path(explicit: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = explicit {
        if path.exists() {
            return (Some(path.to_path_buf()), ConfigSource::Explicit);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = find_in_dir(Path::new(&dir)) {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Some(xdg) = dirs::config_dir() {
        if let Some(path) = find_in_dir(&xdg.join(APP_NAME)) {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    (None, ConfigSource::BuiltinDefault)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Resolve, load, apply environment overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> ValidationResult<(TestConfig, ConfigSource)> {
    let (path, source) = resolve_config_path(explicit);
    if let (None, Some(requested)) = (&path, explicit) {
        return Err(ValidationError::IoError(format!(
            "config file {} does not exist",
            requested.display()
        )));
    }

    let mut config = match path {
        Some(ref p) => TestConfig::from_file(p)?,
        None => TestConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok((config, source))
}

/// Apply `STMC_*` overrides. A probability variable set to `none` (or
/// `missing`, or an empty string) unsets that parameter so it gets solved.
pub fn apply_env_overrides(config: &mut TestConfig) -> ValidationResult<()> {
    if let Ok(val) = std::env::var(ENV_METHOD) {
        config.method = val.parse().map_err(|message| ValidationError::InvalidValue {
            field: ENV_METHOD.to_string(),
            message,
        })?;
    }
    if let Some(v) = env_optional_f64(ENV_ALPHA)? {
        config.alpha = v;
    }
    if let Some(v) = env_optional_f64(ENV_BETA)? {
        config.beta = v;
    }
    if let Some(v) = env_optional_f64(ENV_GAMMA)? {
        config.gamma = v;
    }
    if let Some(v) = env_optional_f64(ENV_DELTA)? {
        config.delta = v;
    }
    if let Ok(val) = std::env::var(ENV_SAMPLE_BOUND) {
        config.sample_bound = if is_unset_marker(&val) {
            None
        } else {
            Some(parse_u64(ENV_SAMPLE_BOUND, &val)?)
        };
    }
    if let Ok(val) = std::env::var(ENV_MIN_ITERS) {
        config.min_iters = parse_u64(ENV_MIN_ITERS, &val)?;
    }
    if let Ok(val) = std::env::var(ENV_AFTER_COMPLETION) {
        config.after_completion =
            val.parse().map_err(|message| ValidationError::InvalidValue {
                field: ENV_AFTER_COMPLETION.to_string(),
                message,
            })?;
    }
    Ok(())
}

fn is_unset_marker(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "" | "none" | "missing" | "null")
}

/// `Ok(None)` when the variable is absent, `Ok(Some(None))` when it unsets
/// the parameter.
fn env_optional_f64(key: &str) -> ValidationResult<Option<Option<f64>>> {
    let Ok(val) = std::env::var(key) else {
        return Ok(None);
    };
    if is_unset_marker(&val) {
        return Ok(Some(None));
    }
    val.trim()
        .parse::<f64>()
        .map(|v| Some(Some(v)))
        .map_err(|e| ValidationError::InvalidValue {
            field: key.to_string(),
            message: format!("'{}' is not a number: {}", val, e),
        })
}

fn parse_u64(key: &str, val: &str) -> ValidationResult<u64> {
    val.trim()
        .parse::<u64>()
        .map_err(|e| ValidationError::InvalidValue {
            field: key.to_string(),
            message: format!("'{}' is not a non-negative integer: {}", val, e),
        })
}
