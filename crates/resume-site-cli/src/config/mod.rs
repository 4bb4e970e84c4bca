//! Configuration loading and resolution.
//!
//! Visual regression settings are layered, highest priority first:
//! command-line flags, environment variables, the JSON config file, defaults.

use std::path::{Path, PathBuf};

use resume_site::VisualConfig;

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "visual-regression.json";

/// Directory holding the baseline and the `results/` folder by default.
pub const DEFAULT_VISUAL_DIR: &str = "tests/visual";

pub const ENV_VISUAL_DIR: &str = "VISUAL_DIR";
pub const ENV_BOOTSTRAP: &str = "VISUAL_BOOTSTRAP_BASELINE";
pub const ENV_ALLOW_CI_BOOTSTRAP: &str = "VISUAL_ALLOW_CI_BOOTSTRAP";
pub const ENV_CHANNEL_THRESHOLD: &str = "VISUAL_CHANNEL_THRESHOLD";
pub const ENV_DIFF_THRESHOLD: &str = "VISUAL_DIFF_THRESHOLD";
pub const ENV_CI: &str = "CI";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct VisualOverrides {
    pub bootstrap: bool,
    pub allow_ci_bootstrap: bool,
    pub ci: bool,
    pub channel_threshold: Option<f64>,
    pub diff_threshold: Option<f64>,
}

/// Resolve the visual regression directory.
pub fn resolve_visual_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if let Ok(env_dir) = std::env::var(ENV_VISUAL_DIR) {
        if !env_dir.is_empty() {
            return PathBuf::from(env_dir);
        }
    }

    PathBuf::from(DEFAULT_VISUAL_DIR)
}

/// Read the config file: the explicit one must exist, the default one is optional.
pub fn load_config_file(explicit: Option<&Path>) -> Result<VisualConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                return Ok(VisualConfig::default());
            }
            p
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    tracing::debug!("Loaded visual config from {}", path.display());
    Ok(config)
}

/// Layer environment variables over `config`. `lookup` is usually `std::env::var`.
pub fn apply_env<F>(mut config: VisualConfig, lookup: F) -> Result<VisualConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_BOOTSTRAP) {
        config.bootstrap_baseline = parse_flag(ENV_BOOTSTRAP, &v)?;
    }
    if let Some(v) = lookup(ENV_ALLOW_CI_BOOTSTRAP) {
        config.allow_ci_bootstrap = parse_flag(ENV_ALLOW_CI_BOOTSTRAP, &v)?;
    }
    if let Some(v) = lookup(ENV_CI) {
        // CI providers set all sorts of truthy values; only explicit negatives turn it off.
        config.ci = !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no");
    }
    if let Some(v) = lookup(ENV_CHANNEL_THRESHOLD) {
        config.channel_threshold = parse_number(ENV_CHANNEL_THRESHOLD, &v)?;
    }
    if let Some(v) = lookup(ENV_DIFF_THRESHOLD) {
        let limit = parse_number(ENV_DIFF_THRESHOLD, &v)?;
        config.diff_percent_threshold = limit;
        config.ci_diff_percent_threshold = None;
    }
    Ok(config)
}

/// Layer command-line flags over `config`.
pub fn apply_overrides(mut config: VisualConfig, overrides: &VisualOverrides) -> VisualConfig {
    if overrides.bootstrap {
        config.bootstrap_baseline = true;
    }
    if overrides.allow_ci_bootstrap {
        config.allow_ci_bootstrap = true;
    }
    if overrides.ci {
        config.ci = true;
    }
    if let Some(t) = overrides.channel_threshold {
        config.channel_threshold = t;
    }
    if let Some(t) = overrides.diff_threshold {
        // An explicit limit applies in CI as well.
        config.diff_percent_threshold = t;
        config.ci_diff_percent_threshold = None;
    }
    config
}

/// Full resolution: file, then environment, then flags.
pub fn resolve_visual_config(
    config_file: Option<&Path>,
    overrides: &VisualOverrides,
) -> Result<VisualConfig, ConfigError> {
    let config = load_config_file(config_file)?;
    let config = apply_env(config, |name| std::env::var(name).ok())?;
    Ok(apply_overrides(config, overrides))
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}
