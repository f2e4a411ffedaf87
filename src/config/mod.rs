pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, CommonArgs};
use crate::error::ConfigError;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// File name searched for in the global config dir and the working directory.
pub const CONFIG_FILE_NAME: &str = "workbench.toml";

/// Load configuration by merging global, local, and CLI sources.
/// Precedence: CLI > local (or --config) > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply). A file
/// passed explicitly with `--config` must exist and parse.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let common = cli.command.common();

    // Layer 1: Global config (~/.config/workbench/workbench.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: explicit --config, else ./workbench.toml
    let local = match &common.config {
        Some(path) => load_explicit(path)?,
        None => load_toml_file(Path::new(CONFIG_FILE_NAME)).unwrap_or_default(),
    };

    // Layer 3: CLI args
    let config = cli_to_partial(common)
        .with_fallback(local)
        .with_fallback(global)
        .finalize();

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load global config from the platform-specific config directory.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Parse a config file the user asked for by name. Errors propagate.
pub fn load_explicit(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config = parse_config(path, &contents)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse TOML text into a PartialConfig.
pub fn parse_config(path: &Path, contents: &str) -> Result<PartialConfig, ConfigError> {
    toml::from_str::<ConfigFile>(contents)
        .map(ConfigFile::to_partial)
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load and parse an optional TOML config file.
/// Returns None on file-not-found; parse and read errors are logged and skipped.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(path, &contents) {
            Ok(partial) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(partial)
            }
            Err(e) => {
                tracing::warn!("Config parse error: {}", e);
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/workbench/workbench.toml
/// macOS: ~/Library/Application Support/workbench/workbench.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "workbench")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(common: &CommonArgs) -> PartialConfig {
    PartialConfig {
        approval_required: common.no_approval.then_some(false),
        audit_log_path: common.audit_log.clone(),
        ..Default::default()
    }
}
