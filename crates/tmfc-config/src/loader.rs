// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file discovery, parsing and overrides
//!
//! Precedence, lowest to highest: TOML file, environment variables, CLI
//! key/value arguments.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use tracing::debug;

use crate::types::{BoldInputKind, BoldMode, KernelKind, TmfcConfig};
use crate::{ConfigError, ConfigResult};

pub const CONFIG_FILE_NAME: &str = "tmfc_configuration.toml";
pub const CONFIG_PATH_ENV: &str = "TMFC_CONFIG_PATH";

/// Environment variable -> override key
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("TMFC_SEED", "model.seed"),
    ("TMFC_REPETITION_TIME", "bold.repetition_time_s"),
    ("TMFC_BOLD_MODE", "bold.mode"),
    ("TMFC_LOG_LEVEL", "logging.level"),
    ("TMFC_ACTIVITY_SAMPLING", "activity.sampling_ms"),
];

/// Find the configuration file
///
/// Search order:
/// 1. `TMFC_CONFIG_PATH` environment variable
/// 2. Current working directory: `./tmfc_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Parse a TOML document without applying overrides.
pub fn parse_config_str(content: &str) -> ConfigResult<TmfcConfig> {
    Ok(toml::from_str(content)?)
}

/// Load configuration from TOML file
///
/// * `config_path` - Path to the config file; `None` searches for it.
/// * `cli_args` - Optional `section.key -> value` overrides
///
/// # Errors
///
/// Returns error if the file is missing, contains invalid TOML, or an
/// override value cannot be parsed. Validation is separate, see
/// [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<TmfcConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!("[CONFIG] Loading {}", config_file.display());

    let content = fs::read_to_string(&config_file)?;
    let mut config = parse_config_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `TMFC_SEED` -> `model.seed`
/// - `TMFC_REPETITION_TIME` -> `bold.repetition_time_s`
/// - `TMFC_BOLD_MODE` -> `bold.mode`
/// - `TMFC_LOG_LEVEL` -> `logging.level`
/// - `TMFC_ACTIVITY_SAMPLING` -> `activity.sampling_ms`
pub fn apply_environment_overrides(config: &mut TmfcConfig) -> ConfigResult<()> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            debug!("[CONFIG] {} overrides {}", var, key);
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI `section.key -> value` overrides
pub fn apply_cli_overrides(
    config: &mut TmfcConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    // sorted for a deterministic error when several are bad
    let mut keys: Vec<_> = cli_args.keys().collect();
    keys.sort();
    for key in keys {
        apply_override(config, key, &cli_args[key])?;
    }
    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_enum<T: DeserializeOwned>(key: &str, value: &str) -> ConfigResult<T> {
    let deserializer: StrDeserializer<'_, serde::de::value::Error> =
        value.trim().into_deserializer();
    serde::Deserialize::deserialize(deserializer).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Set a single scalar key, e.g. `bold.repetition_time_s = "1.5"`.
pub fn apply_override(config: &mut TmfcConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "model.dt_ms" => config.model.dt_ms = parse(key, value)?,
        "model.seed" => config.model.seed = Some(parse(key, value)?),
        "model.k_gl" => config.model.k_gl = parse(key, value)?,
        "model.signal_v" => config.model.signal_v = parse(key, value)?,
        "model.sigma_ou" => config.model.sigma_ou = parse(key, value)?,
        "model.builtin_bold" => config.model.builtin_bold = parse(key, value)?,
        "design.first_rest_s" => config.design.first_rest_s = parse(key, value)?,
        "design.last_rest_s" => config.design.last_rest_s = parse(key, value)?,
        "design.rest_before" => config.design.rest_before = parse(key, value)?,
        "activity.store" => config.activity.store = parse(key, value)?,
        "activity.sampling_ms" => config.activity.sampling_ms = parse(key, value)?,
        "activity.synaptic_activity" => config.activity.synaptic_activity = parse(key, value)?,
        "bold.mode" => config.bold.mode = parse_enum::<BoldMode>(key, value)?,
        "bold.input" => config.bold.input = parse_enum::<BoldInputKind>(key, value)?,
        "bold.kernel" => config.bold.kernel = parse_enum::<KernelKind>(key, value)?,
        "bold.repetition_time_s" => config.bold.repetition_time_s = parse(key, value)?,
        "bold.normalize" => config.bold.normalize = parse(key, value)?,
        "bold.normalize_max" => config.bold.normalize_max = parse(key, value)?,
        "bold.variable" => config.bold.variable = parse(key, value)?,
        "bold.seed" => config.bold.seed = Some(parse(key, value)?),
        "bold.drop_first_s" => config.bold.drop_first_s = parse(key, value)?,
        "run.clear_raw" => config.run.clear_raw = parse(key, value)?,
        "logging.level" => config.logging.level = value.trim().to_lowercase(),
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}
