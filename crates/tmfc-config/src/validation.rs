// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks value ranges and cross-section consistency (time grids, matrix
//! shapes, design lengths) before anything is simulated.

use crate::types::{BoldMode, DurationsConfig, KernelKind, TmfcConfig};
use crate::{ConfigError, ConfigResult};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const REST_LABEL: &str = "Rest";

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotPositive { field: String, value: f64 },
    Negative { field: String, value: f64 },
    OffGrid { field: String, interval_ms: f64, dt_ms: f64 },
    MatrixShape { field: String, reason: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{} = {} must be positive", field, value)
            }
            Self::Negative { field, value } => {
                write!(f, "{} = {} must not be negative", field, value)
            }
            Self::OffGrid {
                field,
                interval_ms,
                dt_ms,
            } => write!(
                f,
                "{} = {} ms is not a whole multiple of the {} ms step",
                field, interval_ms, dt_ms
            ),
            Self::MatrixShape { field, reason } => {
                write!(f, "Matrix {}: {}", field, reason)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive time steps and non-negative padding
/// - Sampling interval and repetition time on the fine-step grid
/// - Square coupling / length matrices of one region count
/// - Onset, label and duration list lengths
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &TmfcConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_time_grid(config, &mut errors);
    validate_matrices(config, &mut errors);
    validate_design_lists(config, &mut errors);
    validate_bold(config, &mut errors);

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
        });
    }

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) -> bool {
    if value.is_finite() && value > 0.0 {
        return true;
    }
    errors.push(ConfigValidationError::NotPositive {
        field: field.to_string(),
        value,
    });
    false
}

fn require_non_negative(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
}

fn on_grid(interval_ms: f64, dt_ms: f64) -> bool {
    let ratio = interval_ms / dt_ms;
    ratio >= 1.0 - 1e-9 && (ratio - ratio.round()).abs() <= 1e-6 * ratio.max(1.0)
}

fn validate_time_grid(config: &TmfcConfig, errors: &mut Vec<ConfigValidationError>) {
    let dt_ok = require_positive("model.dt_ms", config.model.dt_ms, errors);
    let sampling_ok = require_positive("activity.sampling_ms", config.activity.sampling_ms, errors);
    let tr_ok = require_positive("bold.repetition_time_s", config.bold.repetition_time_s, errors);

    if dt_ok && sampling_ok && !on_grid(config.activity.sampling_ms, config.model.dt_ms) {
        errors.push(ConfigValidationError::OffGrid {
            field: "activity.sampling_ms".to_string(),
            interval_ms: config.activity.sampling_ms,
            dt_ms: config.model.dt_ms,
        });
    }

    let tr_ms = config.bold.repetition_time_s * 1000.0;
    // chunkwise integrates the fine signal, batch the sampled activity
    let grid = match config.bold.mode {
        BoldMode::Disabled => None,
        BoldMode::Chunkwise => Some((dt_ok, config.model.dt_ms)),
        BoldMode::Batch => Some((sampling_ok, config.activity.sampling_ms)),
    };
    if let Some((grid_ok, step_ms)) = grid {
        if tr_ok && grid_ok && !on_grid(tr_ms, step_ms) {
            errors.push(ConfigValidationError::OffGrid {
                field: "bold.repetition_time_s".to_string(),
                interval_ms: tr_ms,
                dt_ms: step_ms,
            });
        }
    }

    require_non_negative("design.first_rest_s", config.design.first_rest_s, errors);
    require_non_negative("design.last_rest_s", config.design.last_rest_s, errors);
    require_non_negative("model.signal_v", config.model.signal_v, errors);
}

fn check_square(
    field: &str,
    rows: &[Vec<f64>],
    expected: Option<usize>,
    errors: &mut Vec<ConfigValidationError>,
) {
    let n = rows.len();
    if let Some(bad) = rows.iter().position(|row| row.len() != n) {
        errors.push(ConfigValidationError::MatrixShape {
            field: field.to_string(),
            reason: format!("row {} has {} entries, expected {}", bad, rows[bad].len(), n),
        });
        return;
    }
    if rows.iter().flatten().any(|w| !w.is_finite()) {
        errors.push(ConfigValidationError::MatrixShape {
            field: field.to_string(),
            reason: "contains non-finite entries".to_string(),
        });
    }
    if let Some(expected) = expected {
        if n != expected {
            errors.push(ConfigValidationError::MatrixShape {
                field: field.to_string(),
                reason: format!("{} regions, rest matrix has {}", n, expected),
            });
        }
    }
}

fn validate_matrices(config: &TmfcConfig, errors: &mut Vec<ConfigValidationError>) {
    let design = &config.design;
    if design.rest_matrix.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "design.rest_matrix".to_string(),
        });
        return;
    }
    check_square("design.rest_matrix", &design.rest_matrix, None, errors);
    let n = Some(design.num_regions());

    if design.task_matrices.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "design.task_matrices".to_string(),
        });
    }
    for (name, rows) in &design.task_matrices {
        check_square(&format!("design.task_matrices.{}", name), rows, n, errors);
    }
    if let Some(lengths) = &config.model.lengths {
        check_square("model.lengths", lengths, n, errors);
    }
}

fn validate_design_lists(config: &TmfcConfig, errors: &mut Vec<ConfigValidationError>) {
    let design = &config.design;

    if design.task_matrices.contains_key(REST_LABEL) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "design.task_matrices".to_string(),
            reason: format!("'{}' is reserved for rest blocks", REST_LABEL),
        });
    }

    let task_count = match (&design.onsets, &design.labels) {
        (Some(onsets), Some(labels)) => {
            if onsets.len() != labels.len() {
                errors.push(ConfigValidationError::InvalidValue {
                    field: "design.labels".to_string(),
                    reason: format!("{} labels for {} onsets", labels.len(), onsets.len()),
                });
            }
            onsets.len()
        }
        (Some(onsets), None) => onsets.len(),
        (None, Some(labels)) => labels.len(),
        (None, None) => design.task_matrices.len(),
    };

    if let Some(labels) = &design.labels {
        for label in labels {
            if !design.task_matrices.contains_key(label) {
                errors.push(ConfigValidationError::InvalidValue {
                    field: "design.labels".to_string(),
                    reason: format!("no task matrix named '{}'", label),
                });
            }
        }
    }

    if let Some(onsets) = &design.onsets {
        if let Some(i) = onsets.windows(2).position(|w| w[1] <= w[0]) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "design.onsets".to_string(),
                reason: format!("onset {} does not follow onset {}", i + 1, i),
            });
        }
    }

    match &design.durations {
        DurationsConfig::Uniform(d) => require_non_negative("design.durations", *d, errors),
        DurationsConfig::PerTask(list) => {
            if list.len() != task_count {
                errors.push(ConfigValidationError::InvalidValue {
                    field: "design.durations".to_string(),
                    reason: format!("{} durations for {} tasks", list.len(), task_count),
                });
            }
            for d in list {
                require_non_negative("design.durations", *d, errors);
            }
        }
    }
}

fn validate_bold(config: &TmfcConfig, errors: &mut Vec<ConfigValidationError>) {
    let bold = &config.bold;
    if bold.mode == BoldMode::Disabled {
        return;
    }
    if bold.normalize {
        require_positive("bold.normalize_max", bold.normalize_max, errors);
    }
    if bold.kernel == KernelKind::Gamma && bold.mode != BoldMode::Batch {
        errors.push(ConfigValidationError::InvalidValue {
            field: "bold.kernel".to_string(),
            reason: "the gamma kernel is only available in batch mode".to_string(),
        });
    }
    if bold.mode == BoldMode::Batch {
        require_non_negative("bold.drop_first_s", bold.drop_first_s, errors);
        if bold.kernel == KernelKind::Gamma {
            let g = &bold.gamma;
            require_positive("bold.gamma.length_s", g.length_s, errors);
            require_positive("bold.gamma.peak", g.peak, errors);
            require_positive("bold.gamma.undershoot", g.undershoot, errors);
            require_positive("bold.gamma.scaling", g.scaling, errors);
        }
    }
}
