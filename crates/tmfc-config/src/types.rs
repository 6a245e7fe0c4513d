// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `tmfc_configuration.toml`. Every section is
//! `#[serde(default)]`, so a file only needs the keys it changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TmfcConfig {
    pub model: ModelConfig,
    pub design: DesignConfig,
    pub activity: ActivityConfig,
    pub bold: BoldConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// Wilson-Cowan neural mass model
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Integration step (ms)
    pub dt_ms: f64,
    pub k_gl: f64,
    /// Signal velocity (mm/ms), 0 disables delays
    pub signal_v: f64,
    pub tau_ou: f64,
    pub sigma_ou: f64,
    pub exc_ou_mean: f64,
    pub inh_ou_mean: f64,
    pub tau_exc: f64,
    pub tau_inh: f64,
    pub c_excexc: f64,
    pub c_excinh: f64,
    pub c_inhexc: f64,
    pub c_inhinh: f64,
    pub a_exc: f64,
    pub a_inh: f64,
    pub mu_exc: f64,
    pub mu_inh: f64,
    pub exc_ext: f64,
    pub inh_ext: f64,
    pub seed: Option<u64>,
    /// Fibre length matrix (mm); absent means no delays
    pub lengths: Option<Vec<Vec<f64>>>,
    /// Model-internal BOLD generation (overridden by chunkwise mode)
    pub builtin_bold: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            k_gl: 2.85,
            signal_v: 10.0,
            tau_ou: 5.0,
            sigma_ou: 5e-3,
            exc_ou_mean: 0.0,
            inh_ou_mean: 0.0,
            tau_exc: 2.5,
            tau_inh: 3.75,
            c_excexc: 16.0,
            c_excinh: 15.0,
            c_inhexc: 12.0,
            c_inhinh: 3.0,
            a_exc: 1.5,
            a_inh: 1.5,
            mu_exc: 3.0,
            mu_inh: 3.0,
            exc_ext: 0.75,
            inh_ext: 0.0,
            seed: None,
            lengths: None,
            builtin_bold: false,
        }
    }
}

/// `durations = 3.0` or `durations = [3.0, 2.5]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DurationsConfig {
    Uniform(f64),
    PerTask(Vec<f64>),
}

impl Default for DurationsConfig {
    fn default() -> Self {
        DurationsConfig::Uniform(3.0)
    }
}

/// Block design: task timing and coupling matrices
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Task onsets (s); defaults to 0, 1, 2, ...
    pub onsets: Option<Vec<f64>>,
    /// Task labels; defaults to the sorted task matrix names
    pub labels: Option<Vec<String>>,
    pub durations: DurationsConfig,
    pub first_rest_s: f64,
    pub last_rest_s: f64,
    pub rest_before: bool,
    pub rest_matrix: Vec<Vec<f64>>,
    pub task_matrices: BTreeMap<String, Vec<Vec<f64>>>,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            onsets: None,
            labels: None,
            durations: DurationsConfig::default(),
            first_rest_s: 6.0,
            last_rest_s: 8.0,
            rest_before: true,
            rest_matrix: Vec::new(),
            task_matrices: BTreeMap::new(),
        }
    }
}

impl DesignConfig {
    /// Region count implied by the rest matrix
    pub fn num_regions(&self) -> usize {
        self.rest_matrix.len()
    }
}

/// Coarse activity recording
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Keep resampled excitatory/inhibitory series in the run report
    pub store: bool,
    pub sampling_ms: f64,
    /// Record synaptic activity alongside E/I
    pub synaptic_activity: bool,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            store: true,
            sampling_ms: 20.0,
            synaptic_activity: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoldMode {
    Disabled,
    #[default]
    Chunkwise,
    Batch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoldInputKind {
    Exc,
    Sum,
    #[default]
    SynAct,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[default]
    BalloonWindkessel,
    Gamma,
}

/// Double-gamma HRF shape (batch mode, `kernel = "gamma"`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GammaConfig {
    pub length_s: f64,
    pub peak: f64,
    pub undershoot: f64,
    pub beta: f64,
    pub scaling: f64,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            length_s: 32.0,
            peak: 6.0,
            undershoot: 16.0,
            beta: 0.1667,
            scaling: 0.6,
        }
    }
}

/// Hemodynamic (BOLD) generation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoldConfig {
    pub mode: BoldMode,
    pub input: BoldInputKind,
    pub repetition_time_s: f64,
    /// Multiply the input by `normalize_max` before integration
    pub normalize: bool,
    pub normalize_max: f64,
    /// Per-region Balloon-Windkessel parameters drawn around the means
    pub variable: bool,
    pub seed: Option<u64>,
    /// Batch mode only: leading coarse samples to discard (s)
    pub drop_first_s: f64,
    pub kernel: KernelKind,
    pub gamma: GammaConfig,
}

impl Default for BoldConfig {
    fn default() -> Self {
        Self {
            mode: BoldMode::default(),
            input: BoldInputKind::default(),
            repetition_time_s: 2.0,
            normalize: true,
            normalize_max: 2.0,
            variable: false,
            seed: None,
            drop_first_s: 12.0,
            kernel: KernelKind::default(),
            gamma: GammaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Drop the model's raw fine-step buffers after each block
    pub clear_raw: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { clear_raw: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
