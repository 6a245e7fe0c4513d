// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration → engine bridge.
//!
//! Turns a [`TmfcConfig`] into a design, a Wilson-Cowan model and driver
//! options, runs the whole schedule and packs the result into a
//! serializable [`SimulationReport`].

use ndarray::Array2;
use serde::Serialize;
use tracing::info;

use tmfc_config::{
    validate_config, BoldInputKind, BoldMode, ConfigError, DurationsConfig, KernelKind,
    ModelConfig, TmfcConfig,
};
use tmfc_sim_engine::{
    build_schedule, BoldInput, ConfigConflict, DesignSpec, DriverOptions, Durations, EngineError,
    HemodynamicMode, Schedule, SimulationDriver, TimeIndexMap,
};
use tmfc_sim_hemodynamics::{BoldOptions, ConvolutionKernel, GammaKernel, Variability};
use tmfc_sim_neural::{ModelError, WilsonCowanModel, WilsonCowanParameters};
use tmfc_structures::{CoarseSeries, CouplingMatrix, StructuresError};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Invalid matrix '{name}': {source}")]
    Matrix {
        name: String,
        #[source]
        source: StructuresError,
    },

    #[error("Invalid length matrix: {0}")]
    Lengths(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, SimulationError>;

fn matrix(name: &str, rows: &[Vec<f64>]) -> Result<CouplingMatrix> {
    CouplingMatrix::from_rows(rows).map_err(|source| SimulationError::Matrix {
        name: name.to_string(),
        source,
    })
}

/// Design from the `[design]` section. Omitted onsets or labels keep the
/// [`DesignSpec::new`] defaults.
pub fn build_design(config: &TmfcConfig) -> Result<DesignSpec> {
    let design = &config.design;
    let rest = matrix("rest_matrix", &design.rest_matrix)?;
    let tasks = design
        .task_matrices
        .iter()
        .map(|(name, rows)| Ok((name.clone(), matrix(name, rows)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut spec = DesignSpec::new(rest, tasks)
        .with_padding(design.first_rest_s, design.last_rest_s)
        .with_rest_before(design.rest_before)
        .with_durations(match &design.durations {
            DurationsConfig::Uniform(d) => Durations::Uniform(*d),
            DurationsConfig::PerTask(list) => Durations::PerTask(list.clone()),
        });
    if let Some(labels) = &design.labels {
        spec = spec.with_labels(labels.iter().cloned());
    }
    match &design.onsets {
        Some(onsets) => spec = spec.with_onsets(onsets.clone()),
        // labels given without onsets: one task per second
        None if design.labels.is_some() => {
            let count = spec.labels.len();
            spec = spec.with_onsets((0..count).map(|i| i as f64).collect());
        }
        None => {}
    }
    Ok(spec)
}

pub fn model_parameters(model: &ModelConfig) -> WilsonCowanParameters {
    WilsonCowanParameters {
        dt_ms: model.dt_ms,
        k_gl: model.k_gl,
        signal_v: model.signal_v,
        tau_ou: model.tau_ou,
        sigma_ou: model.sigma_ou,
        exc_ou_mean: model.exc_ou_mean,
        inh_ou_mean: model.inh_ou_mean,
        tau_exc: model.tau_exc,
        tau_inh: model.tau_inh,
        c_excexc: model.c_excexc,
        c_excinh: model.c_excinh,
        c_inhexc: model.c_inhexc,
        c_inhinh: model.c_inhinh,
        a_exc: model.a_exc,
        a_inh: model.a_inh,
        mu_exc: model.mu_exc,
        mu_inh: model.mu_inh,
        exc_ext: model.exc_ext,
        inh_ext: model.inh_ext,
        seed: model.seed,
    }
}

/// Model with the rest matrix installed; the driver swaps matrices per block.
pub fn build_model(config: &TmfcConfig) -> Result<WilsonCowanModel> {
    let rest = matrix("rest_matrix", &config.design.rest_matrix)?;
    let lengths = match &config.model.lengths {
        Some(rows) => {
            let cols = rows.first().map_or(0, Vec::len);
            Some(Array2::from_shape_vec((rows.len(), cols), rows.concat())?)
        }
        None => None,
    };
    Ok(WilsonCowanModel::new(
        model_parameters(&config.model),
        rest,
        lengths,
    )?)
}

pub fn driver_options(config: &TmfcConfig) -> DriverOptions {
    let bold = &config.bold;
    let variability = if bold.variable {
        Variability::Variable { seed: bold.seed }
    } else {
        Variability::Fixed
    };
    let normalize_max = bold.normalize.then_some(bold.normalize_max);

    let hemodynamics = match bold.mode {
        BoldMode::Disabled => HemodynamicMode::Disabled,
        BoldMode::Chunkwise => HemodynamicMode::Chunkwise {
            repetition_time_s: bold.repetition_time_s,
            normalize_max,
            variability,
        },
        BoldMode::Batch => HemodynamicMode::Batch(BoldOptions {
            dt_ms: config.activity.sampling_ms,
            repetition_time_s: bold.repetition_time_s,
            normalize_max,
            variability,
            kernel: match bold.kernel {
                KernelKind::BalloonWindkessel => ConvolutionKernel::BalloonWindkessel,
                KernelKind::Gamma => ConvolutionKernel::Gamma(GammaKernel {
                    length_s: bold.gamma.length_s,
                    peak: bold.gamma.peak,
                    undershoot: bold.gamma.undershoot,
                    beta: bold.gamma.beta,
                    scaling: bold.gamma.scaling,
                }),
            },
            drop_first_s: bold.drop_first_s,
        }),
    };

    DriverOptions {
        activity_sampling_ms: config.activity.sampling_ms,
        synaptic_activity: config.activity.synaptic_activity,
        bold_input: match bold.input {
            BoldInputKind::Exc => BoldInput::Excitatory,
            BoldInputKind::Sum => BoldInput::Sum,
            BoldInputKind::SynAct => BoldInput::SynapticActivity,
        },
        hemodynamics,
        builtin_bold: config.model.builtin_bold,
        clear_raw: config.run.clear_raw,
    }
}

/// Coarse series as nested rows plus time stamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub time_ms: Vec<f64>,
    /// `regions × samples`
    pub data: Vec<Vec<f64>>,
}

impl From<&CoarseSeries> for SeriesReport {
    fn from(series: &CoarseSeries) -> Self {
        Self {
            time_ms: series.time_ms().to_vec(),
            data: series.to_rows(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub label: String,
    pub start_s: f64,
    pub end_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionIntervals {
    pub label: String,
    pub intervals: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionReport {
    pub label: String,
    pub trial: usize,
}

/// Serializable result of [`run_from_config`].
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub version: &'static str,
    pub num_regions: usize,
    pub dt_ms: f64,
    pub fine_steps: u64,
    pub blocks: Vec<BlockReport>,
    /// Absent when `activity.store` is off
    pub excitatory: Option<SeriesReport>,
    pub inhibitory: Option<SeriesReport>,
    pub synaptic: Option<SeriesReport>,
    pub bold: Option<SeriesReport>,
    pub builtin_bold: Option<SeriesReport>,
    /// Condition of every BOLD sample, on the design clock
    pub bold_conditions: Vec<Option<ConditionReport>>,
    pub time_index: Vec<ConditionIntervals>,
    pub conflicts: Vec<String>,
}

fn time_index_report(map: &TimeIndexMap) -> Vec<ConditionIntervals> {
    map.iter()
        .map(|(label, intervals)| ConditionIntervals {
            label: label.to_string(),
            intervals: intervals.to_vec(),
        })
        .collect()
}

/// Series time stamps count from the start of the first block, `origin_s`
/// on the design clock.
fn conditions(
    map: &TimeIndexMap,
    series: Option<&CoarseSeries>,
    origin_s: f64,
) -> Vec<Option<ConditionReport>> {
    let Some(series) = series else {
        return Vec::new();
    };
    let times_s: Vec<f64> = series
        .time_ms()
        .iter()
        .map(|t| origin_s + t / 1000.0)
        .collect();
    map.annotate(&times_s)
        .into_iter()
        .map(|c| {
            c.map(|c| ConditionReport {
                label: c.label.to_string(),
                trial: c.trial,
            })
        })
        .collect()
}

fn blocks_report(schedule: &Schedule) -> Vec<BlockReport> {
    schedule
        .iter()
        .map(|block| BlockReport {
            label: block.label().to_string(),
            start_s: block.start_s(),
            end_s: block.end_s(),
        })
        .collect()
}

/// Validate `config`, then simulate its whole design.
pub fn run_from_config(config: &TmfcConfig) -> Result<SimulationReport> {
    validate_config(config)?;

    let design = build_design(config)?;
    let schedule = build_schedule(&design).map_err(EngineError::from)?;
    let model = build_model(config)?;
    let mut driver = SimulationDriver::new(model, driver_options(config))?;
    let output = driver.generate_full_series(&schedule)?;

    info!(
        "[SIMULATION] {} blocks, {} fine steps, {} BOLD samples",
        schedule.len(),
        output.fine_steps,
        output.bold.as_ref().map_or(0, CoarseSeries::len)
    );

    let store = config.activity.store;
    let origin_s = schedule.span().map_or(0.0, |(start, _)| start);
    Ok(SimulationReport {
        version: crate::VERSION,
        num_regions: design.num_regions(),
        dt_ms: config.model.dt_ms,
        fine_steps: output.fine_steps,
        blocks: blocks_report(&schedule),
        excitatory: store.then(|| SeriesReport::from(&output.excitatory)),
        inhibitory: store.then(|| SeriesReport::from(&output.inhibitory)),
        synaptic: output.synaptic.as_ref().map(SeriesReport::from),
        bold: output.bold.as_ref().map(SeriesReport::from),
        builtin_bold: output.builtin_bold.as_ref().map(SeriesReport::from),
        bold_conditions: conditions(&output.time_index, output.bold.as_ref(), origin_s),
        time_index: time_index_report(&output.time_index),
        conflicts: output
            .conflicts
            .iter()
            .map(ConfigConflict::to_string)
            .collect(),
    })
}
