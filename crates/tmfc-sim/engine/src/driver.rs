// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Streaming simulation driver.

Runs one neural mass model through a block schedule. Per block:

1. install the block's coupling matrix (self-coupling removed)
2. continue integration for the block's duration
3. derive synaptic activity if needed
4. resample excitatory / inhibitory / synaptic output onto the activity grid
5. record the block in the time-index map
6. feed the chunkwise hemodynamic stage
7. drop the model's raw buffers

The model is owned by the driver for the whole run and never re-created, so
its state flows continuously across coupling switches. A failed run leaves
everything accumulated so far in [`SimulationDriver::state`].
*/

use std::fmt;
use std::mem;

use ndarray::Array2;
use tracing::{debug, info, warn};

use tmfc_sim_hemodynamics::{generate_bold, BoldOptions, HemodynamicError, HemodynamicStage, Variability};
use tmfc_sim_neural::{model_synaptic_activity, NeuralMassModel};
use tmfc_structures::{resample, steps_per_interval, CoarseSeries};

use crate::error::{DesignError, EngineError, Result};
use crate::schedule::{Block, Schedule};
use crate::time_index::TimeIndexMap;

/// Signal fed to hemodynamic generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoldInput {
    Excitatory,
    /// Excitatory + inhibitory
    Sum,
    #[default]
    SynapticActivity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HemodynamicMode {
    Disabled,
    /// Block by block through a [`HemodynamicStage`] at the model's fine step
    Chunkwise {
        repetition_time_s: f64,
        normalize_max: Option<f64>,
        variability: Variability,
    },
    /// One pass over the accumulated coarse activity after the run; the
    /// series step replaces `BoldOptions::dt_ms`
    Batch(BoldOptions),
}

impl HemodynamicMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, HemodynamicMode::Disabled)
    }
}

impl Default for HemodynamicMode {
    fn default() -> Self {
        HemodynamicMode::Chunkwise {
            repetition_time_s: 2.0,
            normalize_max: Some(2.0),
            variability: Variability::Fixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    /// Interval of the coarse activity series, ms
    pub activity_sampling_ms: f64,
    /// Accumulate a coarse synaptic activity series
    pub synaptic_activity: bool,
    pub bold_input: BoldInput,
    pub hemodynamics: HemodynamicMode,
    /// Ask the model for its own BOLD output
    pub builtin_bold: bool,
    /// Drop the model's raw buffers after every block
    pub clear_raw: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            activity_sampling_ms: 20.0,
            synaptic_activity: false,
            bold_input: BoldInput::default(),
            hemodynamics: HemodynamicMode::default(),
            builtin_bold: false,
            clear_raw: true,
        }
    }
}

impl DriverOptions {
    fn needs_synaptic(&self) -> bool {
        self.synaptic_activity
            || (self.bold_input == BoldInput::SynapticActivity && self.hemodynamics.is_enabled())
    }
}

/// Mutually exclusive options that were corrected rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigConflict {
    /// Chunkwise generation wins; the model's built-in BOLD is switched off
    BuiltinBoldWithChunkwise,
}

impl fmt::Display for ConfigConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigConflict::BuiltinBoldWithChunkwise => write!(
                f,
                "chunkwise hemodynamics is incompatible with the model's built-in BOLD; built-in BOLD disabled"
            ),
        }
    }
}

/// Everything a run accumulates. Mutated once per block, never rolled back.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Global fine-step index of the next sample the model will produce
    idx_last_t: u64,
    model_started: bool,
    excitatory: CoarseSeries,
    inhibitory: CoarseSeries,
    synaptic: Option<CoarseSeries>,
    time_index: TimeIndexMap,
    hemodynamics: Option<HemodynamicStage>,
}

impl SimulationState {
    fn new(
        num_regions: usize,
        labels: &[String],
        store_synaptic: bool,
        hemodynamics: Option<HemodynamicStage>,
    ) -> Self {
        Self {
            idx_last_t: 0,
            model_started: false,
            excitatory: CoarseSeries::new(num_regions),
            inhibitory: CoarseSeries::new(num_regions),
            synaptic: store_synaptic.then(|| CoarseSeries::new(num_regions)),
            time_index: TimeIndexMap::new(labels),
            hemodynamics,
        }
    }

    pub fn idx_last_t(&self) -> u64 {
        self.idx_last_t
    }

    pub fn excitatory(&self) -> &CoarseSeries {
        &self.excitatory
    }

    pub fn inhibitory(&self) -> &CoarseSeries {
        &self.inhibitory
    }

    pub fn synaptic(&self) -> Option<&CoarseSeries> {
        self.synaptic.as_ref()
    }

    pub fn time_index(&self) -> &TimeIndexMap {
        &self.time_index
    }

    pub fn hemodynamics(&self) -> Option<&HemodynamicStage> {
        self.hemodynamics.as_ref()
    }
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub excitatory: CoarseSeries,
    pub inhibitory: CoarseSeries,
    pub synaptic: Option<CoarseSeries>,
    /// Chunkwise or batch BOLD, depending on the hemodynamic mode
    pub bold: Option<CoarseSeries>,
    /// BOLD computed by the model itself
    pub builtin_bold: Option<CoarseSeries>,
    pub time_index: TimeIndexMap,
    pub conflicts: Vec<ConfigConflict>,
    /// Fine steps integrated over the run
    pub fine_steps: u64,
}

pub struct SimulationDriver<M: NeuralMassModel> {
    model: M,
    options: DriverOptions,
    /// Fine steps per activity sample
    activity_step: usize,
    conflicts: Vec<ConfigConflict>,
    state: SimulationState,
}

impl<M: NeuralMassModel> SimulationDriver<M> {
    /// Take ownership of `model` and settle conflicting options.
    pub fn new(mut model: M, mut options: DriverOptions) -> Result<Self> {
        let activity_step = steps_per_interval(options.activity_sampling_ms, model.dt_ms())?;

        let mut conflicts = Vec::new();
        let chunkwise = matches!(options.hemodynamics, HemodynamicMode::Chunkwise { .. });
        if chunkwise && (options.builtin_bold || model.builtin_bold_enabled()) {
            let conflict = ConfigConflict::BuiltinBoldWithChunkwise;
            warn!("[DRIVER] {}", conflict);
            options.builtin_bold = false;
            conflicts.push(conflict);
        }
        model.set_builtin_bold(options.builtin_bold)?;

        debug!(
            "[DRIVER] {} model, {} regions, activity every {} steps, hemodynamics {:?}",
            model.model_name(),
            model.num_regions(),
            activity_step,
            options.hemodynamics
        );
        let state = SimulationState::new(model.num_regions(), &[], false, None);
        Ok(Self {
            model,
            options,
            activity_step,
            conflicts,
            state,
        })
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn conflicts(&self) -> &[ConfigConflict] {
        &self.conflicts
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// State of the current (or last failed) run.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Run every block of `schedule` from a fresh model state.
    pub fn generate_full_series(&mut self, schedule: &Schedule) -> Result<SimulationOutput> {
        let n = self.model.num_regions();
        let stage = match &self.options.hemodynamics {
            HemodynamicMode::Chunkwise {
                repetition_time_s,
                normalize_max,
                variability,
            } => Some(HemodynamicStage::new(
                n,
                self.model.dt_ms(),
                repetition_time_s * 1e3,
                *normalize_max,
                *variability,
            )?),
            _ => None,
        };
        self.state = SimulationState::new(n, schedule.labels(), self.options.needs_synaptic(), stage);
        if let Some(block) = schedule
            .iter()
            .find(|b| b.coupling().num_regions() != n)
        {
            return Err(EngineError::ShapeMismatch {
                expected: n,
                actual: block.coupling().num_regions(),
            });
        }

        for (i, block) in schedule.iter().enumerate() {
            self.process_block(block, i == 0)?;
        }

        let batch_bold = match &self.options.hemodynamics {
            HemodynamicMode::Batch(bold_options) => Some(self.batch_bold(bold_options)?),
            _ => None,
        };

        let state = mem::replace(
            &mut self.state,
            SimulationState::new(n, schedule.labels(), false, None),
        );
        let output = SimulationOutput {
            excitatory: state.excitatory,
            inhibitory: state.inhibitory,
            synaptic: state.synaptic,
            bold: state
                .hemodynamics
                .map(HemodynamicStage::into_series)
                .or(batch_bold),
            builtin_bold: self.model.builtin_bold().cloned(),
            time_index: state.time_index,
            conflicts: self.conflicts.clone(),
            fine_steps: state.idx_last_t,
        };
        info!(
            "[DRIVER] run complete: {} blocks, {} fine steps, {} activity samples, {} BOLD samples",
            schedule.len(),
            output.fine_steps,
            output.excitatory.len(),
            output.bold.as_ref().map_or(0, CoarseSeries::len)
        );
        Ok(output)
    }

    fn process_block(&mut self, block: &Block, is_first: bool) -> Result<()> {
        let dt = self.model.dt_ms();
        let duration_ms = block.duration_s() * 1e3;
        let steps = if duration_ms > 0.0 {
            (duration_ms / dt).round() as usize
        } else {
            0
        };

        if is_first {
            if let Some(stage) = &self.state.hemodynamics {
                if steps < stage.chunksize() {
                    return Err(DesignError::InsufficientFirstBlock {
                        steps,
                        required: stage.chunksize(),
                    }
                    .into());
                }
            }
        }
        if steps == 0 {
            debug!(
                "[DRIVER] empty block '{}' [{}, {}] s: recorded, not integrated",
                block.label(),
                block.start_s(),
                block.end_s()
            );
            self.state
                .time_index
                .record(block.label(), block.start_s(), block.end_s())?;
            return Ok(());
        }
        debug!(
            "[DRIVER] block '{}' [{}, {}] s: {} fine steps",
            block.label(),
            block.start_s(),
            block.end_s(),
            steps
        );

        self.model
            .set_coupling_matrix(block.coupling().without_self_coupling())?;
        self.model.set_duration_ms(duration_ms)?;
        self.model.run(self.state.model_started)?;
        self.state.model_started = true;

        let expected = self.state.excitatory.num_regions();
        for rows in [self.model.excitatory().nrows(), self.model.inhibitory().nrows()] {
            if rows != expected {
                return Err(EngineError::ShapeMismatch {
                    expected,
                    actual: rows,
                });
            }
        }

        let synaptic = if self.options.needs_synaptic() {
            Some(model_synaptic_activity(&self.model)?)
        } else {
            None
        };

        let exc = self.model.excitatory();
        let inh = self.model.inhibitory();
        let produced = exc.ncols();
        let offset = self.state.idx_last_t;
        let step = self.activity_step;
        self.state
            .excitatory
            .append(resample(exc, step, offset, dt)?)?;
        self.state
            .inhibitory
            .append(resample(inh, step, offset, dt)?)?;
        if let (Some(series), Some(sa)) = (self.state.synaptic.as_mut(), synaptic.as_ref()) {
            series.append(resample(sa.view(), step, offset, dt)?)?;
        }
        self.state.idx_last_t += produced as u64;

        self.state
            .time_index
            .record(block.label(), block.start_s(), block.end_s())?;

        if let Some(stage) = self.state.hemodynamics.as_mut() {
            let input: Array2<f64> = match (self.options.bold_input, synaptic) {
                (BoldInput::Excitatory, _) => exc.to_owned(),
                (BoldInput::Sum, _) => &exc + &inh,
                (BoldInput::SynapticActivity, Some(sa)) => sa,
                (BoldInput::SynapticActivity, None) => model_synaptic_activity(&self.model)?,
            };
            stage.process_chunk(input.view(), is_first)?;
        }

        if self.options.clear_raw {
            self.model.clear_outputs();
        }
        Ok(())
    }

    fn batch_bold(&self, bold_options: &BoldOptions) -> Result<CoarseSeries> {
        let exc = self.state.excitatory.data();
        let input = match self.options.bold_input {
            BoldInput::Excitatory => exc.to_owned(),
            BoldInput::Sum => &exc + &self.state.inhibitory.data(),
            BoldInput::SynapticActivity => match &self.state.synaptic {
                Some(series) => series.data().to_owned(),
                None => {
                    return Err(HemodynamicError::InvalidParameter {
                        name: "bold_input",
                        reason: "synaptic activity was not recorded".to_string(),
                    }
                    .into())
                }
            },
        };
        let options = BoldOptions {
            dt_ms: self.options.activity_sampling_ms,
            ..bold_options.clone()
        };
        Ok(generate_bold(input.view(), &options)?)
    }
}
