// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Contract between a neural mass model and the block driver.

use ndarray::ArrayView2;
use tmfc_structures::{CoarseSeries, CouplingMatrix};

use crate::error::Result;

/// Within-region coupling constants used by synaptic activity derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCoupling {
    /// Excitatory → excitatory
    pub c_excexc: f64,
    /// Excitatory → inhibitory
    pub c_excinh: f64,
    /// Inhibitory → excitatory
    pub c_inhexc: f64,
    /// Inhibitory → inhibitory
    pub c_inhinh: f64,
}

/// A continuous-time network model driven block by block.
///
/// The model owns its continuation state. `run(true)` must pick up exactly
/// where the previous run stopped, whatever coupling matrix is installed in
/// between. Output buffers hold the fine-step activity of the latest run only
/// (`regions × steps`).
pub trait NeuralMassModel {
    fn model_name(&self) -> &'static str;

    fn num_regions(&self) -> usize;

    /// Integration step in ms
    fn dt_ms(&self) -> f64;

    /// Install a new inter-regional coupling matrix, used as given.
    fn set_coupling_matrix(&mut self, coupling: CouplingMatrix) -> Result<()>;

    fn coupling_matrix(&self) -> &CouplingMatrix;

    /// Length of the next run in ms
    fn set_duration_ms(&mut self, duration_ms: f64) -> Result<()>;

    /// Integrate for the configured duration. `continue_run = false`
    /// re-initialises the state first.
    fn run(&mut self, continue_run: bool) -> Result<()>;

    fn excitatory(&self) -> ArrayView2<'_, f64>;

    fn inhibitory(&self) -> ArrayView2<'_, f64>;

    fn local_coupling(&self) -> LocalCoupling;

    /// Drop the output buffers; continuation state is untouched.
    fn clear_outputs(&mut self);

    /// Whether the model computes its own BOLD signal while running.
    fn builtin_bold_enabled(&self) -> bool {
        false
    }

    fn set_builtin_bold(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    fn builtin_bold(&self) -> Option<&CoarseSeries> {
        None
    }
}
