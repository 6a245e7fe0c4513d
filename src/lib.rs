// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # TMFC - block-design neural/BOLD simulation
//!
//! Simulates a neural mass model whose inter-regional coupling switches
//! between a rest state and task states according to an experimental block
//! design, producing coarse neural activity, synaptic activity and BOLD
//! series that stay phase-consistent across block boundaries.
//!
//! ## Crates
//! - [`structures`]: coupling matrices, phase-consistent resampling, coarse series
//! - [`neural`]: `NeuralMassModel` trait, Wilson-Cowan model, synaptic activity
//! - [`hemodynamics`]: Balloon-Windkessel integrator, chunked BOLD stage, batch helpers
//! - [`engine`]: design, block scheduler, time-index map, streaming driver
//! - [`config`]: TOML configuration with overrides and validation
//! - [`observability`]: logging setup and per-crate debug flags
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tmfc::config::{load_config, validate_config};
//! use tmfc::simulation::run_from_config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None, None)?;
//! validate_config(&config)?;
//! let report = run_from_config(&config)?;
//! println!("{} BOLD samples", report.bold.as_ref().map_or(0, |b| b.time_ms.len()));
//! # Ok(())
//! # }
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod simulation;

pub use tmfc_config as config;
pub use tmfc_observability as observability;
pub use tmfc_sim_engine as engine;
pub use tmfc_sim_hemodynamics as hemodynamics;
pub use tmfc_sim_neural as neural;
pub use tmfc_structures as structures;

pub mod prelude {
    pub use crate::config::{load_config, validate_config, TmfcConfig};
    pub use crate::engine::{
        build_schedule, BoldInput, DesignSpec, DriverOptions, Durations, HemodynamicMode,
        SimulationDriver, SimulationOutput, TimeIndexMap,
    };
    pub use crate::hemodynamics::{BoldOptions, HemodynamicStage, Variability};
    pub use crate::neural::{NeuralMassModel, WilsonCowanModel, WilsonCowanParameters};
    pub use crate::simulation::{run_from_config, SimulationReport};
    pub use crate::structures::{CoarseSeries, CouplingMatrix};
}
