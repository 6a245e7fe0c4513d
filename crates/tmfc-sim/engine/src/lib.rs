// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # TMFC Simulation Engine
//!
//! Block-wise simulation of a neural mass model whose coupling matrix
//! switches between rest and task states:
//! - **Design / Schedule**: onsets, labels and durations laid out as blocks
//! - **Driver**: streams the model through the blocks, resampling activity
//!   and feeding chunked hemodynamics without phase drift at block edges
//! - **Time index**: which condition and trial every time point belongs to
//!
//! ## Example
//! ```no_run
//! use tmfc_sim_engine::{build_schedule, DesignSpec, DriverOptions, SimulationDriver};
//! use tmfc_sim_neural::{WilsonCowanModel, WilsonCowanParameters};
//! use tmfc_structures::CouplingMatrix;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rest = CouplingMatrix::zeros(4);
//! let task = CouplingMatrix::new(ndarray::Array2::from_elem((4, 4), 0.2))?;
//! let design = DesignSpec::new(rest.clone(), [("A".to_string(), task)])
//!     .with_onsets(vec![2.0]);
//! let schedule = build_schedule(&design)?;
//!
//! let model = WilsonCowanModel::new(WilsonCowanParameters::default(), rest, None)?;
//! let mut driver = SimulationDriver::new(model, DriverOptions::default())?;
//! let output = driver.generate_full_series(&schedule)?;
//! println!("{} BOLD samples", output.bold.map_or(0, |b| b.len()));
//! # Ok(())
//! # }
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod design;
pub mod driver;
pub mod error;
pub mod schedule;
pub mod time_index;

pub use design::{DesignSpec, Durations};
pub use driver::{
    BoldInput, ConfigConflict, DriverOptions, HemodynamicMode, SimulationDriver, SimulationOutput,
    SimulationState,
};
pub use error::{DesignError, EngineError, Result};
pub use schedule::{build_schedule, Block, Schedule, REST_LABEL};
pub use time_index::{Condition, TimeIndexMap};
