// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # TMFC Core Structures
//!
//! Data types shared by every simulation crate:
//! - **Coupling**: square inter-regional connection matrices
//! - **Resample**: phase-consistent subsampling of fine-step signals
//! - **Series**: append-only coarse time series accumulators
//! - **Noise**: seeded Gaussian sampling shared by the stochastic models
//!
//! All signals are laid out as `regions × time` (`Array2<f64>`), matching the
//! layout produced by the neural mass models.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod coupling;
pub mod error;
pub mod noise;
pub mod resample;
pub mod series;

pub use coupling::CouplingMatrix;
pub use error::{Result, StructuresError};
pub use noise::{seeded_rng, standard_normal};
pub use resample::{phase_start, resample, steps_per_interval, Resampled};
pub use series::CoarseSeries;
