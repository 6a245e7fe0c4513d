// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # TMFC Hemodynamics
//!
//! Turns neural activity into BOLD signal:
//! - [`HemodynamicIntegrator`]: contract for physiological state steppers
//! - [`BalloonWindkessel`]: the default integrator
//! - [`HemodynamicStage`]: chunked convolution with carried state and leftover
//! - [`generate_bold`]: batch helper with Balloon–Windkessel or gamma kernels

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod balloon;
pub mod batch;
pub mod error;
pub mod gamma;
pub mod stage;

pub use balloon::{BalloonWindkessel, HemodynamicIntegrator, HemodynamicState, Variability};
pub use batch::{generate_bold, BoldOptions, ConvolutionKernel};
pub use error::{HemodynamicError, Result};
pub use gamma::GammaKernel;
pub use stage::HemodynamicStage;
