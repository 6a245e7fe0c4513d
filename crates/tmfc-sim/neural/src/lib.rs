// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # TMFC Neural Mass Models
//!
//! - **Models**: the [`NeuralMassModel`] contract and a Wilson–Cowan network
//! - **Synaptic**: synaptic activity derived from population output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod models;
pub mod synaptic;

pub use error::{ModelError, Result};
pub use models::{LocalCoupling, NeuralMassModel, WilsonCowanModel, WilsonCowanParameters};
pub use synaptic::{model_synaptic_activity, synaptic_activity};
