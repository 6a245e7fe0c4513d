// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Neural Mass Models
//!
//! The block driver talks to models only through [`NeuralMassModel`], so any
//! network model that can continue from its own state can be plugged in.
//!
//! ## Adding a New Model
//!
//! 1. Create `src/models/your_model.rs`
//! 2. Implement `NeuralMassModel`
//! 3. Add tests
//! 4. Export in `mod.rs`

pub mod traits;
pub mod wilson_cowan;

pub use traits::{LocalCoupling, NeuralMassModel};
pub use wilson_cowan::{WilsonCowanModel, WilsonCowanParameters};
