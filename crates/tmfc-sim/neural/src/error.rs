// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for neural mass models

use tmfc_sim_hemodynamics::HemodynamicError;
use tmfc_structures::StructuresError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid model parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("fiber length matrix is {rows}x{cols}, expected {expected}x{expected}")]
    LengthShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("activity shapes disagree: excitatory {exc:?}, inhibitory {inh:?}")]
    ActivityShape {
        exc: (usize, usize),
        inh: (usize, usize),
    },

    #[error(transparent)]
    Structures(#[from] StructuresError),

    #[error("built-in hemodynamics failed: {0}")]
    Hemodynamic(#[from] HemodynamicError),
}

pub type Result<T> = core::result::Result<T, ModelError>;
