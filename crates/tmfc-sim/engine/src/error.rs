// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error types.
//!
//! Every error is fatal to the run. Mode conflicts are not errors; see
//! [`crate::driver::ConfigConflict`].

use tmfc_sim_hemodynamics::HemodynamicError;
use tmfc_sim_neural::ModelError;
use tmfc_structures::StructuresError;

/// Inconsistent experiment design.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DesignError {
    #[error("design has no tasks")]
    Empty,

    #[error("length mismatch: {onsets} onsets, {labels} labels, {durations} durations")]
    LengthMismatch {
        onsets: usize,
        labels: usize,
        durations: usize,
    },

    #[error("task label '{0}' has no coupling matrix")]
    UnknownLabel(String),

    #[error("'{0}' is reserved for rest blocks")]
    ReservedLabel(String),

    #[error("onsets must be strictly increasing: onset {index} ({current}) follows {previous}")]
    NonIncreasingOnsets {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidDuration { name: String, value: f64 },

    #[error("coupling matrix for '{label}' has {actual} regions, rest matrix has {expected}")]
    RegionMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "first block yields {steps} fine steps, chunkwise hemodynamics needs at least {required}"
    )]
    InsufficientFirstBlock { steps: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("design error: {0}")]
    Design(#[from] DesignError),

    #[error("activity chunk has {actual} regions, hemodynamic stage expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("hemodynamic error: {0}")]
    Hemodynamic(HemodynamicError),

    #[error(transparent)]
    Structures(#[from] StructuresError),
}

impl From<HemodynamicError> for EngineError {
    fn from(err: HemodynamicError) -> Self {
        match err {
            HemodynamicError::ShapeMismatch { expected, actual } => {
                EngineError::ShapeMismatch { expected, actual }
            }
            other => EngineError::Hemodynamic(other),
        }
    }
}

pub type Result<T> = core::result::Result<T, EngineError>;
