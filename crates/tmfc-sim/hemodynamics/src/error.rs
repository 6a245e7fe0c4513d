// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for hemodynamic generation

use tmfc_structures::StructuresError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HemodynamicError {
    #[error("activity chunk has {actual} regions, stage is configured for {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("hemodynamic state has {actual} regions, integrator expects {expected}")]
    StateMismatch { expected: usize, actual: usize },

    #[error("invalid hemodynamic parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Structures(#[from] StructuresError),
}

impl From<ndarray::ShapeError> for HemodynamicError {
    fn from(err: ndarray::ShapeError) -> Self {
        HemodynamicError::Structures(err.into())
    }
}

pub type Result<T> = core::result::Result<T, HemodynamicError>;
