// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for core structures

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuresError {
    #[error("coupling matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("coupling matrix contains a non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    #[error("coupling matrix rows have inconsistent lengths: row {row} has {len}, expected {expected}")]
    RaggedRows { row: usize, len: usize, expected: usize },

    #[error("invalid sampling interval: {interval_ms} ms is not a positive multiple of dt={dt_ms} ms")]
    InvalidInterval { interval_ms: f64, dt_ms: f64 },

    #[error("step size must be > 0")]
    ZeroStep,

    #[error("region count mismatch: expected {expected}, got {actual}")]
    RegionMismatch { expected: usize, actual: usize },

    #[error("array shape error: {0}")]
    Shape(String),
}

impl From<ndarray::ShapeError> for StructuresError {
    fn from(err: ndarray::ShapeError) -> Self {
        StructuresError::Shape(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, StructuresError>;
