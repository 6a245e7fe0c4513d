// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Inter-regional coupling matrices.
//!
//! A coupling matrix is held fixed for the length of one simulation block and
//! swapped between blocks. Matrices are validated once on construction; the
//! self-coupling diagonal is only removed when a matrix is installed into a
//! model (see [`CouplingMatrix::without_self_coupling`]).

use ndarray::{Array2, ArrayView2};

use crate::error::{Result, StructuresError};

/// Square, finite `regions × regions` weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingMatrix {
    weights: Array2<f64>,
}

impl CouplingMatrix {
    /// Wrap a weight matrix, checking that it is square and finite.
    pub fn new(weights: Array2<f64>) -> Result<Self> {
        let (rows, cols) = weights.dim();
        if rows != cols {
            return Err(StructuresError::NotSquare { rows, cols });
        }
        if let Some(((row, col), _)) = weights.indexed_iter().find(|(_, w)| !w.is_finite()) {
            return Err(StructuresError::NonFinite { row, col });
        }
        Ok(Self { weights })
    }

    /// Build a matrix from nested rows (the TOML/JSON representation).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let mut flat = Vec::with_capacity(n * n);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(StructuresError::RaggedRows {
                    row,
                    len: values.len(),
                    expected: n,
                });
            }
            flat.extend_from_slice(values);
        }
        let weights = Array2::from_shape_vec((n, n), flat)?;
        Self::new(weights)
    }

    /// Zero matrix for `num_regions` regions (an uncoupled network).
    pub fn zeros(num_regions: usize) -> Self {
        Self {
            weights: Array2::zeros((num_regions, num_regions)),
        }
    }

    pub fn num_regions(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// Copy of this matrix with the diagonal forced to zero (no self-coupling).
    pub fn without_self_coupling(&self) -> Self {
        let mut weights = self.weights.clone();
        weights.diag_mut().fill(0.0);
        Self { weights }
    }

    /// Nested-row representation, used for serialization.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.weights.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.weights
    }
}
