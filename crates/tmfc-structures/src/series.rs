// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Append-only coarse time series.

use ndarray::{Array2, ArrayView2, Axis};
use tracing::trace;

use crate::error::{Result, StructuresError};
use crate::resample::Resampled;

/// Coarse `regions × samples` series with one time stamp (ms) per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarseSeries {
    data: Array2<f64>,
    time_ms: Vec<f64>,
}

impl CoarseSeries {
    /// Empty series for `num_regions` regions.
    pub fn new(num_regions: usize) -> Self {
        Self {
            data: Array2::zeros((num_regions, 0)),
            time_ms: Vec::new(),
        }
    }

    pub fn num_regions(&self) -> usize {
        self.data.nrows()
    }

    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn time_ms(&self) -> &[f64] {
        &self.time_ms
    }

    /// Append one resampled piece; region counts must agree.
    pub fn append(&mut self, piece: Resampled) -> Result<()> {
        if piece.signal.nrows() != self.num_regions() {
            return Err(StructuresError::RegionMismatch {
                expected: self.num_regions(),
                actual: piece.signal.nrows(),
            });
        }
        if piece.is_empty() {
            return Ok(());
        }
        trace!(
            "[SERIES] appending {} samples ({} -> {})",
            piece.len(),
            self.len(),
            self.len() + piece.len()
        );
        self.data.append(Axis(1), piece.signal.view())?;
        self.time_ms.extend(piece.time_ms);
        Ok(())
    }

    /// Drop the first `count` samples (used to discard hemodynamic transients).
    pub fn drop_first(&mut self, count: usize) {
        let count = count.min(self.len());
        if count == 0 {
            return;
        }
        self.data = self.data.slice(ndarray::s![.., count..]).to_owned();
        self.time_ms.drain(..count);
    }

    /// Nested-row representation, used for serialization.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    pub fn into_parts(self) -> (Array2<f64>, Vec<f64>) {
        (self.data, self.time_ms)
    }
}
