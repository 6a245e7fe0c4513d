// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Phase-consistent resampling of fine-step signals.
//!
//! A run produces its fine-step signal in pieces (one per block, or one per
//! hemodynamic chunk). Each piece is subsampled independently, but the pieces
//! must join without duplicate samples, gaps or phase resets. The selection is
//! therefore anchored to the *global* fine-step index: absolute index `k` is
//! kept iff `k ≡ 1 (mod step)`, whichever call it lands in.
//!
//! ```text
//! global index : 0 1 2 3 4 5 6 7 8 9 ...        (step = 4)
//! selected     :   x       x       x
//! call A [0,6) :   x       x
//! call B [6,10):                   x
//! ```

use ndarray::{s, Array2, ArrayView2};

use crate::error::{Result, StructuresError};

/// Output of one resampling call.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    /// Coarse signal, `regions × selected`
    pub signal: Array2<f64>,
    /// Time stamp of each selected sample (fine index × dt), in ms
    pub time_ms: Vec<f64>,
}

impl Resampled {
    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }
}

/// First local index selected in a piece starting at `global_offset`.
///
/// Equals `(step − ((global_offset − 1) mod step)) mod step`; the outer
/// reduction makes an offset congruent to 1 start at local index 0.
pub fn phase_start(step: usize, global_offset: u64) -> usize {
    let step_u64 = step as u64;
    // (global_offset - 1) mod step without underflow at offset 0
    let prev = (global_offset % step_u64 + step_u64 - 1) % step_u64;
    ((step_u64 - prev) % step_u64) as usize
}

/// Number of fine steps in one coarse interval, `round(interval_ms / dt_ms)`.
pub fn steps_per_interval(interval_ms: f64, dt_ms: f64) -> Result<usize> {
    if !(interval_ms.is_finite() && dt_ms.is_finite()) || dt_ms <= 0.0 || interval_ms <= 0.0 {
        return Err(StructuresError::InvalidInterval { interval_ms, dt_ms });
    }
    let steps = (interval_ms / dt_ms).round();
    if steps < 1.0 {
        return Err(StructuresError::InvalidInterval { interval_ms, dt_ms });
    }
    Ok(steps as usize)
}

/// Subsample `signal` (regions × fine steps) every `step` fine steps.
///
/// `global_offset` is the global fine-step index of the first column of
/// `signal`. Calls are pure: the same inputs always give the same output.
pub fn resample(
    signal: ArrayView2<'_, f64>,
    step: usize,
    global_offset: u64,
    dt_ms: f64,
) -> Result<Resampled> {
    if step == 0 {
        return Err(StructuresError::ZeroStep);
    }
    let len = signal.ncols();
    let start = phase_start(step, global_offset);
    if start >= len {
        return Ok(Resampled {
            signal: Array2::zeros((signal.nrows(), 0)),
            time_ms: Vec::new(),
        });
    }

    let coarse = signal.slice(s![.., start..;step as isize]).to_owned();
    let time_ms = (start..len)
        .step_by(step)
        .map(|j| (global_offset + j as u64) as f64 * dt_ms)
        .collect();

    Ok(Resampled {
        signal: coarse,
        time_ms,
    })
}
