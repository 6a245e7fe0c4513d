// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Hemodynamic convolution stage.

Consumes neural activity in chunks of arbitrary length and emits BOLD
samples at the repetition time (TR). Only whole TR windows are integrated;
the tail that does not fill a window is kept as raw activity and prepended
to the next chunk, so splitting a run into chunks gives exactly the same
BOLD series as one batch call.

```text
chunk 1  |====|====|==       usable = 2 windows, leftover = 2 steps
chunk 2            ==|====|=  leftover ++ chunk, usable = 2 windows, leftover = 1
```
*/

use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use tracing::{debug, trace};

use tmfc_structures::{resample, steps_per_interval, CoarseSeries};

use crate::balloon::{BalloonWindkessel, HemodynamicIntegrator, HemodynamicState, Variability};
use crate::error::{HemodynamicError, Result};

/// Chunked BOLD generator owning its physiological state and output series.
#[derive(Debug, Clone)]
pub struct HemodynamicStage<I: HemodynamicIntegrator = BalloonWindkessel> {
    integrator: I,
    dt_ms: f64,
    /// Fine steps per TR window
    chunksize: usize,
    normalize_max: Option<f64>,
    state: HemodynamicState,
    /// Scaled activity not yet integrated, always shorter than `chunksize`
    leftover: Array2<f64>,
    bold: CoarseSeries,
    /// Global fine-step index of the next sample to integrate
    idx_last_t: u64,
}

impl HemodynamicStage<BalloonWindkessel> {
    /// Stage backed by the Balloon–Windkessel integrator.
    pub fn new(
        num_regions: usize,
        dt_ms: f64,
        repetition_time_ms: f64,
        normalize_max: Option<f64>,
        variability: Variability,
    ) -> Result<Self> {
        Self::with_integrator(
            BalloonWindkessel::new(num_regions, variability),
            dt_ms,
            repetition_time_ms,
            normalize_max,
        )
    }
}

impl<I: HemodynamicIntegrator> HemodynamicStage<I> {
    pub fn with_integrator(
        integrator: I,
        dt_ms: f64,
        repetition_time_ms: f64,
        normalize_max: Option<f64>,
    ) -> Result<Self> {
        let chunksize = steps_per_interval(repetition_time_ms, dt_ms)?;
        if let Some(scale) = normalize_max {
            if !scale.is_finite() {
                return Err(HemodynamicError::InvalidParameter {
                    name: "normalize_max",
                    reason: format!("must be finite, got {scale}"),
                });
            }
        }
        let n = integrator.num_regions();
        debug!(
            "[HRF-STAGE] {} regions, dt {} ms, TR {} ms ({} steps per window)",
            n, dt_ms, repetition_time_ms, chunksize
        );
        Ok(Self {
            integrator,
            dt_ms,
            chunksize,
            normalize_max,
            state: HemodynamicState::resting(n),
            leftover: Array2::zeros((n, 0)),
            bold: CoarseSeries::new(n),
            idx_last_t: 0,
        })
    }

    pub fn num_regions(&self) -> usize {
        self.integrator.num_regions()
    }

    pub fn chunksize(&self) -> usize {
        self.chunksize
    }

    pub fn dt_ms(&self) -> f64 {
        self.dt_ms
    }

    pub fn bold(&self) -> &CoarseSeries {
        &self.bold
    }

    pub fn into_series(self) -> CoarseSeries {
        self.bold
    }

    pub fn state(&self) -> &HemodynamicState {
        &self.state
    }

    pub fn leftover_len(&self) -> usize {
        self.leftover.ncols()
    }

    pub fn idx_last_t(&self) -> u64 {
        self.idx_last_t
    }

    /// Discard all state and output, as if freshly constructed.
    pub fn reset(&mut self) {
        let n = self.num_regions();
        self.state = HemodynamicState::resting(n);
        self.leftover = Array2::zeros((n, 0));
        self.bold = CoarseSeries::new(n);
        self.idx_last_t = 0;
    }

    /// Feed one activity chunk (regions × fine steps).
    ///
    /// `is_first` starts a new run. Returns the number of BOLD samples emitted
    /// by this call.
    pub fn process_chunk(&mut self, chunk: ArrayView2<'_, f64>, is_first: bool) -> Result<usize> {
        let n = self.num_regions();
        if chunk.nrows() != n {
            return Err(HemodynamicError::ShapeMismatch {
                expected: n,
                actual: chunk.nrows(),
            });
        }
        if is_first {
            self.reset();
        }

        let scaled = match self.normalize_max {
            Some(scale) => chunk.mapv(|v| v * scale),
            None => chunk.to_owned(),
        };
        let pending = if self.leftover.ncols() == 0 {
            scaled
        } else {
            concatenate(Axis(1), &[self.leftover.view(), scaled.view()])?
        };

        let length = pending.ncols();
        let usable = length - length % self.chunksize;
        if usable == 0 {
            trace!(
                "[HRF-STAGE] {} steps pending, below one window of {}",
                length,
                self.chunksize
            );
            self.leftover = pending;
            return Ok(0);
        }

        let (bold_fine, next_state) =
            self.integrator
                .advance(pending.slice(s![.., ..usable]), self.dt_ms * 1e-3, &self.state)?;
        let coarse = resample(bold_fine.view(), self.chunksize, self.idx_last_t, self.dt_ms)?;
        let emitted = coarse.len();
        self.bold.append(coarse)?;

        self.state = next_state;
        self.idx_last_t += usable as u64;
        self.leftover = pending.slice(s![.., usable..]).to_owned();
        trace!(
            "[HRF-STAGE] integrated {} steps, emitted {} samples, {} steps left over",
            usable,
            emitted,
            self.leftover.ncols()
        );
        Ok(emitted)
    }

    /// Batch mode: one call over a pre-assembled series.
    pub fn run_batch(&mut self, activity: ArrayView2<'_, f64>) -> Result<usize> {
        self.process_chunk(activity, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn stage(n: usize) -> HemodynamicStage {
        // dt 1 ms, TR 10 ms -> 10 steps per window
        HemodynamicStage::new(n, 1.0, 10.0, None, Variability::Fixed).unwrap()
    }

    #[test]
    fn test_short_chunk_only_accumulates() {
        let mut stage = stage(2);
        let emitted = stage
            .process_chunk(Array2::ones((2, 7)).view(), true)
            .unwrap();
        assert_eq!(emitted, 0);
        assert_eq!(stage.leftover_len(), 7);
        assert_eq!(stage.idx_last_t(), 0);
        assert!(stage.bold().is_empty());
    }

    #[test]
    fn test_leftover_carried_into_next_chunk() {
        let mut stage = stage(1);
        stage
            .process_chunk(Array2::ones((1, 7)).view(), true)
            .unwrap();
        let emitted = stage
            .process_chunk(Array2::ones((1, 8)).view(), false)
            .unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(stage.leftover_len(), 5);
        assert_eq!(stage.idx_last_t(), 10);
        assert_eq!(stage.bold().time_ms(), &[1.0]);
    }

    #[test]
    fn test_exact_window_leaves_no_leftover() {
        let mut stage = stage(1);
        let emitted = stage
            .process_chunk(Array2::ones((1, 30)).view(), true)
            .unwrap();
        assert_eq!(emitted, 3);
        assert_eq!(stage.leftover_len(), 0);
        assert_eq!(stage.bold().time_ms(), &[1.0, 11.0, 21.0]);
    }

    #[test]
    fn test_is_first_resets() {
        let mut stage = stage(1);
        stage
            .process_chunk(Array2::ones((1, 25)).view(), true)
            .unwrap();
        stage
            .process_chunk(Array2::ones((1, 12)).view(), true)
            .unwrap();
        assert_eq!(stage.bold().len(), 1);
        assert_eq!(stage.leftover_len(), 2);
        assert_eq!(stage.idx_last_t(), 10);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut stage = stage(3);
        let err = stage
            .process_chunk(Array2::ones((2, 20)).view(), true)
            .unwrap_err();
        assert_eq!(
            err,
            HemodynamicError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_normalisation_scales_input() {
        let input = Array2::from_elem((1, 4000), 0.5);
        let mut plain = stage(1);
        let mut scaled = HemodynamicStage::new(1, 1.0, 10.0, Some(2.0), Variability::Fixed).unwrap();
        plain
            .process_chunk(Array2::from_elem((1, 4000), 1.0).view(), true)
            .unwrap();
        scaled.process_chunk(input.view(), true).unwrap();
        assert_eq!(plain.bold(), scaled.bold());
    }
}
