// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One-shot BOLD generation over a complete activity series.

use ndarray::ArrayView2;
use tracing::debug;

use tmfc_structures::{resample, steps_per_interval, CoarseSeries};

use crate::balloon::Variability;
use crate::error::{HemodynamicError, Result};
use crate::gamma::GammaKernel;
use crate::stage::HemodynamicStage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvolutionKernel {
    BalloonWindkessel,
    Gamma(GammaKernel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoldOptions {
    /// Step of the activity series, ms
    pub dt_ms: f64,
    pub repetition_time_s: f64,
    /// Input is multiplied by this before convolution
    pub normalize_max: Option<f64>,
    pub variability: Variability,
    pub kernel: ConvolutionKernel,
    /// Leading seconds of BOLD discarded as transient
    pub drop_first_s: f64,
}

impl Default for BoldOptions {
    fn default() -> Self {
        Self {
            dt_ms: 5.0,
            repetition_time_s: 2.0,
            normalize_max: Some(2.0),
            variability: Variability::Fixed,
            kernel: ConvolutionKernel::BalloonWindkessel,
            drop_first_s: 12.0,
        }
    }
}

/// Convolve `activity` (regions × steps) into a BOLD series sampled at TR.
pub fn generate_bold(activity: ArrayView2<'_, f64>, options: &BoldOptions) -> Result<CoarseSeries> {
    if !(options.drop_first_s.is_finite() && options.drop_first_s >= 0.0) {
        return Err(HemodynamicError::InvalidParameter {
            name: "drop_first",
            reason: format!("must be non-negative, got {}", options.drop_first_s),
        });
    }
    let tr_ms = options.repetition_time_s * 1e3;

    let mut series = match options.kernel {
        ConvolutionKernel::BalloonWindkessel => {
            let mut stage = HemodynamicStage::new(
                activity.nrows(),
                options.dt_ms,
                tr_ms,
                options.normalize_max,
                options.variability,
            )?;
            stage.run_batch(activity)?;
            stage.into_series()
        }
        ConvolutionKernel::Gamma(kernel) => {
            let step = steps_per_interval(tr_ms, options.dt_ms)?;
            let scaled = match options.normalize_max {
                Some(scale) => activity.mapv(|v| v * scale),
                None => activity.to_owned(),
            };
            let convolved = kernel.convolve(scaled.view(), options.dt_ms)?;
            let mut series = CoarseSeries::new(activity.nrows());
            series.append(resample(convolved.view(), step, 0, options.dt_ms)?)?;
            series
        }
    };

    let drop = (options.drop_first_s / options.repetition_time_s).floor() as usize;
    series.drop_first(drop);
    debug!(
        "[HRF-STAGE] batch BOLD: {} samples after dropping {}",
        series.len(),
        drop
    );
    Ok(series)
}
