// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Double-gamma canonical HRF.
//!
//! `g(t) = Γpdf(t; peak) − beta·Γpdf(t; undershoot)`, rescaled so that its
//! maximum equals `scaling`. Stateless, so it only supports batch use.

use ndarray::{Array1, Array2, ArrayView2, Zip};
use statrs::distribution::{Continuous, Gamma};

use crate::error::{HemodynamicError, Result};

/// Gamma density with unit rate.
fn unit_gamma(name: &'static str, shape: f64) -> Result<Gamma> {
    Gamma::new(shape, 1.0).map_err(|e| HemodynamicError::InvalidParameter {
        name,
        reason: format!("gamma shape {shape}: {e}"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaKernel {
    /// Kernel support, seconds
    pub length_s: f64,
    /// Time to peak, seconds
    pub peak: f64,
    pub undershoot: f64,
    /// Undershoot weight
    pub beta: f64,
    /// Kernel maximum after rescaling
    pub scaling: f64,
}

impl Default for GammaKernel {
    fn default() -> Self {
        Self {
            length_s: 32.0,
            peak: 6.0,
            undershoot: 16.0,
            beta: 0.1667,
            scaling: 0.6,
        }
    }
}

impl GammaKernel {
    /// Kernel sampled every `dt_ms` over `[0, length_s)`.
    pub fn sample(&self, dt_ms: f64) -> Result<Array1<f64>> {
        if !(dt_ms.is_finite() && dt_ms > 0.0) {
            return Err(HemodynamicError::InvalidParameter {
                name: "dt",
                reason: format!("must be positive, got {dt_ms}"),
            });
        }
        let dt_s = dt_ms * 1e-3;
        // samples at 0, dt, 2dt, ... strictly below length_s
        let len = (self.length_s * 1e3 / dt_ms - 1e-9).ceil().max(0.0) as usize;
        let peak = unit_gamma("peak", self.peak)?;
        let undershoot = unit_gamma("undershoot", self.undershoot)?;
        let values = Array1::from_shape_fn(len, |i| {
            let t = i as f64 * dt_s;
            peak.pdf(t) - self.beta * undershoot.pdf(t)
        });
        let max = values.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        if !(max.is_finite() && max > 0.0) {
            return Err(HemodynamicError::InvalidParameter {
                name: "gamma_kernel",
                reason: format!("kernel maximum is {max}"),
            });
        }
        Ok(values.mapv(|v| v / max * self.scaling))
    }

    /// Causal convolution of every region with the kernel, truncated to the
    /// input length.
    pub fn convolve(&self, activity: ArrayView2<'_, f64>, dt_ms: f64) -> Result<Array2<f64>> {
        let kernel = self.sample(dt_ms)?;
        let mut out = Array2::zeros(activity.dim());
        Zip::from(out.rows_mut())
            .and(activity.rows())
            .par_for_each(|mut out_row, in_row| {
                for t in 0..in_row.len() {
                    let taps = kernel.len().min(t + 1);
                    out_row[t] = (0..taps).map(|k| kernel[k] * in_row[t - k]).sum();
                }
            });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_follows_gamma_densities() {
        let gk = GammaKernel::default();
        let kernel = gk.sample(100.0).unwrap();
        // unscaled value at t: t^(a-1) e^-t / (a-1)!
        let raw = |t: f64| {
            t.powi(5) * (-t).exp() / 120.0
                - gk.beta * t.powi(15) * (-t).exp() / 1_307_674_368_000.0
        };
        let max = raw(5.0);
        for i in [10, 50, 120, 250] {
            let t = i as f64 * 0.1;
            let expected = raw(t) / max * gk.scaling;
            assert!((kernel[i] - expected).abs() < 1e-9, "t = {t}");
        }
    }

    #[test]
    fn test_non_positive_shape_rejected() {
        let gk = GammaKernel {
            undershoot: 0.0,
            ..GammaKernel::default()
        };
        assert!(matches!(
            gk.sample(100.0),
            Err(HemodynamicError::InvalidParameter { name: "undershoot", .. })
        ));
    }

    #[test]
    fn test_kernel_peak_is_scaling() {
        let kernel = GammaKernel::default().sample(100.0).unwrap();
        assert_eq!(kernel.len(), 320);
        let max = kernel.fold(f64::NEG_INFINITY, |m, v| m.max(*v));
        assert!((max - 0.6).abs() < 1e-12);
        // shape 6 peaks at t = 5 s
        let argmax = kernel.iter().position(|v| *v == max).unwrap();
        assert_eq!(argmax, 50);
        assert_eq!(kernel[0], 0.0);
    }

    #[test]
    fn test_convolve_impulse_returns_kernel() {
        let gk = GammaKernel::default();
        let mut impulse = Array2::zeros((2, 400));
        impulse[[1, 0]] = 1.0;
        let out = gk.convolve(impulse.view(), 100.0).unwrap();
        let kernel = gk.sample(100.0).unwrap();
        assert!(out.row(0).iter().all(|v| *v == 0.0));
        for k in 0..kernel.len() {
            assert_eq!(out[[1, k]], kernel[k]);
        }
        assert!(out.row(1).iter().skip(kernel.len()).all(|v| *v == 0.0));
    }
}
