// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Balloon–Windkessel Hemodynamic Model
//!
//! Converts neural activity `z` into a BOLD signal through four physiological
//! state variables per region:
//!
//! ```text
//! X  vasodilatory signal    dX/dt = z − κ·X − γ·(F − 1)
//! F  blood inflow           dF/dt = X
//! Q  deoxyhemoglobin        dQ/dt = (F/ρ·(1 − (1 − ρ)^(1/F)) − Q·V^(1/α − 1)) / τ
//! V  blood volume           dV/dt = (F − V^(1/α)) / τ
//!
//! BOLD = V0·(k1·(1 − Q) + k2·(1 − Q/V) + k3·(1 − V))
//! ```
//!
//! Integrated with forward Euler at the neural model's fine step, so the
//! state can be carried from one chunk to the next without any loss.

use ndarray::{Array1, Array2, ArrayView2};
use tmfc_structures::{seeded_rng, standard_normal};

use crate::error::{HemodynamicError, Result};

/// Resting-state oxygen extraction fraction
const RHO: f64 = 0.34;
/// Grubb's vessel stiffness exponent
const ALPHA: f64 = 0.32;
/// Resting blood volume fraction
const V0: f64 = 0.02;
const K1: f64 = 7.0 * RHO;
const K2: f64 = 2.0;
const K3: f64 = 2.0 * RHO - 0.2;
/// Lower bound on inflow, keeps `1/F` finite
const MIN_FLOW: f64 = 1e-8;

const GAMMA_MEAN: f64 = 0.41;
const GAMMA_VAR: f64 = 0.002;
const KAPPA_MEAN: f64 = 0.65;
const KAPPA_VAR: f64 = 0.015;
const TAU_MEAN: f64 = 0.98;
const TAU_VAR: f64 = 0.0568;

/// Physiological state of every region, carried between chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct HemodynamicState {
    pub x: Array1<f64>,
    pub f: Array1<f64>,
    pub q: Array1<f64>,
    pub v: Array1<f64>,
}

impl HemodynamicState {
    /// Resting state: `X = 0`, `F = Q = V = 1`.
    pub fn resting(num_regions: usize) -> Self {
        Self {
            x: Array1::zeros(num_regions),
            f: Array1::ones(num_regions),
            q: Array1::ones(num_regions),
            v: Array1::ones(num_regions),
        }
    }

    pub fn num_regions(&self) -> usize {
        self.x.len()
    }
}

/// Advances hemodynamic state over a chunk of neural activity.
///
/// Implementations must accept chunks of any length and be callable
/// repeatedly with the state returned by the previous call.
pub trait HemodynamicIntegrator {
    fn num_regions(&self) -> usize;

    /// Integrate `activity` (regions × steps) at step `dt_s` seconds, starting
    /// from `state`. Returns the per-step BOLD signal and the advanced state.
    fn advance(
        &self,
        activity: ArrayView2<'_, f64>,
        dt_s: f64,
        state: &HemodynamicState,
    ) -> Result<(Array2<f64>, HemodynamicState)>;
}

/// How the per-region hemodynamic constants are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Variability {
    /// Every region uses the population means
    #[default]
    Fixed,
    /// Constants drawn once per region around the population means
    Variable { seed: Option<u64> },
}

/// Balloon–Windkessel integrator with per-region constants.
#[derive(Debug, Clone)]
pub struct BalloonWindkessel {
    /// Rate constant of autoregulatory feedback by blood flow (γ)
    gamma: Array1<f64>,
    /// Vasodilatory signal decay (κ)
    kappa: Array1<f64>,
    /// Transit time (τ)
    tau: Array1<f64>,
}

impl BalloonWindkessel {
    pub fn new(num_regions: usize, variability: Variability) -> Self {
        match variability {
            Variability::Fixed => Self {
                gamma: Array1::from_elem(num_regions, GAMMA_MEAN),
                kappa: Array1::from_elem(num_regions, KAPPA_MEAN),
                tau: Array1::from_elem(num_regions, TAU_MEAN),
            },
            Variability::Variable { seed } => {
                let mut rng = seeded_rng(seed);
                let mut draw = |mean: f64, var: f64| {
                    Array1::from_shape_fn(num_regions, |_| loop {
                        // truncated at zero: negative rates/transit times are unphysical
                        let value = mean + var.sqrt() * standard_normal(&mut rng);
                        if value > 0.0 {
                            break value;
                        }
                    })
                };
                let gamma = draw(GAMMA_MEAN, GAMMA_VAR);
                let kappa = draw(KAPPA_MEAN, KAPPA_VAR);
                let tau = draw(TAU_MEAN, TAU_VAR);
                Self { gamma, kappa, tau }
            }
        }
    }

    pub fn gamma(&self) -> &Array1<f64> {
        &self.gamma
    }

    pub fn kappa(&self) -> &Array1<f64> {
        &self.kappa
    }

    pub fn tau(&self) -> &Array1<f64> {
        &self.tau
    }
}

impl HemodynamicIntegrator for BalloonWindkessel {
    fn num_regions(&self) -> usize {
        self.gamma.len()
    }

    fn advance(
        &self,
        activity: ArrayView2<'_, f64>,
        dt_s: f64,
        state: &HemodynamicState,
    ) -> Result<(Array2<f64>, HemodynamicState)> {
        let n = self.num_regions();
        if activity.nrows() != n {
            return Err(HemodynamicError::ShapeMismatch {
                expected: n,
                actual: activity.nrows(),
            });
        }
        if state.num_regions() != n {
            return Err(HemodynamicError::StateMismatch {
                expected: n,
                actual: state.num_regions(),
            });
        }
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(HemodynamicError::InvalidParameter {
                name: "dt",
                reason: format!("must be positive, got {dt_s}"),
            });
        }

        let mut next = state.clone();
        let mut bold = Array2::zeros(activity.dim());
        let inv_alpha = 1.0 / ALPHA;

        for (t, z_t) in activity.columns().into_iter().enumerate() {
            for j in 0..n {
                let (x, f, q, v) = (next.x[j], next.f[j], next.q[j], next.v[j]);
                let tau = self.tau[j];

                let x_new = x + dt_s * (z_t[j] - self.kappa[j] * x - self.gamma[j] * (f - 1.0));
                let q_new = q
                    + dt_s / tau
                        * (f / RHO * (1.0 - (1.0 - RHO).powf(1.0 / f))
                            - q * v.powf(inv_alpha - 1.0));
                let v_new = v + dt_s / tau * (f - v.powf(inv_alpha));
                let f_new = (f + dt_s * x_new).max(MIN_FLOW);

                next.x[j] = x_new;
                next.q[j] = q_new;
                next.v[j] = v_new;
                next.f[j] = f_new;
                bold[[j, t]] =
                    V0 * (K1 * (1.0 - q_new) + K2 * (1.0 - q_new / v_new) + K3 * (1.0 - v_new));
            }
        }

        Ok((bold, next))
    }
}
