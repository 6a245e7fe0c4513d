// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Wilson–Cowan Network Model
//!
//! One excitatory (`E`) and one inhibitory (`I`) population per region,
//! coupled across regions through the excitatory populations with
//! conduction delays.
//!
//! ## Model Dynamics
//!
//! ```text
//! input_n = k_gl · Σ_l C[n,l] · E_l(t − d[n,l])
//!
//! τ_E dE/dt = −E + (1 − E)·S_E(c_ee·E − c_ie·I + input_n + E_ext) + ou_E
//! τ_I dI/dt = −I + (1 − I)·S_I(c_ei·E − c_ii·I + I_ext) + ou_I
//!
//! S_x(v) = 1 / (1 + exp(−a_x·(v − μ_x)))
//! d ou   = (μ_ou − ou)·dt/τ_ou + σ_ou·√dt·N(0, 1)
//! ```
//!
//! Euler–Maruyama at `dt_ms`; `E` and `I` are clamped to `[0, 1]` after each
//! step. Delays are `round(length / signal_v / dt)` fine steps.

use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use tmfc_sim_hemodynamics::{HemodynamicStage, Variability};
use tmfc_structures::{seeded_rng, standard_normal, CoarseSeries, CouplingMatrix, StructuresError};

use super::traits::{LocalCoupling, NeuralMassModel};
use crate::error::{ModelError, Result};

/// TR of the model's own BOLD output, ms
const BUILTIN_BOLD_TR_MS: f64 = 2000.0;
/// Upper bound of the uniform initial activity
const INIT_SPREAD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilsonCowanParameters {
    /// Integration step, ms
    pub dt_ms: f64,
    /// Global coupling strength
    pub k_gl: f64,
    /// Signal propagation speed, mm/ms (0 disables delays)
    pub signal_v: f64,
    pub tau_ou: f64,
    pub sigma_ou: f64,
    pub exc_ou_mean: f64,
    pub inh_ou_mean: f64,
    pub tau_exc: f64,
    pub tau_inh: f64,
    pub c_excexc: f64,
    pub c_excinh: f64,
    pub c_inhexc: f64,
    pub c_inhinh: f64,
    pub a_exc: f64,
    pub a_inh: f64,
    pub mu_exc: f64,
    pub mu_inh: f64,
    /// Background drive to the excitatory population
    pub exc_ext: f64,
    pub inh_ext: f64,
    pub seed: Option<u64>,
}

impl Default for WilsonCowanParameters {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            k_gl: 2.85,
            signal_v: 10.0,
            tau_ou: 5.0,
            sigma_ou: 5e-3,
            exc_ou_mean: 0.0,
            inh_ou_mean: 0.0,
            tau_exc: 2.5,
            tau_inh: 3.75,
            c_excexc: 16.0,
            c_excinh: 15.0,
            c_inhexc: 12.0,
            c_inhinh: 3.0,
            a_exc: 1.5,
            a_inh: 1.5,
            mu_exc: 3.0,
            mu_inh: 3.0,
            exc_ext: 0.75,
            inh_ext: 0.0,
            seed: None,
        }
    }
}

impl WilsonCowanParameters {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("dt", self.dt_ms),
            ("tau_ou", self.tau_ou),
            ("tau_exc", self.tau_exc),
            ("tau_inh", self.tau_inh),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidParameter {
                    name,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        let non_negative = [("signal_v", self.signal_v), ("sigma_ou", self.sigma_ou)];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::InvalidParameter {
                    name,
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }

    pub fn local_coupling(&self) -> LocalCoupling {
        LocalCoupling {
            c_excexc: self.c_excexc,
            c_excinh: self.c_excinh,
            c_inhexc: self.c_inhexc,
            c_inhinh: self.c_inhinh,
        }
    }
}

/// State carried from one run to the next.
#[derive(Debug, Clone)]
struct ContinuationState {
    /// Ring buffer of past excitatory activity, `regions × (max_delay + 1)`
    exc_history: Array2<f64>,
    /// Column of the current sample in `exc_history`
    head: usize,
    inh: Array1<f64>,
    exc_ou: Array1<f64>,
    inh_ou: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct WilsonCowanModel {
    params: WilsonCowanParameters,
    coupling: CouplingMatrix,
    /// Per-pair delay in fine steps
    delays: Array2<usize>,
    max_delay: usize,
    duration_ms: f64,
    rng: StdRng,
    state: Option<ContinuationState>,
    exc: Array2<f64>,
    inh: Array2<f64>,
    builtin_bold: Option<HemodynamicStage>,
    builtin_bold_started: bool,
}

fn sigmoid(a: f64, mu: f64, v: f64) -> f64 {
    1.0 / (1.0 + (-a * (v - mu)).exp())
}

impl WilsonCowanModel {
    /// `lengths` holds inter-regional fiber lengths in mm; `None` means no delays.
    pub fn new(
        params: WilsonCowanParameters,
        coupling: CouplingMatrix,
        lengths: Option<Array2<f64>>,
    ) -> Result<Self> {
        params.validate()?;
        let n = coupling.num_regions();

        let delays = match lengths {
            Some(lengths) => {
                if lengths.dim() != (n, n) {
                    return Err(ModelError::LengthShape {
                        expected: n,
                        rows: lengths.nrows(),
                        cols: lengths.ncols(),
                    });
                }
                if lengths.iter().any(|l| !(l.is_finite() && *l >= 0.0)) {
                    return Err(ModelError::InvalidParameter {
                        name: "lengths",
                        reason: "fiber lengths must be finite and non-negative".to_string(),
                    });
                }
                if params.signal_v > 0.0 {
                    lengths.mapv(|l| (l / params.signal_v / params.dt_ms).round() as usize)
                } else {
                    Array2::zeros((n, n))
                }
            }
            None => Array2::zeros((n, n)),
        };
        let max_delay = delays.iter().copied().max().unwrap_or(0);
        debug!(
            "[WC-MODEL] {} regions, dt {} ms, max delay {} steps",
            n, params.dt_ms, max_delay
        );

        Ok(Self {
            rng: seeded_rng(params.seed),
            params,
            coupling,
            delays,
            max_delay,
            duration_ms: 0.0,
            state: None,
            exc: Array2::zeros((n, 0)),
            inh: Array2::zeros((n, 0)),
            builtin_bold: None,
            builtin_bold_started: false,
        })
    }

    pub fn params(&self) -> &WilsonCowanParameters {
        &self.params
    }

    pub fn max_delay(&self) -> usize {
        self.max_delay
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    fn initial_state(&mut self) -> ContinuationState {
        let n = self.num_regions();
        let exc_init = Array1::from_shape_fn(n, |_| INIT_SPREAD * self.rng.gen::<f64>());
        let inh = Array1::from_shape_fn(n, |_| INIT_SPREAD * self.rng.gen::<f64>());
        let mut exc_history = Array2::zeros((n, self.max_delay + 1));
        for (mut row, e) in exc_history.rows_mut().into_iter().zip(exc_init.iter()) {
            row.fill(*e);
        }
        ContinuationState {
            exc_history,
            head: 0,
            inh,
            exc_ou: Array1::zeros(n),
            inh_ou: Array1::zeros(n),
        }
    }

    fn integrate(&mut self, state: &mut ContinuationState, steps: usize) -> (Array2<f64>, Array2<f64>) {
        let p = self.params;
        let n = self.coupling.num_regions();
        let ring = state.exc_history.ncols();
        let dt = p.dt_ms;
        let sqrt_dt = dt.sqrt();
        let weights = self.coupling.weights();

        let mut exc_out = Array2::zeros((n, steps));
        let mut inh_out = Array2::zeros((n, steps));
        let mut delayed_input = Array1::<f64>::zeros(n);

        for t in 0..steps {
            for i in 0..n {
                let mut acc = 0.0;
                for l in 0..n {
                    let col = (state.head + ring - self.delays[[i, l]]) % ring;
                    acc += weights[[i, l]] * state.exc_history[[l, col]];
                }
                delayed_input[i] = p.k_gl * acc;
            }

            let next = (state.head + 1) % ring;
            for i in 0..n {
                let e = state.exc_history[[i, state.head]];
                let inh = state.inh[i];

                let exc_rhs = (-e
                    + (1.0 - e)
                        * sigmoid(
                            p.a_exc,
                            p.mu_exc,
                            p.c_excexc * e - p.c_inhexc * inh + delayed_input[i] + p.exc_ext,
                        )
                    + state.exc_ou[i])
                    / p.tau_exc;
                let inh_rhs = (-inh
                    + (1.0 - inh)
                        * sigmoid(p.a_inh, p.mu_inh, p.c_excinh * e - p.c_inhinh * inh + p.inh_ext)
                    + state.inh_ou[i])
                    / p.tau_inh;

                let e_new = (e + dt * exc_rhs).clamp(0.0, 1.0);
                let i_new = (inh + dt * inh_rhs).clamp(0.0, 1.0);
                state.exc_history[[i, next]] = e_new;
                state.inh[i] = i_new;
                exc_out[[i, t]] = e_new;
                inh_out[[i, t]] = i_new;

                state.exc_ou[i] += (p.exc_ou_mean - state.exc_ou[i]) * dt / p.tau_ou
                    + p.sigma_ou * sqrt_dt * standard_normal(&mut self.rng);
                state.inh_ou[i] += (p.inh_ou_mean - state.inh_ou[i]) * dt / p.tau_ou
                    + p.sigma_ou * sqrt_dt * standard_normal(&mut self.rng);
            }
            state.head = next;
        }

        (exc_out, inh_out)
    }
}

impl NeuralMassModel for WilsonCowanModel {
    fn model_name(&self) -> &'static str {
        "Wilson-Cowan"
    }

    fn num_regions(&self) -> usize {
        self.coupling.num_regions()
    }

    fn dt_ms(&self) -> f64 {
        self.params.dt_ms
    }

    fn set_coupling_matrix(&mut self, coupling: CouplingMatrix) -> Result<()> {
        if coupling.num_regions() != self.num_regions() {
            return Err(StructuresError::RegionMismatch {
                expected: self.num_regions(),
                actual: coupling.num_regions(),
            }
            .into());
        }
        self.coupling = coupling;
        Ok(())
    }

    fn coupling_matrix(&self) -> &CouplingMatrix {
        &self.coupling
    }

    fn set_duration_ms(&mut self, duration_ms: f64) -> Result<()> {
        if !(duration_ms.is_finite() && duration_ms >= 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "duration",
                reason: format!("must be non-negative, got {duration_ms}"),
            });
        }
        self.duration_ms = duration_ms;
        Ok(())
    }

    fn run(&mut self, continue_run: bool) -> Result<()> {
        let steps = (self.duration_ms / self.params.dt_ms).round() as usize;
        let (mut state, fresh) = match self.state.take() {
            Some(state) if continue_run => (state, false),
            _ => (self.initial_state(), true),
        };
        trace!(
            "[WC-MODEL] integrating {} steps (continue: {})",
            steps,
            !fresh
        );

        let (exc, inh) = self.integrate(&mut state, steps);
        self.state = Some(state);
        self.exc = exc;
        self.inh = inh;

        if let Some(stage) = self.builtin_bold.as_mut() {
            let is_first = fresh || !self.builtin_bold_started;
            stage.process_chunk(self.exc.view(), is_first)?;
            self.builtin_bold_started = true;
        }
        Ok(())
    }

    fn excitatory(&self) -> ArrayView2<'_, f64> {
        self.exc.view()
    }

    fn inhibitory(&self) -> ArrayView2<'_, f64> {
        self.inh.view()
    }

    fn local_coupling(&self) -> LocalCoupling {
        self.params.local_coupling()
    }

    fn clear_outputs(&mut self) {
        let n = self.num_regions();
        self.exc = Array2::zeros((n, 0));
        self.inh = Array2::zeros((n, 0));
    }

    fn builtin_bold_enabled(&self) -> bool {
        self.builtin_bold.is_some()
    }

    fn set_builtin_bold(&mut self, enabled: bool) -> Result<()> {
        match (enabled, self.builtin_bold.is_some()) {
            (true, false) => {
                self.builtin_bold = Some(HemodynamicStage::new(
                    self.num_regions(),
                    self.params.dt_ms,
                    BUILTIN_BOLD_TR_MS,
                    None,
                    Variability::Fixed,
                )?);
                self.builtin_bold_started = false;
            }
            (false, true) => {
                self.builtin_bold = None;
                self.builtin_bold_started = false;
            }
            _ => {}
        }
        Ok(())
    }

    fn builtin_bold(&self) -> Option<&CoarseSeries> {
        self.builtin_bold.as_ref().map(|stage| stage.bold())
    }
}
