// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Streaming driver against a deterministic model.

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use tmfc_sim_engine::{
    build_schedule, BoldInput, ConfigConflict, DesignError, DesignSpec, DriverOptions, Durations,
    EngineError, HemodynamicMode, SimulationDriver,
};
use tmfc_sim_hemodynamics::{BoldOptions, HemodynamicStage, Variability};
use tmfc_sim_neural::{LocalCoupling, NeuralMassModel, Result as ModelResult};
use tmfc_structures::{resample, CouplingMatrix};

const DT_MS: f64 = 1.0;

/// Smooth deterministic activity that depends on the installed coupling and
/// on a global step counter, so continuation errors show up as jumps.
struct WaveModel {
    coupling: CouplingMatrix,
    duration_ms: f64,
    t: u64,
    exc: Array2<f64>,
    inh: Array2<f64>,
    builtin: bool,
    raw_exc: Vec<Array2<f64>>,
    raw_inh: Vec<Array2<f64>>,
    installed: Vec<CouplingMatrix>,
    continue_flags: Vec<bool>,
    /// From this run on, emit one region too many
    extra_row_from_run: Option<usize>,
}

impl WaveModel {
    fn new(n: usize) -> Self {
        Self {
            coupling: CouplingMatrix::zeros(n),
            duration_ms: 0.0,
            t: 0,
            exc: Array2::zeros((n, 0)),
            inh: Array2::zeros((n, 0)),
            builtin: false,
            raw_exc: Vec::new(),
            raw_inh: Vec::new(),
            installed: Vec::new(),
            continue_flags: Vec::new(),
            extra_row_from_run: None,
        }
    }

    fn all_raw_exc(&self) -> Array2<f64> {
        let views: Vec<ArrayView2<f64>> = self.raw_exc.iter().map(|a| a.view()).collect();
        concatenate(Axis(1), &views).unwrap()
    }

    fn all_raw_inh(&self) -> Array2<f64> {
        let views: Vec<ArrayView2<f64>> = self.raw_inh.iter().map(|a| a.view()).collect();
        concatenate(Axis(1), &views).unwrap()
    }
}

impl NeuralMassModel for WaveModel {
    fn model_name(&self) -> &'static str {
        "wave"
    }

    fn num_regions(&self) -> usize {
        self.coupling.num_regions()
    }

    fn dt_ms(&self) -> f64 {
        DT_MS
    }

    fn set_coupling_matrix(&mut self, coupling: CouplingMatrix) -> ModelResult<()> {
        self.installed.push(coupling.clone());
        self.coupling = coupling;
        Ok(())
    }

    fn coupling_matrix(&self) -> &CouplingMatrix {
        &self.coupling
    }

    fn set_duration_ms(&mut self, duration_ms: f64) -> ModelResult<()> {
        self.duration_ms = duration_ms;
        Ok(())
    }

    fn run(&mut self, continue_run: bool) -> ModelResult<()> {
        if !continue_run {
            self.t = 0;
        }
        let run_index = self.continue_flags.len();
        self.continue_flags.push(continue_run);
        let steps = (self.duration_ms / DT_MS).round() as usize;
        let n = self.num_regions()
            + usize::from(self.extra_row_from_run.map_or(false, |k| run_index >= k));
        let drive: Vec<f64> = (0..n)
            .map(|r| self.coupling.weights().row(r.min(self.num_regions() - 1)).sum())
            .collect();
        let t0 = self.t;
        self.exc = Array2::from_shape_fn((n, steps), |(r, k)| {
            let t = (t0 + k as u64) as f64;
            0.4 + 0.3 * (0.004 * t + r as f64).sin() + 0.1 * drive[r]
        });
        self.inh = Array2::from_shape_fn((n, steps), |(r, k)| {
            let t = (t0 + k as u64) as f64;
            0.3 + 0.2 * (0.002 * t - r as f64).cos()
        });
        self.t += steps as u64;
        self.raw_exc.push(self.exc.clone());
        self.raw_inh.push(self.inh.clone());
        Ok(())
    }

    fn excitatory(&self) -> ArrayView2<'_, f64> {
        self.exc.view()
    }

    fn inhibitory(&self) -> ArrayView2<'_, f64> {
        self.inh.view()
    }

    fn local_coupling(&self) -> LocalCoupling {
        LocalCoupling {
            c_excexc: 1.0,
            c_excinh: 0.5,
            c_inhexc: 0.25,
            c_inhinh: 0.125,
        }
    }

    fn clear_outputs(&mut self) {
        let n = self.num_regions();
        self.exc = Array2::zeros((n, 0));
        self.inh = Array2::zeros((n, 0));
    }

    fn builtin_bold_enabled(&self) -> bool {
        self.builtin
    }

    fn set_builtin_bold(&mut self, enabled: bool) -> ModelResult<()> {
        self.builtin = enabled;
        Ok(())
    }
}

fn matrix(v: f64) -> CouplingMatrix {
    CouplingMatrix::new(Array2::from_elem((2, 2), v)).unwrap()
}

fn design() -> DesignSpec {
    DesignSpec::new(
        matrix(0.1),
        [("A".to_string(), matrix(0.7)), ("B".to_string(), matrix(0.3))],
    )
}

fn chunkwise(tr_s: f64, input: BoldInput) -> DriverOptions {
    DriverOptions {
        activity_sampling_ms: 20.0,
        bold_input: input,
        hemodynamics: HemodynamicMode::Chunkwise {
            repetition_time_s: tr_s,
            normalize_max: Some(2.0),
            variability: Variability::Fixed,
        },
        ..DriverOptions::default()
    }
}

#[test]
fn test_single_task_scenario_time_index() {
    let d = design()
        .with_labels(["A"])
        .with_onsets(vec![2.0])
        .with_durations(Durations::Uniform(3.0))
        .with_padding(6.0, 8.0);
    let schedule = build_schedule(&d).unwrap();
    assert_eq!(schedule.len(), 3);

    let mut driver =
        SimulationDriver::new(WaveModel::new(2), chunkwise(2.0, BoldInput::Excitatory)).unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();

    assert_eq!(
        out.time_index.intervals("Rest").unwrap(),
        &[[-6.0, 2.0], [5.0, 13.0]]
    );
    assert_eq!(out.time_index.intervals("A").unwrap(), &[[2.0, 5.0]]);
    assert_eq!(out.fine_steps, 19_000);
    assert_eq!(out.excitatory.len(), 950);
    // 19 s at TR 2 s
    assert_eq!(out.bold.as_ref().map(|b| b.len()), Some(9));
    assert!(out.conflicts.is_empty());
}

#[test]
fn test_back_to_back_tasks_no_interstitial_rest() {
    let d = design()
        .with_labels(["A", "B"])
        .with_onsets(vec![1.0, 4.0])
        .with_durations(Durations::Uniform(3.0))
        .with_padding(2.0, 2.0);
    let schedule = build_schedule(&d).unwrap();
    let labels: Vec<&str> = schedule.iter().map(|b| b.label()).collect();
    assert_eq!(labels, vec!["Rest", "A", "B", "Rest"]);

    let mut driver = SimulationDriver::new(
        WaveModel::new(2),
        DriverOptions {
            hemodynamics: HemodynamicMode::Disabled,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();
    assert_eq!(out.time_index.intervals("Rest").unwrap().len(), 2);
    assert_eq!(out.time_index.intervals("B").unwrap(), &[[4.0, 7.0]]);
}

#[test]
fn test_chunkwise_bold_matches_batch_over_raw_series() {
    let d = design()
        .with_labels(["A", "B"])
        .with_onsets(vec![1.0, 2.37])
        .with_durations(Durations::PerTask(vec![0.55, 0.8]))
        .with_padding(1.234, 0.777);
    let schedule = build_schedule(&d).unwrap();

    let mut driver =
        SimulationDriver::new(WaveModel::new(2), chunkwise(0.1, BoldInput::Sum)).unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();
    let model = driver.into_model();

    let raw = &model.all_raw_exc() + &model.all_raw_inh();
    let mut batch = HemodynamicStage::new(2, DT_MS, 100.0, Some(2.0), Variability::Fixed).unwrap();
    batch.run_batch(raw.view()).unwrap();

    let chunked = out.bold.unwrap();
    assert_eq!(chunked.len(), batch.bold().len());
    assert_eq!(chunked.time_ms(), batch.bold().time_ms());
    for (a, b) in chunked.data().iter().zip(batch.bold().data().iter()) {
        assert!((a - b).abs() <= 1e-6 * b.abs().max(1e-12), "{a} vs {b}");
    }
}

#[test]
fn test_activity_resampling_continuous_across_blocks() {
    let d = design()
        .with_labels(["A", "B", "A"])
        .with_onsets(vec![0.5, 1.713, 2.9])
        .with_durations(Durations::PerTask(vec![0.333, 0.5, 0.111]))
        .with_padding(0.25, 0.4);
    let schedule = build_schedule(&d).unwrap();

    let mut options = chunkwise(0.05, BoldInput::SynapticActivity);
    options.activity_sampling_ms = 7.0;
    options.synaptic_activity = true;
    let mut driver = SimulationDriver::new(WaveModel::new(2), options).unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();
    let model = driver.into_model();

    let whole = resample(model.all_raw_exc().view(), 7, 0, DT_MS).unwrap();
    assert_eq!(out.excitatory.data(), whole.signal);
    assert_eq!(out.excitatory.time_ms(), whole.time_ms.as_slice());
    let synaptic = out.synaptic.unwrap();
    assert_eq!(synaptic.len(), out.excitatory.len());

    // every run after the first continues
    assert!(!model.continue_flags[0]);
    assert!(model.continue_flags[1..].iter().all(|c| *c));
    // self-coupling removed on install
    assert!(model
        .installed
        .iter()
        .all(|m| m.weights().diag().iter().all(|d| *d == 0.0)));
}

#[test]
fn test_short_first_block_rejected_for_chunkwise() {
    let d = design()
        .with_labels(["A"])
        .with_onsets(vec![0.0])
        .with_rest_before(false);
    let schedule = build_schedule(&d).unwrap();

    let mut driver =
        SimulationDriver::new(WaveModel::new(2), chunkwise(2.0, BoldInput::Excitatory)).unwrap();
    let err = driver.generate_full_series(&schedule).unwrap_err();
    assert_eq!(
        err,
        EngineError::Design(DesignError::InsufficientFirstBlock {
            steps: 0,
            required: 2000
        })
    );
}

#[test]
fn test_zero_length_block_is_noop_without_hemodynamics() {
    let d = design()
        .with_labels(["A"])
        .with_onsets(vec![0.0])
        .with_rest_before(false);
    let schedule = build_schedule(&d).unwrap();

    let mut driver = SimulationDriver::new(
        WaveModel::new(2),
        DriverOptions {
            hemodynamics: HemodynamicMode::Disabled,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();
    // the empty leading rest is still recorded
    assert_eq!(
        out.time_index.intervals("Rest").unwrap(),
        &[[0.0, 0.0], [3.0, 11.0]]
    );
    assert_eq!(out.fine_steps, 11_000);
    assert!(out.bold.is_none());
    assert_eq!(driver.model().continue_flags, vec![false, true]);
}

#[test]
fn test_builtin_bold_conflict_downgraded() {
    let mut options = chunkwise(2.0, BoldInput::Excitatory);
    options.builtin_bold = true;
    let driver = SimulationDriver::new(WaveModel::new(2), options).unwrap();
    assert_eq!(
        driver.conflicts(),
        &[ConfigConflict::BuiltinBoldWithChunkwise]
    );
    assert!(!driver.options().builtin_bold);
    assert!(!driver.model().builtin);

    let options = DriverOptions {
        hemodynamics: HemodynamicMode::Disabled,
        builtin_bold: true,
        ..DriverOptions::default()
    };
    let driver = SimulationDriver::new(WaveModel::new(2), options).unwrap();
    assert!(driver.conflicts().is_empty());
    assert!(driver.model().builtin);
}

#[test]
fn test_raw_buffers_cleared_after_each_block() {
    let d = design().with_labels(["A"]).with_onsets(vec![1.0]);
    let schedule = build_schedule(&d).unwrap();
    let mut driver =
        SimulationDriver::new(WaveModel::new(2), chunkwise(2.0, BoldInput::Excitatory)).unwrap();
    driver.generate_full_series(&schedule).unwrap();
    assert_eq!(driver.model().excitatory().ncols(), 0);
}

#[test]
fn test_batch_mode_over_coarse_activity() {
    let d = design()
        .with_labels(["A"])
        .with_onsets(vec![4.0])
        .with_padding(4.0, 12.0);
    let schedule = build_schedule(&d).unwrap();
    let options = DriverOptions {
        activity_sampling_ms: 5.0,
        bold_input: BoldInput::Excitatory,
        hemodynamics: HemodynamicMode::Batch(BoldOptions {
            drop_first_s: 4.0,
            ..BoldOptions::default()
        }),
        ..DriverOptions::default()
    };
    let mut driver = SimulationDriver::new(WaveModel::new(2), options).unwrap();
    let out = driver.generate_full_series(&schedule).unwrap();
    // 23 s -> 4600 coarse samples -> 11 TR windows, 2 dropped
    assert_eq!(out.excitatory.len(), 4600);
    assert_eq!(out.bold.map(|b| b.len()), Some(9));
    assert!(out.synaptic.is_none());
}

#[test]
fn test_region_count_mismatch_rejected_before_integration() {
    let d = design().with_labels(["A"]).with_onsets(vec![1.0]);
    let schedule = build_schedule(&d).unwrap();
    // three regions in the model, two in the design
    let mut driver =
        SimulationDriver::new(WaveModel::new(3), chunkwise(2.0, BoldInput::Excitatory)).unwrap();
    let err = driver.generate_full_series(&schedule).unwrap_err();
    assert_eq!(
        err,
        EngineError::ShapeMismatch {
            expected: 3,
            actual: 2
        }
    );
    assert!(driver.model().continue_flags.is_empty());
    assert_eq!(driver.state().idx_last_t(), 0);
}

#[test]
fn test_failed_run_keeps_partial_state() {
    let d = design().with_labels(["A"]).with_onsets(vec![1.0]);
    let schedule = build_schedule(&d).unwrap();
    let mut model = WaveModel::new(2);
    // leading rest runs cleanly, the task block comes back malformed
    model.extra_row_from_run = Some(1);
    let mut driver = SimulationDriver::new(
        model,
        DriverOptions {
            hemodynamics: HemodynamicMode::Disabled,
            ..DriverOptions::default()
        },
    )
    .unwrap();

    let err = driver.generate_full_series(&schedule).unwrap_err();
    assert_eq!(
        err,
        EngineError::ShapeMismatch {
            expected: 2,
            actual: 3
        }
    );

    // leading rest [-6, 1] s at 1 ms, sampled every 20 ms
    let state = driver.state();
    assert_eq!(state.idx_last_t(), 7_000);
    assert_eq!(state.excitatory().len(), 350);
    assert_eq!(state.inhibitory().len(), 350);
    assert_eq!(
        state.time_index().intervals("Rest").unwrap(),
        &[[-6.0, 1.0]]
    );
    assert!(state.time_index().intervals("A").unwrap().is_empty());
}
