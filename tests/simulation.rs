// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end runs through the configuration bridge with the Wilson-Cowan
//! model on a coarse fine step.

use std::fs;

use tmfc::config::{load_config, BoldMode, DurationsConfig, KernelKind, TmfcConfig};
use tmfc::simulation::{run_from_config, SimulationError};

/// Two regions, one 2 s task at 2 s, 2 s of rest on either side.
/// 8 s at dt 0.5 ms = 16 000 fine steps.
fn small_config() -> TmfcConfig {
    let mut config = TmfcConfig::default();
    config.model.dt_ms = 0.5;
    config.model.seed = Some(11);
    config.activity.sampling_ms = 5.0;
    config.bold.repetition_time_s = 1.0;
    config.design.onsets = Some(vec![2.0]);
    config.design.labels = Some(vec!["A".to_string()]);
    config.design.durations = DurationsConfig::Uniform(2.0);
    config.design.first_rest_s = 2.0;
    config.design.last_rest_s = 2.0;
    config.design.rest_matrix = vec![vec![0.0, 0.1], vec![0.1, 0.0]];
    config
        .design
        .task_matrices
        .insert("A".to_string(), vec![vec![0.0, 0.6], vec![0.6, 0.0]]);
    config
}

#[test]
fn test_chunkwise_run() {
    let report = run_from_config(&small_config()).unwrap();

    assert_eq!(report.num_regions, 2);
    assert_eq!(report.fine_steps, 16_000);
    let labels: Vec<_> = report.blocks.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["Rest", "A", "Rest"]);
    assert_eq!(report.blocks[0].start_s, -2.0);

    let exc = report.excitatory.as_ref().unwrap();
    assert_eq!(exc.time_ms.len(), 1600);
    assert_eq!(exc.data.len(), 2);
    assert!(exc.data.iter().flatten().all(|v| (0.0..=1.0).contains(v)));

    // syn_act input implies a synaptic series even though it was not requested
    assert_eq!(report.synaptic.as_ref().unwrap().time_ms.len(), 1600);

    let bold = report.bold.as_ref().unwrap();
    assert_eq!(bold.time_ms.len(), 8);
    for pair in bold.time_ms.windows(2) {
        assert!((pair[1] - pair[0] - 1000.0).abs() < 1e-6);
    }
    assert!(bold.data.iter().flatten().all(|v| v.is_finite()));
    assert!(report.conflicts.is_empty());
}

#[test]
fn test_time_index_and_bold_conditions() {
    let report = run_from_config(&small_config()).unwrap();

    let rest = report.time_index.iter().find(|c| c.label == "Rest").unwrap();
    assert_eq!(rest.intervals, vec![[-2.0, 2.0], [4.0, 6.0]]);
    let task = report.time_index.iter().find(|c| c.label == "A").unwrap();
    assert_eq!(task.intervals, vec![[2.0, 4.0]]);

    let conditions: Vec<_> = report
        .bold_conditions
        .iter()
        .map(|c| c.as_ref().map(|c| (c.label.as_str(), c.trial)))
        .collect();
    assert_eq!(
        conditions,
        vec![
            Some(("Rest", 0)),
            Some(("Rest", 0)),
            Some(("Rest", 0)),
            Some(("Rest", 0)),
            Some(("A", 0)),
            Some(("A", 0)),
            Some(("Rest", 1)),
            Some(("Rest", 1)),
        ]
    );
}

#[test]
fn test_same_seed_same_report() {
    let a = run_from_config(&small_config()).unwrap();
    let b = run_from_config(&small_config()).unwrap();
    assert_eq!(a.bold, b.bold);
    assert_eq!(a.excitatory, b.excitatory);
}

#[test]
fn test_builtin_bold_conflict_reported() {
    let mut config = small_config();
    config.model.builtin_bold = true;
    let report = run_from_config(&config).unwrap();

    assert_eq!(report.conflicts.len(), 1);
    assert!(report.builtin_bold.is_none());
    assert_eq!(report.bold.as_ref().unwrap().time_ms.len(), 8);
}

#[test]
fn test_builtin_bold_without_chunkwise() {
    let mut config = small_config();
    config.model.builtin_bold = true;
    config.bold.mode = BoldMode::Disabled;
    let report = run_from_config(&config).unwrap();

    assert!(report.conflicts.is_empty());
    assert!(report.bold.is_none());
    assert!(report.synaptic.is_none());
    // built-in generation runs at a 2 s TR
    assert_eq!(report.builtin_bold.as_ref().unwrap().time_ms.len(), 4);
}

#[test]
fn test_batch_gamma_run() {
    let mut config = small_config();
    config.bold.mode = BoldMode::Batch;
    config.bold.kernel = KernelKind::Gamma;
    config.bold.input = tmfc::config::BoldInputKind::Exc;
    config.bold.drop_first_s = 2.0;
    let report = run_from_config(&config).unwrap();

    // 1600 activity samples, one BOLD sample per 200, first two dropped
    let bold = report.bold.as_ref().unwrap();
    assert_eq!(bold.time_ms.len(), 6);
    assert!(report.synaptic.is_none());
}

#[test]
fn test_store_off_omits_activity() {
    let mut config = small_config();
    config.activity.store = false;
    let report = run_from_config(&config).unwrap();
    assert!(report.excitatory.is_none());
    assert!(report.inhibitory.is_none());
    assert!(report.bold.is_some());
}

#[test]
fn test_invalid_config_rejected_before_running() {
    let mut config = small_config();
    config.design.labels = Some(vec!["B".to_string()]);
    match run_from_config(&config) {
        Err(SimulationError::Config(e)) => assert!(e.to_string().contains("'B'")),
        other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_short_first_block_rejected() {
    let mut config = small_config();
    config.design.first_rest_s = 0.0;
    config.design.onsets = Some(vec![0.5]);
    // leading rest of 0.5 s cannot fill a 1 s window
    assert!(matches!(
        run_from_config(&config),
        Err(SimulationError::Engine(_))
    ));
}

#[test]
fn test_report_serializes() {
    let report = run_from_config(&small_config()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["num_regions"], 2);
    assert_eq!(json["blocks"][1]["label"], "A");
    assert!(json["bold"]["time_ms"].is_array());
    assert!(json["builtin_bold"].is_null());
}

#[test]
fn test_load_and_run_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tmfc_configuration.toml");
    fs::write(
        &path,
        r#"
[model]
dt_ms = 0.5
seed = 5

[design]
onsets = [2.0]
durations = 1.0
first_rest_s = 2.0
last_rest_s = 1.0
rest_matrix = [[0.0, 0.2], [0.2, 0.0]]

[design.task_matrices]
Go = [[0.0, 0.5], [0.5, 0.0]]

[activity]
sampling_ms = 10.0

[bold]
mode = "chunkwise"
input = "sum"
repetition_time_s = 1.0
"#,
    )
    .unwrap();

    let config = load_config(Some(&path), None).unwrap();
    let report = run_from_config(&config).unwrap();
    // 6 s at 0.5 ms
    assert_eq!(report.fine_steps, 12_000);
    assert_eq!(report.bold.unwrap().time_ms.len(), 6);
    assert_eq!(report.excitatory.unwrap().time_ms.len(), 600);
}
