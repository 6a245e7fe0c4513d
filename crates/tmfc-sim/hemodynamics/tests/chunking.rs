// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chunked BOLD generation against batch generation.

use ndarray::{s, Array2};
use tmfc_sim_hemodynamics::{HemodynamicStage, Variability};

const DT_MS: f64 = 1.0;
const TR_MS: f64 = 50.0;

fn activity(regions: usize, len: usize) -> Array2<f64> {
    Array2::from_shape_fn((regions, len), |(r, t)| {
        let phase = (t as f64 * 0.01 + r as f64).sin();
        0.2 + 0.15 * phase + if (t / 700) % 2 == 0 { 0.3 } else { 0.0 }
    })
}

fn stage(regions: usize) -> HemodynamicStage {
    HemodynamicStage::new(regions, DT_MS, TR_MS, Some(2.0), Variability::Fixed).unwrap()
}

#[test]
fn test_leftover_invariant_over_irregular_chunks() {
    let lengths = [3usize, 49, 50, 51, 120, 7, 0, 333, 1, 99];
    let mut stage = stage(2);
    let mut total = 0usize;
    for (i, len) in lengths.iter().enumerate() {
        stage
            .process_chunk(activity(2, *len).view(), i == 0)
            .unwrap();
        total += len;
        assert!(stage.leftover_len() < stage.chunksize());
        assert_eq!(stage.bold().len(), total / stage.chunksize());
        assert_eq!(stage.idx_last_t() as usize + stage.leftover_len(), total);
    }
}

#[test]
fn test_chunkwise_equals_batch() {
    let signal = activity(3, 5_317);
    let mut batch = stage(3);
    batch.run_batch(signal.view()).unwrap();

    let cuts = [0usize, 611, 700, 1_999, 2_000, 3_456, 5_317];
    let mut chunked = stage(3);
    for (i, w) in cuts.windows(2).enumerate() {
        chunked
            .process_chunk(signal.slice(s![.., w[0]..w[1]]), i == 0)
            .unwrap();
    }

    let a = batch.bold();
    let b = chunked.bold();
    assert_eq!(a.len(), b.len());
    assert_eq!(a.time_ms(), b.time_ms());
    for (x, y) in a.data().iter().zip(b.data().iter()) {
        assert!((x - y).abs() <= 1e-6 * x.abs().max(1e-12), "{x} vs {y}");
    }
}

#[test]
fn test_time_stamps_on_tr_grid() {
    let mut stage = stage(1);
    stage.process_chunk(activity(1, 260).view(), true).unwrap();
    stage.process_chunk(activity(1, 90).view(), false).unwrap();
    let expected: Vec<f64> = (0..7).map(|i| (1 + 50 * i) as f64 * DT_MS).collect();
    assert_eq!(stage.bold().time_ms(), expected.as_slice());
}
