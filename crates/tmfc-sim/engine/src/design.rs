// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Experiment design: task onsets, labels, durations and coupling matrices.

use std::collections::BTreeMap;
use std::sync::Arc;

use tmfc_structures::CouplingMatrix;

use crate::error::DesignError;
use crate::schedule::REST_LABEL;

pub const DEFAULT_TASK_DURATION_S: f64 = 3.0;
pub const DEFAULT_FIRST_REST_S: f64 = 6.0;
pub const DEFAULT_LAST_REST_S: f64 = 8.0;

/// Task durations in seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum Durations {
    /// Same duration for every task
    Uniform(f64),
    /// One duration per onset
    PerTask(Vec<f64>),
}

impl Durations {
    /// Expanded per-task list for `count` tasks.
    pub fn resolve(&self, count: usize) -> Vec<f64> {
        match self {
            Durations::Uniform(d) => vec![*d; count],
            Durations::PerTask(list) => list.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesignSpec {
    /// Onset of every task, seconds, strictly increasing
    pub onsets: Vec<f64>,
    /// Task label per onset
    pub labels: Vec<String>,
    pub durations: Durations,
    pub rest_matrix: Arc<CouplingMatrix>,
    pub task_matrices: BTreeMap<String, Arc<CouplingMatrix>>,
    /// Rest padding before the first task, seconds
    pub first_rest_s: f64,
    /// Rest padding after the last task, seconds
    pub last_rest_s: f64,
    /// Whether the leading rest block starts `first_rest_s` before zero
    pub rest_before: bool,
}

impl DesignSpec {
    /// One task per matrix, labels in sorted order, onsets at 0, 1, 2, ... s.
    pub fn new(
        rest_matrix: CouplingMatrix,
        task_matrices: impl IntoIterator<Item = (String, CouplingMatrix)>,
    ) -> Self {
        let task_matrices: BTreeMap<String, Arc<CouplingMatrix>> = task_matrices
            .into_iter()
            .map(|(label, m)| (label, Arc::new(m)))
            .collect();
        let labels: Vec<String> = task_matrices.keys().cloned().collect();
        let onsets = (0..labels.len()).map(|i| i as f64).collect();
        Self {
            onsets,
            labels,
            durations: Durations::Uniform(DEFAULT_TASK_DURATION_S),
            rest_matrix: Arc::new(rest_matrix),
            task_matrices,
            first_rest_s: DEFAULT_FIRST_REST_S,
            last_rest_s: DEFAULT_LAST_REST_S,
            rest_before: true,
        }
    }

    pub fn with_onsets(mut self, onsets: Vec<f64>) -> Self {
        self.onsets = onsets;
        self
    }

    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_durations(mut self, durations: Durations) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_padding(mut self, first_rest_s: f64, last_rest_s: f64) -> Self {
        self.first_rest_s = first_rest_s;
        self.last_rest_s = last_rest_s;
        self
    }

    pub fn with_rest_before(mut self, rest_before: bool) -> Self {
        self.rest_before = rest_before;
        self
    }

    pub fn num_regions(&self) -> usize {
        self.rest_matrix.num_regions()
    }

    pub fn task_durations(&self) -> Vec<f64> {
        self.durations.resolve(self.onsets.len())
    }

    /// Distinct task labels in order of first appearance.
    pub fn task_labels(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for label in &self.labels {
            if !seen.contains(label) {
                seen.push(label.clone());
            }
        }
        seen
    }

    pub fn validate(&self) -> Result<(), DesignError> {
        if self.onsets.is_empty() {
            return Err(DesignError::Empty);
        }
        let durations = self.task_durations();
        if self.onsets.len() != self.labels.len() || self.onsets.len() != durations.len() {
            return Err(DesignError::LengthMismatch {
                onsets: self.onsets.len(),
                labels: self.labels.len(),
                durations: durations.len(),
            });
        }

        for label in &self.labels {
            if label == REST_LABEL {
                return Err(DesignError::ReservedLabel(label.clone()));
            }
            if !self.task_matrices.contains_key(label) {
                return Err(DesignError::UnknownLabel(label.clone()));
            }
        }

        let expected = self.num_regions();
        for (label, matrix) in &self.task_matrices {
            if matrix.num_regions() != expected {
                return Err(DesignError::RegionMismatch {
                    label: label.clone(),
                    expected,
                    actual: matrix.num_regions(),
                });
            }
        }

        for (index, pair) in self.onsets.windows(2).enumerate() {
            if !(pair[1] > pair[0]) {
                return Err(DesignError::NonIncreasingOnsets {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        if let Some(bad) = self.onsets.iter().find(|o| !o.is_finite()) {
            return Err(DesignError::InvalidDuration {
                name: "onset".to_string(),
                value: *bad,
            });
        }

        let padding = [("first_rest", self.first_rest_s), ("last_rest", self.last_rest_s)];
        for (name, value) in padding {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DesignError::InvalidDuration {
                    name: name.to_string(),
                    value,
                });
            }
        }
        for (i, d) in durations.iter().enumerate() {
            if !(d.is_finite() && *d >= 0.0) {
                return Err(DesignError::InvalidDuration {
                    name: format!("duration[{i}]"),
                    value: *d,
                });
            }
        }
        Ok(())
    }
}
