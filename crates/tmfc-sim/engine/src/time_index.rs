// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Label → interval lists recorded over a run.
//!
//! The label set is closed: `Rest` plus every task label of the schedule,
//! each starting with an empty list. Interval bounds are kept in seconds at
//! millisecond resolution.

use ahash::AHashMap;

use crate::error::DesignError;
use crate::schedule::REST_LABEL;

fn round_ms(t_s: f64) -> f64 {
    (t_s * 1000.0).round() / 1000.0
}

/// Condition of a time point: which block and which occurrence of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition<'a> {
    pub label: &'a str,
    /// Zero-based occurrence of `label`
    pub trial: usize,
    /// Seconds since the start of that occurrence
    pub elapsed_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndexMap {
    labels: Vec<String>,
    slots: AHashMap<String, usize>,
    intervals: Vec<Vec<[f64; 2]>>,
}

impl TimeIndexMap {
    /// Map over `Rest` and the given task labels, all empty.
    pub fn new<S: AsRef<str>>(task_labels: impl IntoIterator<Item = S>) -> Self {
        let mut map = Self {
            labels: Vec::new(),
            slots: AHashMap::new(),
            intervals: Vec::new(),
        };
        map.insert_label(REST_LABEL);
        for label in task_labels {
            map.insert_label(label.as_ref());
        }
        map
    }

    fn insert_label(&mut self, label: &str) {
        if self.slots.contains_key(label) {
            return;
        }
        self.slots.insert(label.to_string(), self.labels.len());
        self.labels.push(label.to_string());
        self.intervals.push(Vec::new());
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn record(&mut self, label: &str, start_s: f64, end_s: f64) -> Result<(), DesignError> {
        let slot = *self
            .slots
            .get(label)
            .ok_or_else(|| DesignError::UnknownLabel(label.to_string()))?;
        self.intervals[slot].push([round_ms(start_s), round_ms(end_s)]);
        Ok(())
    }

    pub fn intervals(&self, label: &str) -> Option<&[[f64; 2]]> {
        self.slots.get(label).map(|slot| self.intervals[*slot].as_slice())
    }

    /// `(label, intervals)` in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[[f64; 2]])> {
        self.labels
            .iter()
            .zip(self.intervals.iter())
            .map(|(label, list)| (label.as_str(), list.as_slice()))
    }

    /// Condition at `t_s`, using half-open `[start, end)` intervals.
    ///
    /// Task intervals take precedence over rest.
    pub fn condition_at(&self, t_s: f64) -> Option<Condition<'_>> {
        let lookup = |slot: usize| {
            self.intervals[slot]
                .iter()
                .enumerate()
                .find(|(_, [start, end])| t_s >= *start && t_s < *end)
                .map(|(trial, [start, _])| Condition {
                    label: self.labels[slot].as_str(),
                    trial,
                    elapsed_s: t_s - start,
                })
        };
        // slot 0 is Rest
        (1..self.labels.len()).find_map(&lookup).or_else(|| lookup(0))
    }

    /// Conditions for a series of time stamps in seconds.
    pub fn annotate(&self, times_s: &[f64]) -> Vec<Option<Condition<'_>>> {
        times_s.iter().map(|t| self.condition_at(*t)).collect()
    }
}
