// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Block scheduler.

Turns a design into an ordered, gap-free sequence of blocks, each holding one
coupling matrix fixed:

```text
 Rest (leading) | A | Rest | B | C | Rest (trailing)
                          ^ gap > 0       ^ back-to-back: no rest block
```

The leading rest spans `[-first_rest, onset[0]]` when `rest_before` is set and
`[0, onset[0]]` otherwise. Interstitial rest is emitted only for a strictly
positive gap. The trailing rest follows the last task.
*/

use std::sync::Arc;

use tracing::debug;

use tmfc_structures::CouplingMatrix;

use crate::design::DesignSpec;
use crate::error::DesignError;

/// Label of every rest block
pub const REST_LABEL: &str = "Rest";

/// A time interval with a fixed coupling matrix. Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    label: String,
    coupling: Arc<CouplingMatrix>,
    start_s: f64,
    end_s: f64,
}

impl Block {
    fn new(label: &str, coupling: &Arc<CouplingMatrix>, start_s: f64, end_s: f64) -> Self {
        Self {
            label: label.to_string(),
            coupling: Arc::clone(coupling),
            start_s,
            end_s,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn coupling(&self) -> &CouplingMatrix {
        &self.coupling
    }

    pub fn start_s(&self) -> f64 {
        self.start_s
    }

    pub fn end_s(&self) -> f64 {
        self.end_s
    }

    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    pub fn is_rest(&self) -> bool {
        self.label == REST_LABEL
    }
}

/// Ordered blocks plus the closed label set they draw from.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    blocks: Vec<Block>,
    /// `Rest` followed by task labels in order of first appearance
    labels: Vec<String>,
}

impl Schedule {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `(start of first block, end of last block)`
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.blocks.first()?.start_s, self.blocks.last()?.end_s))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Validate `design` and lay out its blocks.
pub fn build_schedule(design: &DesignSpec) -> Result<Schedule, DesignError> {
    design.validate()?;

    let onsets = &design.onsets;
    let durations = design.task_durations();
    let rest = &design.rest_matrix;
    let mut blocks = Vec::with_capacity(2 * onsets.len() + 1);

    let lead_start = if design.rest_before {
        -design.first_rest_s
    } else {
        0.0
    };
    blocks.push(Block::new(REST_LABEL, rest, lead_start, onsets[0]));

    for (i, (label, onset)) in design.labels.iter().zip(onsets.iter()).enumerate() {
        // validate() guarantees every label resolves
        let matrix = design
            .task_matrices
            .get(label)
            .ok_or_else(|| DesignError::UnknownLabel(label.clone()))?;
        let end = onset + durations[i];
        blocks.push(Block::new(label, matrix, *onset, end));

        match onsets.get(i + 1) {
            Some(next) if *next - end > 0.0 => {
                blocks.push(Block::new(REST_LABEL, rest, end, *next));
            }
            Some(_) => {}
            None => {
                blocks.push(Block::new(REST_LABEL, rest, end, end + design.last_rest_s));
            }
        }
    }

    let mut labels = vec![REST_LABEL.to_string()];
    labels.extend(design.task_labels());

    let schedule = Schedule { blocks, labels };
    if let Some((start, end)) = schedule.span() {
        debug!(
            "[SCHEDULER] {} blocks covering [{}, {}] s",
            schedule.len(),
            start,
            end
        );
    }
    Ok(schedule)
}
