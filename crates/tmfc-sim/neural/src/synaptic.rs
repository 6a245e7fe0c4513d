// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synaptic activity derived from population output.
//!
//! ```text
//! SA = (c_ee + c_ei)·E + (c_ie + c_ii)·I + C·E
//! ```
//!
//! `C` is whatever coupling matrix is active for the block, so the result
//! has to be recomputed for every block.

use ndarray::{Array2, ArrayView2};

use tmfc_structures::{CouplingMatrix, StructuresError};

use crate::error::{ModelError, Result};
use crate::models::{LocalCoupling, NeuralMassModel};

/// Synaptic activity for `exc`/`inh` (regions × steps).
pub fn synaptic_activity(
    exc: ArrayView2<'_, f64>,
    inh: ArrayView2<'_, f64>,
    coupling: &CouplingMatrix,
    local: &LocalCoupling,
) -> Result<Array2<f64>> {
    if exc.dim() != inh.dim() {
        return Err(ModelError::ActivityShape {
            exc: exc.dim(),
            inh: inh.dim(),
        });
    }
    if exc.nrows() != coupling.num_regions() {
        return Err(StructuresError::RegionMismatch {
            expected: coupling.num_regions(),
            actual: exc.nrows(),
        }
        .into());
    }

    let exc_gain = local.c_excexc + local.c_excinh;
    let inh_gain = local.c_inhexc + local.c_inhinh;
    let mut out = coupling.weights().dot(&exc);
    out.scaled_add(exc_gain, &exc);
    out.scaled_add(inh_gain, &inh);
    Ok(out)
}

/// Synaptic activity of the model's latest run, under its installed coupling.
pub fn model_synaptic_activity<M: NeuralMassModel + ?Sized>(model: &M) -> Result<Array2<f64>> {
    synaptic_activity(
        model.excitatory(),
        model.inhibitory(),
        model.coupling_matrix(),
        &model.local_coupling(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn local() -> LocalCoupling {
        LocalCoupling {
            c_excexc: 16.0,
            c_excinh: 15.0,
            c_inhexc: 12.0,
            c_inhinh: 3.0,
        }
    }

    #[test]
    fn test_synaptic_activity_formula() {
        let exc = array![[0.1, 0.2], [0.3, 0.4]];
        let inh = array![[0.5, 0.0], [0.25, 1.0]];
        let coupling = CouplingMatrix::from_rows(&[vec![0.0, 2.0], vec![1.0, 0.0]]).unwrap();
        let sa = synaptic_activity(exc.view(), inh.view(), &coupling, &local()).unwrap();

        for r in 0..2 {
            for t in 0..2 {
                let other = 1 - r;
                let expected = 31.0 * exc[[r, t]]
                    + 15.0 * inh[[r, t]]
                    + coupling.weights()[[r, other]] * exc[[other, t]];
                assert!((sa[[r, t]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_repeated_derivation_bit_identical() {
        let exc = Array2::from_shape_fn((4, 64), |(r, t)| ((r * 31 + t * 17) % 97) as f64 / 97.0);
        let inh = exc.mapv(|v| 1.0 - v);
        let coupling = CouplingMatrix::new(Array2::from_shape_fn((4, 4), |(i, j)| {
            if i == j {
                0.0
            } else {
                (i + 2 * j) as f64 * 0.05
            }
        }))
        .unwrap();
        let a = synaptic_activity(exc.view(), inh.view(), &coupling, &local()).unwrap();
        let b = synaptic_activity(exc.view(), inh.view(), &coupling, &local()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_errors() {
        let coupling = CouplingMatrix::zeros(2);
        let exc = Array2::zeros((2, 3));
        let inh = Array2::zeros((2, 4));
        assert!(matches!(
            synaptic_activity(exc.view(), inh.view(), &coupling, &local()),
            Err(ModelError::ActivityShape { .. })
        ));
        let wide = Array2::zeros((3, 4));
        assert!(matches!(
            synaptic_activity(wide.view(), wide.view(), &coupling, &local()),
            Err(ModelError::Structures(StructuresError::RegionMismatch { .. }))
        ));
    }
}
