//! Final cleanup: drop explicitly stored near-zero coefficients.
//!
//! Postsolve reinserts them as exact zeros so the arena ends up with the
//! original element count.

use crate::actions::{Postsolve, PresolveAction};
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::I;

pub(crate) struct ZeroCoefficients {
    pub entries: Vec<(I, I)>,
}

pub(crate) fn drop_zero_coefficients(
    prob: &mut PresolveMatrix,
    actions: &mut Vec<PresolveAction>,
) {
    let mut entries = Vec::new();
    for j in 0..prob.ncols {
        for (i, v) in prob.col_entries(j) {
            if v.abs() <= prob.ztolzb {
                prob.delete_element(i, j);
                entries.push((i, j));
            }
        }
    }
    if !entries.is_empty() {
        actions.push(ZeroCoefficients { entries }.into());
    }
}

impl Postsolve for ZeroCoefficients {
    fn name(&self) -> &'static str {
        "zero_coefficients"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        for &(i, j) in &self.entries {
            prob.add_element(j, i, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::presolve_matrix;
    use crate::PresolveStatus;

    #[test]
    fn tiny_coefficients_are_dropped() {
        let mut prob = presolve_matrix(
            &[&[1.0, 1e-12], &[0.0, 2.0]],
            &[(0.0, 1.0), (0.0, 1.0)],
            &[(0.0, 1.0), (0.0, 1.0)],
            &[1.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        let mut actions = Vec::new();
        drop_zero_coefficients(&mut prob, &mut actions);
        prob.assert_consistent();

        assert_eq!(actions.len(), 1);
        assert_eq!(prob.element_count(), 2);
        assert_eq!(prob.coeff(0, 1), 0.0);
    }
}
