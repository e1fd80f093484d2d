//! Removal of fixed variables (`clo == cup`).

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::remove_fixed_col;
use crate::{E, I, PresolveStatus};

/// Undo record: the variable's value, its original cost, and the column that
/// was deleted from the matrix.
pub(crate) struct FixedVariable {
    pub col: I,
    pub value: E,
    pub cost: E,
    pub elements: Vec<(I, E)>,
}

/// Removes every variable whose bounds have closed to a point. Runs once
/// before the major-pass loop; other rules call
/// [`remove_fixed_col`] directly when they pin a variable themselves.
pub(crate) fn make_fixed(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    for j in 0..prob.ncols {
        if prob.col_prohibited[j] {
            continue;
        }
        let gap = prob.cup[j] - prob.clo[j];
        if gap > prob.ztolzb {
            continue;
        }
        if gap < -prob.feas_tol {
            prob.status = PresolveStatus::Infeasible;
            return;
        }
        prob.cup[j] = prob.clo[j];
        remove_fixed_col(prob, actions, j);
    }
}

impl Postsolve for FixedVariable {
    fn name(&self) -> &'static str {
        "fixed_variable"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let j = self.col;
        prob.sol[j] = self.value;
        prob.clo[j] = self.value;
        prob.cup[j] = self.value;
        prob.cost[j] = prob.maxmin * self.cost;
        prob.restore_column(j, &self.elements);
        for &(i, a) in &self.elements {
            prob.acts[i] += a * self.value;
        }
        prob.rcosts[j] = prob.reduced_cost_of(j);
        prob.set_col_status(j, Status::AtLower);
        prob.cdone[j] = true;
    }
}
