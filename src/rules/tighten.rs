//! Zero-cost bound tightening ("zerocost").
//!
//! A continuous variable with zero objective whose movement in one direction
//! can never violate a row (every row it touches is unbounded on the side
//! that direction pushes toward) can simply be parked at the bound in that
//! direction. Feasibility of the other variables is unaffected and the
//! objective does not change.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::remove_fixed_col;
use crate::{E, I};

pub(crate) struct TightenBounds {
    pub col: I,
    pub lower: E,
    pub upper: E,
    pub at_upper: bool,
}

pub(crate) fn tighten(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let cols: Vec<I> = prob.work.cols_to_do.clone();
    for j in cols {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.col_len[j] == 0 || prob.col_prohibited[j] || prob.integer[j] {
            continue;
        }
        if prob.cost[j] != 0.0 {
            continue;
        }
        if prob.clo[j] == prob.cup[j] {
            continue;
        }

        let mut can_up = true;
        let mut can_down = true;
        for k in prob.col_range(j) {
            let i = prob.col_rows[k];
            if prob.row_prohibited[i] {
                can_up = false;
                can_down = false;
                break;
            }
            let a = prob.col_vals[k];
            if a > 0.0 {
                if !prob.is_pos_inf(prob.rup[i]) {
                    can_up = false;
                }
                if !prob.is_neg_inf(prob.rlo[i]) {
                    can_down = false;
                }
            } else {
                if !prob.is_neg_inf(prob.rlo[i]) {
                    can_up = false;
                }
                if !prob.is_pos_inf(prob.rup[i]) {
                    can_down = false;
                }
            }
            if !can_up && !can_down {
                break;
            }
        }

        if can_up && !prob.is_pos_inf(prob.cup[j]) {
            actions.push(
                TightenBounds {
                    col: j,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    at_upper: true,
                }
                .into(),
            );
            prob.clo[j] = prob.cup[j];
            remove_fixed_col(prob, actions, j);
        } else if can_down && !prob.is_neg_inf(prob.clo[j]) {
            actions.push(
                TightenBounds {
                    col: j,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    at_upper: false,
                }
                .into(),
            );
            prob.cup[j] = prob.clo[j];
            remove_fixed_col(prob, actions, j);
        }
    }
}

impl Postsolve for TightenBounds {
    fn name(&self) -> &'static str {
        "tighten_bounds"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        prob.clo[self.col] = self.lower;
        prob.cup[self.col] = self.upper;
        // the fixed-variable undo parked the value at the chosen bound
        prob.set_col_status(
            self.col,
            if self.at_upper {
                Status::AtUpper
            } else {
                Status::AtLower
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::presolve_matrix;
    use crate::PresolveStatus;

    #[test]
    fn upward_safe_zero_cost_column_parks_at_upper() {
        // x1 has zero cost, appears only in  x0 + x1 >= 1  (a > 0, rup inf):
        // pushing it up is always safe, so it fixes at its upper bound 2.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0]],
            &[(1.0, 1e30)],
            &[(0.0, 5.0), (0.0, 2.0)],
            &[1.0, 0.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        tighten(&mut prob, &mut actions);
        prob.assert_consistent();

        assert_eq!(actions.len(), 2); // tighten + fixed
        assert_eq!(prob.col_len[1], 0);
        // the row side absorbed x1 = 2
        assert_eq!(prob.rlo[0], -1.0);
    }

    #[test]
    fn nonzero_cost_is_left_alone() {
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0]],
            &[(1.0, 1e30)],
            &[(0.0, 5.0), (0.0, 2.0)],
            &[1.0, 0.5],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        tighten(&mut prob, &mut actions);
        assert!(actions.is_empty());
    }
}
