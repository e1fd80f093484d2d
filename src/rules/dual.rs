//! Dual sign analysis ("dual stuff").
//!
//! Row duals are boxed using the row sides (a row that cannot bind above has
//! a non-negative dual, and vice versa) and refined through singleton
//! columns: a free singleton pins its row's dual exactly, a half-bounded
//! singleton caps it on one side. Columns whose reduced-cost interval then
//! excludes zero must sit at a bound in every optimum; with no finite bound
//! there the problem is unbounded. A row whose dual interval excludes zero
//! must bind, which turns it into an equality on the binding side.
//!
//! All of this reasoning is dual, hence unsound under integrality; the
//! driver never calls it when any column is integer.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::remove_fixed_col;
use crate::{E, I, PresolveStatus, ZTOLDP};

pub(crate) struct DualFix {
    pub col: I,
    pub lower: E,
    pub upper: E,
    pub at_lower: bool,
}

pub(crate) fn remove_dual(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let nrows = prob.nrows;
    let ncols = prob.ncols;

    let mut ymin = vec![-prob.inf; nrows];
    let mut ymax = vec![prob.inf; nrows];
    for i in 0..nrows {
        if prob.row_len[i] == 0 {
            ymin[i] = 0.0;
            ymax[i] = 0.0;
            continue;
        }
        if prob.is_pos_inf(prob.rup[i]) {
            ymin[i] = ymin[i].max(0.0);
        }
        if prob.is_neg_inf(prob.rlo[i]) {
            ymax[i] = ymax[i].min(0.0);
        }
    }

    // refine through singleton columns
    for _ in 0..3 {
        let mut changed = false;
        for j in 0..ncols {
            if prob.col_len[j] != 1 || prob.col_prohibited[j] {
                continue;
            }
            let k = prob.col_start[j];
            let i = prob.col_rows[k];
            let a = prob.col_vals[k];
            if a.abs() <= ZTOLDP || prob.row_prohibited[i] {
                continue;
            }
            let cj = prob.maxmin * prob.cost[j];
            let v = cj / a;
            let lower_bounded = !prob.is_neg_inf(prob.clo[j]);
            let upper_bounded = !prob.is_pos_inf(prob.cup[j]);
            match (lower_bounded, upper_bounded) {
                // free column: dj must vanish, pinning the dual
                (false, false) => {
                    if ymin[i] < v {
                        ymin[i] = v;
                        changed = true;
                    }
                    if ymax[i] > v {
                        ymax[i] = v;
                        changed = true;
                    }
                }
                // no upper bound: dj <= 0 impossible to exploit upward, so
                // dj >= 0 is required, i.e. a y <= cj
                (true, false) => {
                    if a > 0.0 {
                        if ymax[i] > v {
                            ymax[i] = v;
                            changed = true;
                        }
                    } else if ymin[i] < v {
                        ymin[i] = v;
                        changed = true;
                    }
                }
                // no lower bound: dj <= 0 required, i.e. a y >= cj
                (false, true) => {
                    if a > 0.0 {
                        if ymin[i] < v {
                            ymin[i] = v;
                            changed = true;
                        }
                    } else if ymax[i] > v {
                        ymax[i] = v;
                        changed = true;
                    }
                }
                (true, true) => {}
            }
        }
        if !changed {
            break;
        }
    }

    for i in 0..nrows {
        if prob.row_len[i] > 0 && ymin[i] > ymax[i] + prob.ztoldj {
            prob.status = PresolveStatus::InfeasibleOrUnbounded;
            return;
        }
    }

    // columns whose reduced-cost sign is forced
    for j in 0..ncols {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.col_len[j] == 0 || prob.col_prohibited[j] {
            continue;
        }
        if prob.clo[j] == prob.cup[j] {
            continue;
        }
        let cj = prob.maxmin * prob.cost[j];
        let mut djmin = cj;
        let mut djmax = cj;
        let mut min_inf = false;
        let mut max_inf = false;
        for k in prob.col_range(j) {
            let i = prob.col_rows[k];
            let a = prob.col_vals[k];
            // djmax subtracts min(a y), djmin subtracts max(a y)
            let (y_for_max, y_for_min) = if a > 0.0 {
                (ymin[i], ymax[i])
            } else {
                (ymax[i], ymin[i])
            };
            if y_for_max <= -prob.inf || y_for_max >= prob.inf {
                max_inf = true;
            } else {
                djmax -= a * y_for_max;
            }
            if y_for_min <= -prob.inf || y_for_min >= prob.inf {
                min_inf = true;
            } else {
                djmin -= a * y_for_min;
            }
        }

        if !min_inf && djmin > prob.ztoldj {
            // dj > 0 in every optimum: x_j sits at its lower bound
            if prob.is_neg_inf(prob.clo[j]) {
                prob.status = PresolveStatus::Unbounded;
                return;
            }
            actions.push(
                DualFix {
                    col: j,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    at_lower: true,
                }
                .into(),
            );
            prob.cup[j] = prob.clo[j];
            remove_fixed_col(prob, actions, j);
        } else if !max_inf && djmax < -prob.ztoldj {
            if prob.is_pos_inf(prob.cup[j]) {
                prob.status = PresolveStatus::Unbounded;
                return;
            }
            actions.push(
                DualFix {
                    col: j,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    at_lower: false,
                }
                .into(),
            );
            prob.clo[j] = prob.cup[j];
            remove_fixed_col(prob, actions, j);
        }
    }

    // rows whose dual sign is forced must bind on that side
    for i in 0..nrows {
        if prob.row_len[i] == 0 || prob.row_prohibited[i] {
            continue;
        }
        if ymin[i] > prob.ztoldj
            && !prob.is_neg_inf(prob.rlo[i])
            && prob.rup[i] > prob.rlo[i]
        {
            prob.rup[i] = prob.rlo[i];
            prob.mark_row_changed(i);
        } else if ymax[i] < -prob.ztoldj
            && !prob.is_pos_inf(prob.rup[i])
            && prob.rlo[i] < prob.rup[i]
        {
            prob.rlo[i] = prob.rup[i];
            prob.mark_row_changed(i);
        }
    }
}

impl Postsolve for DualFix {
    fn name(&self) -> &'static str {
        "dual_fix"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        prob.clo[self.col] = self.lower;
        prob.cup[self.col] = self.upper;
        prob.set_col_status(
            self.col,
            if self.at_lower {
                Status::AtLower
            } else {
                Status::AtUpper
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::presolve_matrix;

    #[test]
    fn forced_reduced_cost_fixes_column() {
        // min x0 + x2 + 5 x1  s.t.  x0 + x1 + x2 >= 1,
        // x2 in [0, inf) singleton caps the row dual at 1, so
        // dj(x1) = 5 - y >= 4 > 0 in every optimum: x1 fixes at 0.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0, 1.0]],
            &[(1.0, 1e30)],
            &[(0.0, 10.0), (0.0, 10.0), (0.0, 1e30)],
            &[1.0, 5.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        remove_dual(&mut prob, &mut actions);
        prob.assert_consistent();

        assert!(prob.status.is_feasible());
        assert_eq!(prob.col_len[1], 0);
        assert_eq!(prob.clo[1], 0.0);
        // DualFix + FixedVariable for x1; x0's dj interval [0, 1] straddles 0
        assert_eq!(actions.len(), 2);
        assert_eq!(prob.col_len[0], 1);
    }

    #[test]
    fn forced_negative_cost_without_upper_bound_is_unbounded() {
        // min -x0 + 2 x1 + 3 x2  s.t.  x0 + x1 >= 1,  x0 + x2 >= 0.
        // The singletons cap the row duals at 2 and 3, and neither can go
        // below 0, so dj(x0) <= -1 everywhere; x0 has no upper bound.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0, 0.0], &[1.0, 0.0, 1.0]],
            &[(1.0, 1e30), (0.0, 1e30)],
            &[(0.0, 1e30), (0.0, 1e30), (0.0, 1e30)],
            &[-1.0, 2.0, 3.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        remove_dual(&mut prob, &mut actions);
        assert_eq!(prob.status, PresolveStatus::Unbounded);
    }

    #[test]
    fn contradictory_dual_requirements_are_ambiguous() {
        // min -x0  s.t.  x0 - x1 <= 0, both unbounded above: x0 needs
        // y <= -1 while x1 needs y >= 0. Dual infeasible, so the problem is
        // infeasible or unbounded (here: unbounded), and we cannot tell.
        let mut prob = presolve_matrix(
            &[&[1.0, -1.0]],
            &[(-1e30, 0.0)],
            &[(0.0, 1e30), (0.0, 1e30)],
            &[-1.0, 0.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        remove_dual(&mut prob, &mut actions);
        assert_eq!(prob.status, PresolveStatus::InfeasibleOrUnbounded);
    }

    #[test]
    fn forced_row_dual_turns_row_into_equality() {
        // min -x0 + x1  s.t.  x0 - x1 <= 0 with x0 free above via... use a
        // free singleton to pin the dual strictly negative:
        // column x2 free, cost 1, coefficient -1 in the row => y = -1.
        let mut prob = presolve_matrix(
            &[&[1.0, -1.0, -1.0]],
            &[(-1e30, 0.0)],
            &[(0.0, 10.0), (0.0, 10.0), (-1e30, 1e30)],
            &[-1.0, 1.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        remove_dual(&mut prob, &mut actions);

        assert!(prob.status.is_feasible());
        assert_eq!(prob.rlo[0], 0.0);
        assert_eq!(prob.rup[0], 0.0);
    }
}
