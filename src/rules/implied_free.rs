//! Implied-free substitution.
//!
//! If an equality row bounds a variable at least as tightly as its explicit
//! bounds do, the explicit bounds are redundant: the variable is free with
//! respect to that row and can be substituted out through it, removing both
//! the column and the row. `fill_level` caps the non-zeros a substitution may
//! create; level 0 disables substitution entirely, leaving only singleton
//! columns (which never create fill).

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::implied_col_bounds;
use crate::{E, I, ZTOLDP};

pub(crate) struct ImpliedFree {
    pub col: I,
    pub row: I,
    pub coef: E,
    pub rhs: E,
    pub lower: E,
    pub upper: E,
    pub cost: E,
    /// Row `row` as `(col, coef)`, including `col` itself.
    pub row_elements: Vec<(I, E)>,
    /// Column `col` as `(row, coef)`, including `row` itself.
    pub col_elements: Vec<(I, E)>,
    /// Every other row containing `col`, snapshotted before substitution.
    pub affected_rows: Vec<(I, Vec<(I, E)>)>,
}

pub(crate) fn implied_free(
    prob: &mut PresolveMatrix,
    actions: &mut Vec<PresolveAction>,
    fill_level: usize,
) {
    let cols: Vec<I> = prob.work.cols_to_do.clone();
    'cols: for j in cols {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.col_prohibited[j] || prob.integer[j] {
            continue;
        }
        let len = prob.col_len[j];
        if len == 0 || len > 3 {
            continue;
        }
        if len > 1 && fill_level == 0 {
            continue;
        }

        for (i, a) in prob.col_entries(j) {
            if prob.row_prohibited[i] || a.abs() <= ZTOLDP {
                continue;
            }
            if (prob.rup[i] - prob.rlo[i]).abs() > prob.ztolzb {
                continue;
            }
            let rhs = prob.rlo[i];

            let (ilo, iup) = implied_col_bounds(prob, i, j, a, rhs);
            if !(ilo >= prob.clo[j] - prob.feas_tol && iup <= prob.cup[j] + prob.feas_tol) {
                continue;
            }

            // fill created by substituting through row i
            if len > 1 {
                let mut created = 0usize;
                for (r, _) in prob.col_entries(j) {
                    if r == i {
                        continue;
                    }
                    for (k, _) in prob.row_entries(i) {
                        if k != j && prob.find_in_row(r, k).is_none() {
                            created += 1;
                        }
                    }
                }
                if created > fill_level {
                    continue;
                }
            }

            let row_elements = prob.row_entries(i);
            let col_elements = prob.col_entries(j);
            let affected_rows: Vec<(I, Vec<(I, E)>)> = col_elements
                .iter()
                .filter(|&&(r, _)| r != i)
                .map(|&(r, _)| (r, prob.row_entries(r)))
                .collect();

            // primal value before the row goes away
            let mut x = rhs;
            for &(k, aik) in &row_elements {
                if k != j {
                    x -= aik * prob.sol[k];
                }
            }
            x /= a;

            let cj = prob.cost[j];
            for &(k, aik) in &row_elements {
                if k != j {
                    prob.cost[k] -= cj * aik / a;
                    prob.mark_col_changed(k);
                }
            }
            prob.dobias += cj * rhs / a;
            prob.cost[j] = 0.0;

            for &(r, d) in &col_elements {
                if r == i {
                    continue;
                }
                prob.add_multiple_of_row(-d / a, i, r);
                if prob.find_in_row(r, j).is_some() {
                    prob.delete_element(r, j);
                }
                let shift = d * rhs / a;
                if !prob.is_neg_inf(prob.rlo[r]) {
                    prob.rlo[r] -= shift;
                }
                if !prob.is_pos_inf(prob.rup[r]) {
                    prob.rup[r] -= shift;
                }
                prob.acts[r] -= shift;
                prob.mark_row_changed(r);
            }

            actions.push(
                ImpliedFree {
                    col: j,
                    row: i,
                    coef: a,
                    rhs,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    cost: cj,
                    row_elements,
                    col_elements,
                    affected_rows,
                }
                .into(),
            );

            prob.sol[j] = x;
            prob.remove_row(i);
            prob.remove_col(j);
            continue 'cols;
        }
    }
}

impl Postsolve for ImpliedFree {
    fn name(&self) -> &'static str {
        "implied_free"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let (j, i, a) = (self.col, self.row, self.coef);

        // Undo the substitution in every other row j appeared in. Only
        // coefficients of row i's columns can have changed there.
        for (r, snapshot) in &self.affected_rows {
            for &(k, _) in &self.row_elements {
                if k == j {
                    continue;
                }
                let old = snapshot
                    .iter()
                    .find(|&&(c, _)| c == k)
                    .map(|&(_, v)| v);
                match old {
                    Some(v) => prob.set_or_add_element(k, *r, v),
                    None => {
                        if prob.has_element(k, *r) {
                            prob.remove_element(k, *r);
                        }
                    }
                }
            }
            let d = snapshot
                .iter()
                .find(|&&(c, _)| c == j)
                .map(|&(_, v)| v)
                .unwrap_or(0.0);
            prob.acts[*r] += d * self.rhs / a;
        }

        prob.restore_column(j, &self.col_elements);
        prob.clo[j] = self.lower;
        prob.cup[j] = self.upper;
        prob.cost[j] = prob.maxmin * self.cost;
        prob.rlo[i] = self.rhs;
        prob.rup[i] = self.rhs;

        let mut x = self.rhs;
        for &(k, aik) in &self.row_elements {
            if k != j {
                x -= aik * prob.sol[k];
            }
        }
        x /= a;
        prob.sol[j] = x;
        prob.acts[i] = self.rhs;

        // j turns basic for the restored row: dj = 0 pins the row dual. With
        // that dual, the other columns' reduced costs work out unchanged.
        let mut y = prob.cost[j];
        for &(r, arj) in &self.col_elements {
            if r != i {
                y -= prob.rowduals[r] * arj;
            }
        }
        y /= a;
        prob.rowduals[i] = y;
        prob.rcosts[j] = 0.0;

        prob.set_col_status(j, Status::Basic);
        prob.set_row_status(i, Status::AtLower);
        prob.cdone[j] = true;
        prob.rdone[i] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::presolve_matrix;
    use crate::PresolveStatus;

    #[test]
    fn singleton_implied_free_column_removes_row_and_column() {
        // x1 = 2 with 0 <= x1 <= 5: the row implies [2, 2], tighter than
        // the explicit bounds, so both go away.
        let mut prob = presolve_matrix(
            &[&[1.0]],
            &[(2.0, 2.0)],
            &[(0.0, 5.0)],
            &[1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        implied_free(&mut prob, &mut actions, 0);
        prob.assert_consistent();

        assert_eq!(actions.len(), 1);
        assert_eq!(prob.col_len[0], 0);
        assert_eq!(prob.row_len[0], 0);
        assert_eq!(prob.sol[0], 2.0);
        assert_eq!(prob.dobias, 2.0);
    }

    #[test]
    fn bounded_column_is_not_implied_free() {
        // x0 + x1 = 4 with x0 in [0, 1], x1 in [0, 3]: the row implies
        // x0 in [1, 4] and x1 in [3, 4], both looser than (or crossing) the
        // explicit bounds on one side, so no substitution happens.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0]],
            &[(4.0, 4.0)],
            &[(0.0, 1.0), (0.0, 3.0)],
            &[1.0, 0.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        implied_free(&mut prob, &mut actions, 2);
        assert!(actions.is_empty());
    }

    #[test]
    fn substitution_respects_fill_level() {
        // x0 appears in an equality and two other disjoint rows; pushing the
        // equality through would create fill in both. fill_level 0 blocks it.
        let mut prob = presolve_matrix(
            &[
                &[1.0, 1.0, 0.0, 0.0],
                &[1.0, 0.0, 1.0, 0.0],
                &[1.0, 0.0, 0.0, 1.0],
            ],
            &[(3.0, 3.0), (0.0, 8.0), (0.0, 9.0)],
            &[(-1e30, 1e30), (0.0, 2.0), (0.0, 8.0), (0.0, 9.0)],
            &[1.0, 0.0, 0.0, 0.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        implied_free(&mut prob, &mut actions, 0);
        assert!(actions.is_empty());

        implied_free(&mut prob, &mut actions, 2);
        prob.assert_consistent();
        assert_eq!(actions.len(), 1);
        assert_eq!(prob.col_len[0], 0);
        assert_eq!(prob.row_len[0], 0);
        // x1's coefficient was pushed into rows 1 and 2
        assert_eq!(prob.coeff(1, 1), -1.0);
        assert_eq!(prob.coeff(2, 1), -1.0);
        assert_eq!(prob.rup[1], 5.0);
        assert_eq!(prob.rup[2], 6.0);
    }
}
