//! Doubleton equality rows: `a x + b y = rhs` lets one variable be expressed
//! through the other, folding its cost, bounds and matrix column away.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::{divide_interval, is_near_int};
use crate::{E, I, PresolveStatus, ZTOLDP};

pub(crate) struct Doubleton {
    pub row: I,
    pub keep_col: I,
    pub elim_col: I,
    pub coef_keep: E,
    pub coef_elim: E,
    pub rhs: E,
    pub keep_lower: E,
    pub keep_upper: E,
    pub keep_cost: E,
    pub elim_lower: E,
    pub elim_upper: E,
    pub elim_cost: E,
    /// Both columns exactly as they were before the substitution.
    pub keep_elements: Vec<(I, E)>,
    pub elim_elements: Vec<(I, E)>,
}

pub(crate) fn doubleton(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let rows: Vec<I> = prob.work.rows_to_do.clone();
    for i in rows {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.row_len[i] != 2 {
            continue;
        }
        if (prob.rup[i] - prob.rlo[i]).abs() > prob.ztolzb {
            continue;
        }
        let rhs = prob.rlo[i];
        let entries = prob.row_entries(i);
        let (j1, a1) = entries[0];
        let (j2, a2) = entries[1];
        if prob.col_prohibited[j1] || prob.col_prohibited[j2] {
            continue;
        }

        // Eliminating an integer variable is only safe when the back-map
        // keeps it integral for integral values of the survivor.
        let elim_ok = |jel: I, ael: E, jke: I, ake: E| {
            if ael.abs() <= ZTOLDP {
                false
            } else if prob.integer[jel] {
                prob.integer[jke] && is_near_int(ake / ael) && is_near_int(rhs / ael)
            } else {
                true
            }
        };
        let e1 = elim_ok(j1, a1, j2, a2);
        let e2 = elim_ok(j2, a2, j1, a1);
        let elim_first = match (e1, e2) {
            (false, false) => continue,
            (true, false) => true,
            (false, true) => false,
            // prefer dropping a continuous variable, then the larger pivot
            (true, true) => match (prob.integer[j1], prob.integer[j2]) {
                (false, true) => true,
                (true, false) => false,
                _ => a1.abs() >= a2.abs(),
            },
        };
        let (y, b, x, a) = if elim_first {
            (j1, a1, j2, a2)
        } else {
            (j2, a2, j1, a1)
        };

        // bounds on x via a x = rhs - b y
        let (ylo, yup) = (prob.clo[y], prob.cup[y]);
        let (by_lo, by_hi) = if b > 0.0 {
            (
                if prob.is_neg_inf(ylo) { -prob.inf } else { b * ylo },
                if prob.is_pos_inf(yup) { prob.inf } else { b * yup },
            )
        } else {
            (
                if prob.is_pos_inf(yup) { -prob.inf } else { b * yup },
                if prob.is_neg_inf(ylo) { prob.inf } else { b * ylo },
            )
        };
        let term_lo = if prob.is_pos_inf(by_hi) { -prob.inf } else { rhs - by_hi };
        let term_hi = if prob.is_neg_inf(by_lo) { prob.inf } else { rhs - by_lo };
        let (ilo, iup) = divide_interval(prob, term_lo, term_hi, a);

        let mut lo = prob.clo[x].max(ilo);
        let mut up = prob.cup[x].min(iup);
        if lo > up + prob.feas_tol {
            prob.status = PresolveStatus::Infeasible;
            return;
        }
        if lo > up {
            let mid = 0.5 * (lo + up);
            lo = mid;
            up = mid;
        }

        actions.push(
            Doubleton {
                row: i,
                keep_col: x,
                elim_col: y,
                coef_keep: a,
                coef_elim: b,
                rhs,
                keep_lower: prob.clo[x],
                keep_upper: prob.cup[x],
                keep_cost: prob.cost[x],
                elim_lower: ylo,
                elim_upper: yup,
                elim_cost: prob.cost[y],
                keep_elements: prob.col_entries(x),
                elim_elements: prob.col_entries(y),
            }
            .into(),
        );

        let cy = prob.cost[y];
        prob.cost[x] -= cy * a / b;
        prob.dobias += cy * rhs / b;
        prob.cost[y] = 0.0;
        prob.clo[x] = lo;
        prob.cup[x] = up;
        prob.sol[y] = (rhs - a * prob.sol[x]) / b;

        // substitute y out of every other row it appears in
        for (r, d) in prob.col_entries(y) {
            if r == i {
                continue;
            }
            prob.add_multiple_of_row(-d / b, i, r);
            if prob.find_in_row(r, y).is_some() {
                prob.delete_element(r, y);
            }
            let shift = d * rhs / b;
            if !prob.is_neg_inf(prob.rlo[r]) {
                prob.rlo[r] -= shift;
            }
            if !prob.is_pos_inf(prob.rup[r]) {
                prob.rup[r] -= shift;
            }
            prob.acts[r] -= shift;
            prob.mark_row_changed(r);
        }
        prob.remove_row(i);
        prob.remove_col(y);
        prob.mark_col_changed(x);
    }
}

impl Postsolve for Doubleton {
    fn name(&self) -> &'static str {
        "doubleton"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let (x, y, i) = (self.keep_col, self.elim_col, self.row);
        let (a, b) = (self.coef_keep, self.coef_elim);

        prob.restore_column(x, &self.keep_elements);
        prob.restore_column(y, &self.elim_elements);

        prob.clo[x] = self.keep_lower;
        prob.cup[x] = self.keep_upper;
        prob.cost[x] = prob.maxmin * self.keep_cost;
        prob.clo[y] = self.elim_lower;
        prob.cup[y] = self.elim_upper;
        prob.cost[y] = prob.maxmin * self.elim_cost;

        prob.rlo[i] = self.rhs;
        prob.rup[i] = self.rhs;
        prob.sol[y] = (self.rhs - a * prob.sol[x]) / b;
        prob.acts[i] = self.rhs;
        for &(r, d) in &self.elim_elements {
            if r != i {
                prob.acts[r] += d * self.rhs / b;
            }
        }

        // One of the pair turns basic against the restored row. The
        // eliminated variable is the natural choice, unless the survivor sits
        // strictly inside its restored bounds (its reduced-problem bound was
        // induced by y): then the survivor is basic and y parks on the bound
        // that induced it.
        let xval = prob.sol[x];
        let at_lower =
            self.keep_lower > -prob.inf && (xval - self.keep_lower).abs() <= prob.ztolzb;
        let at_upper =
            self.keep_upper < prob.inf && (xval - self.keep_upper).abs() <= prob.ztolzb;
        let x_was_basic = prob.have_status && prob.colstat[x].is_basic();

        if at_lower || at_upper || x_was_basic {
            let mut y_dual = prob.cost[y];
            for &(r, d) in &self.elim_elements {
                if r != i {
                    y_dual -= prob.rowduals[r] * d;
                }
            }
            y_dual /= b;
            prob.rowduals[i] = y_dual;
            prob.rcosts[y] = 0.0;
            prob.rcosts[x] = prob.reduced_cost_of(x);
            prob.set_col_status(y, Status::Basic);
            if !x_was_basic {
                prob.fix_col_status_at_bounds(x);
            }
        } else {
            prob.rowduals[i] = 0.0;
            let y_dual = prob.reduced_cost_of(x) / a;
            prob.rowduals[i] = y_dual;
            prob.rcosts[x] = 0.0;
            prob.rcosts[y] = prob.reduced_cost_of(y);
            prob.set_col_status(x, Status::Basic);
            let yval = prob.sol[y];
            if self.elim_lower > -prob.inf && (yval - self.elim_lower).abs() <= prob.ztolzb {
                prob.set_col_status(y, Status::AtLower);
            } else if self.elim_upper < prob.inf
                && (yval - self.elim_upper).abs() <= prob.ztolzb
            {
                prob.set_col_status(y, Status::AtUpper);
            } else {
                prob.set_col_status(y, Status::SuperBasic);
            }
        }
        prob.set_row_status(i, Status::AtLower);

        prob.cdone[y] = true;
        prob.rdone[i] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::presolve_matrix;

    #[test]
    fn doubleton_substitutes_and_tightens() {
        // min x + y  s.t.  x + 2y = 4,  0 <= x, y <= 10
        let mut prob = presolve_matrix(
            &[&[1.0, 2.0]],
            &[(4.0, 4.0)],
            &[(0.0, 10.0), (0.0, 10.0)],
            &[1.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        doubleton(&mut prob, &mut actions);
        prob.assert_consistent();

        assert_eq!(actions.len(), 1);
        // y (larger pivot) is eliminated: x = 4 - 2y in [-16, 4] -> [0, 4]
        assert_eq!(prob.col_len[1], 0);
        assert_eq!(prob.row_len[0], 0);
        assert_eq!(prob.clo[0], 0.0);
        assert_eq!(prob.cup[0], 4.0);
        // c_x' = 1 - 1 * (1/2) = 0.5, bias 1 * 4/2 = 2
        assert_eq!(prob.cost[0], 0.5);
        assert_eq!(prob.dobias, 2.0);
    }

    #[test]
    fn substitution_rewrites_shared_rows() {
        // Rows: x + y = 2 (doubleton), x + y + z <= 5.
        // Eliminating y rewrites the second row to z <= 3.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0, 0.0], &[1.0, 1.0, 1.0]],
            &[(2.0, 2.0), (-1e30, 5.0)],
            &[(0.0, 10.0), (0.0, 10.0), (0.0, 10.0)],
            &[0.0, 0.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        doubleton(&mut prob, &mut actions);
        prob.assert_consistent();

        // x (first equal-pivot candidate) is eliminated via row 0; in row 1
        // both the x and y coefficients vanish and the side shifts by 2.
        assert_eq!(prob.col_len[0], 0);
        assert_eq!(prob.coeff(1, 0), 0.0);
        assert_eq!(prob.coeff(1, 1), 0.0);
        assert_eq!(prob.row_len[1], 1);
        assert_eq!(prob.coeff(1, 2), 1.0);
        assert_eq!(prob.rup[1], 3.0);
        // survivor bounds: y = (2 - x)/1 in [-8, 2] -> [0, 2]
        assert_eq!(prob.clo[1], 0.0);
        assert_eq!(prob.cup[1], 2.0);
    }

    #[test]
    fn integer_pair_needs_integral_backmap() {
        // 2x + 3y = 5 with x, y integer: eliminating either breaks
        // integrality of the back-map, so nothing happens.
        let mut prob = presolve_matrix(
            &[&[2.0, 3.0]],
            &[(5.0, 5.0)],
            &[(0.0, 10.0), (0.0, 10.0)],
            &[1.0, 1.0],
        );
        prob.integer[0] = true;
        prob.integer[1] = true;
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        doubleton(&mut prob, &mut actions);
        assert!(actions.is_empty());
        assert_eq!(prob.row_len[0], 2);
    }
}
