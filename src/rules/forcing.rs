//! Forcing and useless constraints.
//!
//! Comparing a row's attainable activity interval `[L, U]` against its sides:
//! `L > rup` or `U < rlo` is infeasible; `[L, U]` inside the sides means the
//! row can never bind and is dropped; `L == rup` (or `U == rlo`) can only be
//! met with every variable at the bound that attains the extreme, so all of
//! them are fixed and the row empties out.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::{remove_fixed_col, row_activity_bounds};
use crate::{E, I, PresolveStatus};

pub(crate) struct ForcedCol {
    pub col: I,
    pub coef: E,
    pub lower: E,
    pub upper: E,
}

pub(crate) struct ForcingConstraint {
    pub row: I,
    /// True when the row was forced against its lower side (activity maxed).
    pub at_lower_side: bool,
    pub entries: Vec<ForcedCol>,
}

pub(crate) struct UselessConstraint {
    pub row: I,
    pub rlo: E,
    pub rup: E,
    pub elements: Vec<(I, E)>,
}

pub(crate) fn forcing_constraints(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let rows: Vec<I> = prob.work.rows_to_do.clone();
    'rows: for i in rows {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.row_len[i] == 0 {
            continue;
        }
        let (lo_act, up_act) = row_activity_bounds(prob, i, None);
        let rlo = prob.rlo[i];
        let rup = prob.rup[i];
        let tol = prob.feas_tol;

        if lo_act > rup + tol || up_act < rlo - tol {
            prob.status = PresolveStatus::Infeasible;
            return;
        }

        let lo_redundant = prob.is_neg_inf(rlo) || lo_act >= rlo - tol;
        let up_redundant = prob.is_pos_inf(rup) || up_act <= rup + tol;
        if lo_redundant && up_redundant {
            actions.push(
                UselessConstraint {
                    row: i,
                    rlo,
                    rup,
                    elements: prob.row_entries(i),
                }
                .into(),
            );
            prob.remove_row(i);
            continue;
        }

        let force_down =
            !prob.is_pos_inf(rup) && !prob.is_neg_inf(lo_act) && (rup - lo_act).abs() <= tol;
        let force_up =
            !prob.is_neg_inf(rlo) && !prob.is_pos_inf(up_act) && (up_act - rlo).abs() <= tol;
        if !(force_down || force_up) {
            continue;
        }

        let entries = prob.row_entries(i);
        let mut forced = Vec::with_capacity(entries.len());
        for &(j, a) in &entries {
            if prob.col_prohibited[j] {
                continue 'rows;
            }
            let target = if force_down == (a > 0.0) {
                prob.clo[j]
            } else {
                prob.cup[j]
            };
            if prob.is_neg_inf(target) || prob.is_pos_inf(target) {
                continue 'rows;
            }
            forced.push(ForcedCol {
                col: j,
                coef: a,
                lower: prob.clo[j],
                upper: prob.cup[j],
            });
        }

        actions.push(
            ForcingConstraint {
                row: i,
                at_lower_side: force_up,
                entries: forced,
            }
            .into(),
        );
        for &(j, a) in &entries {
            let target = if force_down == (a > 0.0) {
                prob.clo[j]
            } else {
                prob.cup[j]
            };
            prob.clo[j] = target;
            prob.cup[j] = target;
        }
        for &(j, _) in &entries {
            remove_fixed_col(prob, actions, j);
        }
        // the row is empty now and gets dropped with the other empties
    }
}

impl Postsolve for ForcingConstraint {
    fn name(&self) -> &'static str {
        "forcing_constraint"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        for f in &self.entries {
            prob.clo[f.col] = f.lower;
            prob.cup[f.col] = f.upper;
        }

        // The fixed-variable undos put every column nonbasic with a reduced
        // cost computed against a zero row dual. If any of those signs is
        // wrong for the bound the variable sits on, give the row the dual
        // that zeroes the worst offender and make that column basic.
        let mut worst: Option<(usize, E)> = None;
        for (idx, f) in self.entries.iter().enumerate() {
            let dj = prob.rcosts[f.col];
            let x = prob.sol[f.col];
            let at_lower = (x - f.lower).abs() <= prob.ztolzb;
            let at_upper = (x - f.upper).abs() <= prob.ztolzb;
            let violation = if at_lower && dj < -prob.ztoldj {
                -dj
            } else if at_upper && !at_lower && dj > prob.ztoldj {
                dj
            } else {
                0.0
            };
            if violation > prob.ztoldj
                && worst.map(|(_, v)| violation > v).unwrap_or(true)
            {
                worst = Some((idx, violation));
            }
        }

        if let Some((kidx, _)) = worst {
            let pivot = &self.entries[kidx];
            let y = prob.rcosts[pivot.col] / pivot.coef;
            prob.rowduals[self.row] = y;
            for f in &self.entries {
                prob.rcosts[f.col] -= y * f.coef;
            }
            prob.set_col_status(pivot.col, Status::Basic);
            prob.set_row_status(
                self.row,
                if y > 0.0 { Status::AtLower } else { Status::AtUpper },
            );
            for (idx, f) in self.entries.iter().enumerate() {
                if idx != kidx {
                    prob.fix_col_status_at_bounds(f.col);
                }
            }
        } else {
            // row dual stays zero; the empty-row undo already made it basic
            for f in &self.entries {
                prob.fix_col_status_at_bounds(f.col);
            }
        }
        prob.rdone[self.row] = true;
    }
}

impl Postsolve for UselessConstraint {
    fn name(&self) -> &'static str {
        "useless_constraint"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let i = self.row;
        let mut activity = 0.0;
        for &(j, v) in &self.elements {
            prob.add_element(j, i, v);
            activity += v * prob.sol[j];
        }
        prob.rlo[i] = self.rlo;
        prob.rup[i] = self.rup;
        prob.acts[i] = activity;
        prob.rowduals[i] = 0.0;
        prob.set_row_status(i, Status::Basic);
        prob.rdone[i] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Postsolve as _;
    use crate::tests::fixtures::presolve_matrix;

    #[test]
    fn forcing_row_fixes_every_variable() {
        // x + y <= 0 with x, y >= 0 forces both to zero.
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0]],
            &[(-1e30, 0.0)],
            &[(0.0, 1e30), (0.0, 1e30)],
            &[1.0, 2.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        forcing_constraints(&mut prob, &mut actions);
        prob.assert_consistent();

        // one forcing record plus two fixed-variable records
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].name(), "forcing_constraint");
        assert_eq!(prob.clo[0], 0.0);
        assert_eq!(prob.cup[0], 0.0);
        assert_eq!(prob.col_len[0], 0);
        assert_eq!(prob.col_len[1], 0);
        assert_eq!(prob.row_len[0], 0);
    }

    #[test]
    fn redundant_row_is_useless() {
        // 0 <= x <= 1 makes -5 <= x <= 5 never binding; x <= 0.5 still can.
        let mut prob = presolve_matrix(
            &[&[1.0], &[1.0]],
            &[(-5.0, 5.0), (0.0, 0.5)],
            &[(0.0, 1.0)],
            &[1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        forcing_constraints(&mut prob, &mut actions);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name(), "useless_constraint");
        assert_eq!(prob.row_len[0], 0);
        assert_eq!(prob.row_len[1], 1);
    }

    #[test]
    fn impossible_row_is_infeasible() {
        // x + y >= 5 with x, y <= 1
        let mut prob = presolve_matrix(
            &[&[1.0, 1.0]],
            &[(5.0, 1e30)],
            &[(0.0, 1.0), (0.0, 1.0)],
            &[1.0, 1.0],
        );
        prob.status = PresolveStatus::Feasible;
        prob.seed_worklists();
        let mut actions = Vec::new();
        forcing_constraints(&mut prob, &mut actions);
        assert_eq!(prob.status, PresolveStatus::Infeasible);
    }
}
