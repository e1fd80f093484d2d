//! Duplicate columns and duplicate rows.
//!
//! Columns that are positive scalar multiples of one another with matching
//! cost ratios merge into one variable with combined bounds; with differing
//! costs one of them may be dominated and fixable. Duplicate rows intersect
//! their sides onto the survivor and the copy is dropped.

use std::collections::HashMap;

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::dual::DualFix;
use crate::rules::remove_fixed_col;
use crate::{E, I, PresolveStatus};

pub(crate) struct DuplicateColumn {
    pub keep_col: I,
    pub elim_col: I,
    pub ratio: E,
    pub keep_lower: E,
    pub keep_upper: E,
    pub elim_lower: E,
    pub elim_upper: E,
}

pub(crate) struct DuplicateRow {
    pub keep_row: I,
    pub elim_row: I,
    pub ratio: E,
    pub keep_rlo: E,
    pub keep_rup: E,
    pub elim_rlo: E,
    pub elim_rup: E,
    pub elements: Vec<(I, E)>,
}

fn proportional(sorted_a: &[(I, E)], sorted_b: &[(I, E)], ratio: E) -> bool {
    sorted_a.iter().zip(sorted_b.iter()).all(|(&(ia, va), &(ib, vb))| {
        ia == ib && (vb - ratio * va).abs() <= 1e-10 * vb.abs().max(1.0)
    })
}

pub(crate) fn dupcol(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let mut groups: HashMap<Vec<I>, Vec<I>> = HashMap::new();
    for j in 0..prob.ncols {
        if prob.col_len[j] == 0 || prob.col_prohibited[j] {
            continue;
        }
        let mut key: Vec<I> = prob.col_range(j).map(|k| prob.col_rows[k]).collect();
        key.sort_unstable();
        groups.entry(key).or_default().push(j);
    }
    let mut groups: Vec<(Vec<I>, Vec<I>)> = groups.into_iter().collect();
    groups.sort();

    let mut gone = vec![false; prob.ncols];
    for (_, cols) in groups {
        if cols.len() < 2 {
            continue;
        }
        let sorted: Vec<Vec<(I, E)>> = cols
            .iter()
            .map(|&j| {
                let mut v = prob.col_entries(j);
                v.sort_by_key(|&(i, _)| i);
                v
            })
            .collect();

        for a_idx in 0..cols.len() {
            for b_idx in a_idx + 1..cols.len() {
                let (j, k) = (cols[a_idx], cols[b_idx]);
                if gone[j] || gone[k] || !prob.status.is_feasible() {
                    continue;
                }
                let ratio = sorted[b_idx][0].1 / sorted[a_idx][0].1;
                if !ratio.is_finite() || ratio <= 0.0 {
                    continue;
                }
                if !proportional(&sorted[a_idx], &sorted[b_idx], ratio) {
                    continue;
                }

                let cost_gap = prob.cost[k] - ratio * prob.cost[j];
                let costs_match = cost_gap.abs() <= 1e-10 * prob.cost[k].abs().max(1.0);
                if costs_match {
                    let mergeable = match (prob.integer[j], prob.integer[k]) {
                        (false, false) => true,
                        (true, true) => (ratio - 1.0).abs() <= 1e-9,
                        _ => false,
                    };
                    if !mergeable {
                        continue;
                    }
                    let lo = if prob.is_neg_inf(prob.clo[j]) || prob.is_neg_inf(prob.clo[k]) {
                        -prob.inf
                    } else {
                        prob.clo[j] + ratio * prob.clo[k]
                    };
                    let up = if prob.is_pos_inf(prob.cup[j]) || prob.is_pos_inf(prob.cup[k]) {
                        prob.inf
                    } else {
                        prob.cup[j] + ratio * prob.cup[k]
                    };
                    actions.push(
                        DuplicateColumn {
                            keep_col: j,
                            elim_col: k,
                            ratio,
                            keep_lower: prob.clo[j],
                            keep_upper: prob.cup[j],
                            elim_lower: prob.clo[k],
                            elim_upper: prob.cup[k],
                        }
                        .into(),
                    );
                    prob.sol[j] += ratio * prob.sol[k];
                    prob.clo[j] = lo;
                    prob.cup[j] = up;
                    prob.cost[k] = 0.0;
                    prob.remove_col(k);
                    prob.mark_col_changed(j);
                    gone[k] = true;
                } else if !prob.integer[j] && !prob.integer[k] {
                    // dominance: mass can shift along the pair for free
                    let d = prob.maxmin * cost_gap;
                    if d > prob.ztoldj && prob.is_pos_inf(prob.cup[j]) {
                        if prob.is_neg_inf(prob.clo[k]) {
                            prob.status = PresolveStatus::Unbounded;
                            return;
                        }
                        actions.push(
                            DualFix {
                                col: k,
                                lower: prob.clo[k],
                                upper: prob.cup[k],
                                at_lower: true,
                            }
                            .into(),
                        );
                        prob.cup[k] = prob.clo[k];
                        remove_fixed_col(prob, actions, k);
                        gone[k] = true;
                    } else if d < -prob.ztoldj && prob.is_pos_inf(prob.cup[k]) {
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
                        gone[j] = true;
                    }
                }
            }
        }
    }
}

pub(crate) fn duprow(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let mut groups: HashMap<Vec<I>, Vec<I>> = HashMap::new();
    for i in 0..prob.nrows {
        if prob.row_len[i] == 0 || prob.row_prohibited[i] {
            continue;
        }
        let mut key: Vec<I> = prob.row_range(i).map(|k| prob.row_cols[k]).collect();
        key.sort_unstable();
        groups.entry(key).or_default().push(i);
    }
    let mut groups: Vec<(Vec<I>, Vec<I>)> = groups.into_iter().collect();
    groups.sort();

    let mut gone = vec![false; prob.nrows];
    for (_, rows) in groups {
        if rows.len() < 2 {
            continue;
        }
        let sorted: Vec<Vec<(I, E)>> = rows
            .iter()
            .map(|&i| {
                let mut v = prob.row_entries(i);
                v.sort_by_key(|&(j, _)| j);
                v
            })
            .collect();

        for a_idx in 0..rows.len() {
            for b_idx in a_idx + 1..rows.len() {
                let (i, k) = (rows[a_idx], rows[b_idx]);
                if gone[i] || gone[k] || !prob.status.is_feasible() {
                    continue;
                }
                let ratio = sorted[b_idx][0].1 / sorted[a_idx][0].1;
                if !ratio.is_finite() || ratio <= 0.0 {
                    continue;
                }
                if !proportional(&sorted[a_idx], &sorted[b_idx], ratio) {
                    continue;
                }

                // row k's sides, mapped onto row i's scale
                let lo2 = if prob.is_neg_inf(prob.rlo[k]) {
                    -prob.inf
                } else {
                    prob.rlo[k] / ratio
                };
                let up2 = if prob.is_pos_inf(prob.rup[k]) {
                    prob.inf
                } else {
                    prob.rup[k] / ratio
                };
                let mut lo = prob.rlo[i].max(lo2);
                let mut up = prob.rup[i].min(up2);
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
                    DuplicateRow {
                        keep_row: i,
                        elim_row: k,
                        ratio,
                        keep_rlo: prob.rlo[i],
                        keep_rup: prob.rup[i],
                        elim_rlo: prob.rlo[k],
                        elim_rup: prob.rup[k],
                        elements: prob.row_entries(k),
                    }
                    .into(),
                );
                prob.rlo[i] = lo;
                prob.rup[i] = up;
                prob.remove_row(k);
                prob.mark_row_changed(i);
                gone[k] = true;
            }
        }
    }
}

impl Postsolve for DuplicateColumn {
    fn name(&self) -> &'static str {
        "duplicate_column"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let (j, k, r) = (self.keep_col, self.elim_col, self.ratio);
        let z = prob.sol[j];
        let tol = prob.ztolzb.max(1e-9);

        // split z = x_j + r x_k, preferring to park the copy at a bound;
        // otherwise the survivor moves to one of its own bounds and the copy
        // takes over as the basic variable
        let mut split: Option<(E, E, Status, Option<Status>)> = None;
        if self.elim_lower > -prob.inf {
            let xj = z - r * self.elim_lower;
            if xj >= self.keep_lower - tol && xj <= self.keep_upper + tol {
                split = Some((xj, self.elim_lower, Status::AtLower, None));
            }
        }
        if split.is_none() && self.elim_upper < prob.inf {
            let xj = z - r * self.elim_upper;
            if xj >= self.keep_lower - tol && xj <= self.keep_upper + tol {
                split = Some((xj, self.elim_upper, Status::AtUpper, None));
            }
        }
        if split.is_none() && self.keep_lower > -prob.inf {
            let xk = (z - self.keep_lower) / r;
            if xk >= self.elim_lower - tol && xk <= self.elim_upper + tol {
                split = Some((self.keep_lower, xk, Status::Basic, Some(Status::AtLower)));
            }
        }
        if split.is_none() && self.keep_upper < prob.inf {
            let xk = (z - self.keep_upper) / r;
            if xk >= self.elim_lower - tol && xk <= self.elim_upper + tol {
                split = Some((self.keep_upper, xk, Status::Basic, Some(Status::AtUpper)));
            }
        }
        let (xj, xk, k_status, j_status) = split.unwrap_or((z, 0.0, Status::IsFree, None));

        prob.sol[j] = xj;
        prob.sol[k] = xk;
        prob.clo[j] = self.keep_lower;
        prob.cup[j] = self.keep_upper;
        prob.clo[k] = self.elim_lower;
        prob.cup[k] = self.elim_upper;
        prob.cost[k] = r * prob.cost[j];

        let elements: Vec<(I, E)> = prob
            .col_elements(j)
            .into_iter()
            .map(|(i, v)| (i, r * v))
            .collect();
        prob.restore_column(k, &elements);
        prob.rcosts[k] = r * prob.rcosts[j];

        prob.set_col_status(k, k_status);
        match j_status {
            Some(status) => prob.set_col_status(j, status),
            None => prob.fix_col_status_at_bounds(j),
        }
        prob.cdone[k] = true;
    }
}

impl Postsolve for DuplicateRow {
    fn name(&self) -> &'static str {
        "duplicate_row"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let (i, k, r) = (self.keep_row, self.elim_row, self.ratio);
        for &(j, v) in &self.elements {
            prob.add_element(j, k, v);
        }
        prob.rlo[i] = self.keep_rlo;
        prob.rup[i] = self.keep_rup;
        prob.rlo[k] = self.elim_rlo;
        prob.rup[k] = self.elim_rup;
        prob.acts[k] = r * prob.acts[i];

        let y = prob.rowduals[i];
        let mut transfer = false;
        if y.abs() > prob.ztoldj {
            if y > 0.0 {
                // binding at the tightened lower side; did the copy supply it?
                let own = if self.keep_rlo <= -prob.inf {
                    -prob.inf
                } else {
                    self.keep_rlo
                };
                let copy = if self.elim_rlo <= -prob.inf {
                    -prob.inf
                } else {
                    self.elim_rlo / r
                };
                transfer = copy > own;
            } else {
                let own = if self.keep_rup >= prob.inf {
                    prob.inf
                } else {
                    self.keep_rup
                };
                let copy = if self.elim_rup >= prob.inf {
                    prob.inf
                } else {
                    self.elim_rup / r
                };
                transfer = copy < own;
            }
        }

        if transfer {
            prob.rowduals[k] = y / r;
            prob.rowduals[i] = 0.0;
            prob.set_row_status(k, if y > 0.0 { Status::AtLower } else { Status::AtUpper });
            prob.set_row_status(i, Status::Basic);
        } else {
            prob.rowduals[k] = 0.0;
            prob.set_row_status(k, Status::Basic);
        }
        prob.rdone[k] = true;
    }
}
