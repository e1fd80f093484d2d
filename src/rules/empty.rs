//! Final cleanup: drop empty columns and empty rows.
//!
//! Everything earlier works in original indices; these two transforms are
//! the only renumbering step. Surviving columns/rows are compacted down and
//! the remap recorded in `original_column`/`original_row`. Postsolve runs
//! them first (they are pushed last) and expands the reduced-index arrays
//! back to original indexing before any other record executes.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::matrix::{StorageLink, NO_LINK};
use crate::{E, I, PresolveStatus};

pub(crate) struct EmptyColumn {
    pub col: I,
    pub lower: E,
    pub upper: E,
    pub cost: E,
    pub value: E,
}

pub(crate) struct DropEmptyColumns {
    pub dropped: Vec<EmptyColumn>,
    pub ncols_at_drop: I,
}

pub(crate) struct EmptyRow {
    pub row: I,
    pub rlo: E,
    pub rup: E,
}

pub(crate) struct DropEmptyRows {
    pub dropped: Vec<EmptyRow>,
    pub nrows_at_drop: I,
}

pub(crate) fn drop_empty_cols(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let mut dropped = Vec::new();
    for j in 0..prob.ncols {
        if prob.col_len[j] > 0 {
            continue;
        }
        let lo = prob.clo[j];
        let mut up = prob.cup[j];
        if lo > up + prob.feas_tol {
            prob.status = PresolveStatus::Infeasible;
            return;
        }
        if lo > up {
            up = lo;
        }
        let cj = prob.maxmin * prob.cost[j];
        let value = if cj > prob.ztoldj {
            if prob.is_neg_inf(lo) {
                prob.status = PresolveStatus::Unbounded;
                return;
            }
            lo
        } else if cj < -prob.ztoldj {
            if prob.is_pos_inf(up) {
                prob.status = PresolveStatus::Unbounded;
                return;
            }
            up
        } else {
            prob.sol[j].clamp(lo.max(-prob.inf), up.min(prob.inf))
        };
        prob.dobias += prob.cost[j] * value;
        dropped.push(EmptyColumn {
            col: j,
            lower: lo,
            upper: up,
            cost: prob.cost[j],
            value,
        });
    }
    if dropped.is_empty() {
        return;
    }

    let ncols_at_drop = prob.ncols;
    let mut map = vec![NO_LINK; prob.ncols];
    let mut next = 0;
    for j in 0..prob.ncols {
        if prob.col_len[j] == 0 {
            continue;
        }
        map[j] = next;
        prob.clo[next] = prob.clo[j];
        prob.cup[next] = prob.cup[j];
        prob.cost[next] = prob.cost[j];
        prob.integer[next] = prob.integer[j];
        prob.sol[next] = prob.sol[j];
        prob.colstat[next] = prob.colstat[j];
        prob.col_start[next] = prob.col_start[j];
        prob.col_len[next] = prob.col_len[j];
        prob.original_column[next] = prob.original_column[j];
        prob.col_prohibited[next] = prob.col_prohibited[j];
        next += 1;
    }
    prob.clo.truncate(next);
    prob.cup.truncate(next);
    prob.cost.truncate(next);
    prob.integer.truncate(next);
    prob.sol.truncate(next);
    prob.colstat.truncate(next);
    prob.col_start.truncate(next);
    prob.col_len.truncate(next);
    prob.original_column.truncate(next);
    prob.col_prohibited.truncate(next);
    prob.ncols = next;

    // remap the column indices stored in the row file
    for i in 0..prob.nrows {
        for k in prob.row_range(i) {
            prob.row_cols[k] = map[prob.row_cols[k]];
        }
    }

    // rebuild the storage chain in physical order
    let mut order: Vec<I> = (0..prob.ncols).collect();
    order.sort_by_key(|&j| prob.col_start[j]);
    prob.clink = StorageLink::from_order(&order, prob.ncols);
    prob.work.resize(prob.nrows, prob.ncols);

    actions.push(
        DropEmptyColumns {
            dropped,
            ncols_at_drop,
        }
        .into(),
    );
}

pub(crate) fn drop_empty_rows(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    let mut dropped = Vec::new();
    for i in 0..prob.nrows {
        if prob.row_len[i] > 0 {
            continue;
        }
        if prob.rlo[i] > prob.feas_tol || prob.rup[i] < -prob.feas_tol {
            prob.status = PresolveStatus::Infeasible;
            return;
        }
        dropped.push(EmptyRow {
            row: i,
            rlo: prob.rlo[i],
            rup: prob.rup[i],
        });
    }
    if dropped.is_empty() {
        return;
    }

    let nrows_at_drop = prob.nrows;
    let mut map = vec![NO_LINK; prob.nrows];
    let mut next = 0;
    for i in 0..prob.nrows {
        if prob.row_len[i] == 0 {
            continue;
        }
        map[i] = next;
        prob.rlo[next] = prob.rlo[i];
        prob.rup[next] = prob.rup[i];
        prob.acts[next] = prob.acts[i];
        prob.rowstat[next] = prob.rowstat[i];
        prob.row_start[next] = prob.row_start[i];
        prob.row_len[next] = prob.row_len[i];
        prob.original_row[next] = prob.original_row[i];
        prob.row_prohibited[next] = prob.row_prohibited[i];
        next += 1;
    }
    prob.rlo.truncate(next);
    prob.rup.truncate(next);
    prob.acts.truncate(next);
    prob.rowstat.truncate(next);
    prob.row_start.truncate(next);
    prob.row_len.truncate(next);
    prob.original_row.truncate(next);
    prob.row_prohibited.truncate(next);
    prob.nrows = next;

    for j in 0..prob.ncols {
        for k in prob.col_range(j) {
            prob.col_rows[k] = map[prob.col_rows[k]];
        }
    }

    let mut order: Vec<I> = (0..prob.nrows).collect();
    order.sort_by_key(|&i| prob.row_start[i]);
    prob.rlink = StorageLink::from_order(&order, prob.nrows);
    prob.work.resize(prob.nrows, prob.ncols);

    actions.push(
        DropEmptyRows {
            dropped,
            nrows_at_drop,
        }
        .into(),
    );
}

impl Postsolve for DropEmptyColumns {
    fn name(&self) -> &'static str {
        "drop_empty_columns"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let expanded = self.ncols_at_drop;
        debug_assert_eq!(prob.ncols + self.dropped.len(), expanded);

        let mut src = prob.ncols;
        let mut drops = self.dropped.iter().rev().peekable();
        for j in (0..expanded).rev() {
            if drops.peek().map(|d| d.col) == Some(j) {
                let d = drops.next().unwrap();
                prob.col_start[j] = 0;
                prob.col_len[j] = 0;
                prob.clo[j] = d.lower;
                prob.cup[j] = d.upper;
                prob.cost[j] = prob.maxmin * d.cost;
                prob.sol[j] = d.value;
                prob.rcosts[j] = prob.maxmin * d.cost;
                if prob.have_status {
                    prob.colstat[j] = Status::SuperBasic;
                    prob.fix_col_status_at_bounds(j);
                }
                prob.cdone[j] = true;
            } else {
                src -= 1;
                if src != j {
                    prob.col_start[j] = prob.col_start[src];
                    prob.col_len[j] = prob.col_len[src];
                    prob.clo[j] = prob.clo[src];
                    prob.cup[j] = prob.cup[src];
                    prob.cost[j] = prob.cost[src];
                    prob.sol[j] = prob.sol[src];
                    prob.rcosts[j] = prob.rcosts[src];
                    prob.colstat[j] = prob.colstat[src];
                    prob.col_len[src] = 0;
                }
                prob.cdone[j] = true;
            }
        }
        prob.ncols = expanded;
    }
}

impl Postsolve for DropEmptyRows {
    fn name(&self) -> &'static str {
        "drop_empty_rows"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let expanded = self.nrows_at_drop;
        debug_assert_eq!(prob.nrows + self.dropped.len(), expanded);

        // expand row-indexed arrays, recording where each reduced row went
        let mut map = vec![NO_LINK; prob.nrows.max(1)];
        let mut src = prob.nrows;
        let mut drops = self.dropped.iter().rev().peekable();
        for i in (0..expanded).rev() {
            if drops.peek().map(|d| d.row) == Some(i) {
                let d = drops.next().unwrap();
                prob.rlo[i] = d.rlo;
                prob.rup[i] = d.rup;
                prob.acts[i] = 0.0;
                prob.rowduals[i] = 0.0;
                prob.set_row_status(i, Status::Basic);
                prob.rdone[i] = true;
            } else {
                src -= 1;
                map[src] = i;
                if src != i {
                    prob.rlo[i] = prob.rlo[src];
                    prob.rup[i] = prob.rup[src];
                    prob.acts[i] = prob.acts[src];
                    prob.rowduals[i] = prob.rowduals[src];
                    prob.rowstat[i] = prob.rowstat[src];
                }
                prob.rdone[i] = true;
            }
        }
        prob.nrows = expanded;

        // re-point every stored element at its original row index
        for j in 0..prob.ncols0 {
            let mut k = prob.col_start[j];
            for _ in 0..prob.col_len[j] {
                prob.row_of[k] = map[prob.row_of[k]];
                k = prob.link[k];
            }
        }
    }
}
