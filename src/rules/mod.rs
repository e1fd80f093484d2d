//! Reduction rules.
//!
//! Every rule follows the same contract: read the current problem and
//! worklists, perform one family of semantics-preserving rewrites, append
//! records to the action log, mark dirtied rows/columns, and set a terminal
//! status instead of unwinding when infeasibility or unboundedness is
//! detected. Element order within a row or column is never assumed.

use crate::actions::PresolveAction;
use crate::interface::basis::Status;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::fixed::FixedVariable;
use crate::{E, I};

pub mod doubleton;
pub mod dual;
pub mod dupcol;
pub mod empty;
pub mod fixed;
pub mod forcing;
pub mod implied_free;
pub mod isolated;
pub mod singleton;
pub mod tighten;
pub mod zeros;

/// Interval of possible activities of row `i` given the current column
/// bounds, optionally ignoring one column. Infinite ends are reported as
/// `-inf`/`+inf` sentinels.
pub(crate) fn row_activity_bounds(
    prob: &PresolveMatrix,
    i: I,
    skip: Option<I>,
) -> (E, E) {
    let mut lo = 0.0;
    let mut up = 0.0;
    let mut lo_inf = 0usize;
    let mut up_inf = 0usize;
    for k in prob.row_range(i) {
        let j = prob.row_cols[k];
        if skip == Some(j) {
            continue;
        }
        let a = prob.row_vals[k];
        let (cl, cu) = (prob.clo[j], prob.cup[j]);
        if a > 0.0 {
            if prob.is_neg_inf(cl) {
                lo_inf += 1;
            } else {
                lo += a * cl;
            }
            if prob.is_pos_inf(cu) {
                up_inf += 1;
            } else {
                up += a * cu;
            }
        } else {
            if prob.is_pos_inf(cu) {
                lo_inf += 1;
            } else {
                lo += a * cu;
            }
            if prob.is_neg_inf(cl) {
                up_inf += 1;
            } else {
                up += a * cl;
            }
        }
    }
    (
        if lo_inf > 0 { -prob.inf } else { lo },
        if up_inf > 0 { prob.inf } else { up },
    )
}

/// Interval of `x_j` implied by the equality `sum_k a_ik x_k = rhs`, using
/// the other columns' bounds.
pub(crate) fn implied_col_bounds(
    prob: &PresolveMatrix,
    i: I,
    j: I,
    coef: E,
    rhs: E,
) -> (E, E) {
    let (olo, oup) = row_activity_bounds(prob, i, Some(j));
    let term_lo = if prob.is_pos_inf(oup) {
        -prob.inf
    } else {
        rhs - oup
    };
    let term_hi = if prob.is_neg_inf(olo) {
        prob.inf
    } else {
        rhs - olo
    };
    divide_interval(prob, term_lo, term_hi, coef)
}

/// `[lo, hi] / a` with sentinel-aware signs.
pub(crate) fn divide_interval(prob: &PresolveMatrix, lo: E, hi: E, a: E) -> (E, E) {
    let map = |v: E| -> E {
        if prob.is_neg_inf(v) {
            if a > 0.0 { -prob.inf } else { prob.inf }
        } else if prob.is_pos_inf(v) {
            if a > 0.0 { prob.inf } else { -prob.inf }
        } else {
            v / a
        }
    };
    let x = map(lo);
    let y = map(hi);
    if a > 0.0 { (x, y) } else { (y, x) }
}

pub(crate) fn is_near_int(v: E) -> bool {
    (v - v.round()).abs() <= 1e-9
}

/// Removes a column whose bounds have been pinned (`clo == cup`), folding its
/// objective contribution into the bias and adjusting the rows it touched.
///
/// The caller must have pinned the bounds first; the record saves the column
/// so postsolve can rebuild it and recompute its reduced cost.
pub(crate) fn remove_fixed_col(
    prob: &mut PresolveMatrix,
    actions: &mut Vec<PresolveAction>,
    j: I,
) {
    let value = prob.clo[j];
    prob.sol[j] = value;
    let elements = prob.col_entries(j);
    for &(i, a) in &elements {
        if !prob.is_neg_inf(prob.rlo[i]) {
            prob.rlo[i] -= a * value;
        }
        if !prob.is_pos_inf(prob.rup[i]) {
            prob.rup[i] -= a * value;
        }
        prob.acts[i] -= a * value;
    }
    prob.dobias += prob.cost[j] * value;
    actions.push(
        FixedVariable {
            col: j,
            value,
            cost: prob.cost[j],
            elements,
        }
        .into(),
    );
    prob.cost[j] = 0.0;
    prob.colstat[j] = Status::AtLower;
    prob.remove_col(j);
}
