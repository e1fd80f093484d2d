//! Isolated constraints.
//!
//! A row whose every column appears in that row alone is a self-contained
//! subproblem: minimize the columns' cost subject to one linear constraint
//! and the bounds. The greedy ratio method solves it exactly, the row and
//! all its columns leave the problem, and postsolve replays the stored
//! optimum together with the marginal ratio as the row's dual.
//!
//! The transform library keeps this rule available even though the default
//! pipeline does not schedule it, mirroring the original driver.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::{E, I, PresolveStatus, ZTOLDP};

pub(crate) struct IsolatedCol {
    pub col: I,
    pub coef: E,
    pub lower: E,
    pub upper: E,
    pub cost: E,
    pub value: E,
}

pub(crate) struct IsolatedConstraint {
    pub row: I,
    pub rlo: E,
    pub rup: E,
    pub entries: Vec<IsolatedCol>,
    /// Column left strictly between its bounds by the greedy fill, if any.
    pub basic_col: Option<I>,
    /// Row dual in minimize convention.
    pub dual: E,
}

pub(crate) fn isolated(prob: &mut PresolveMatrix, actions: &mut Vec<PresolveAction>) {
    'rows: for i in 0..prob.nrows {
        if !prob.status.is_feasible() {
            return;
        }
        if prob.row_len[i] == 0 || prob.row_prohibited[i] {
            continue;
        }
        let entries = prob.row_entries(i);
        for &(j, a) in &entries {
            if prob.col_len[j] != 1
                || prob.col_prohibited[j]
                || prob.integer[j]
                || a.abs() <= ZTOLDP
                || prob.is_neg_inf(prob.clo[j])
                || prob.is_pos_inf(prob.cup[j])
            {
                continue 'rows;
            }
        }

        // start everything at its cheapest bound
        let mut cols: Vec<IsolatedCol> = entries
            .iter()
            .map(|&(j, a)| {
                let cj = prob.maxmin * prob.cost[j];
                let value = if cj < 0.0 { prob.cup[j] } else { prob.clo[j] };
                IsolatedCol {
                    col: j,
                    coef: a,
                    lower: prob.clo[j],
                    upper: prob.cup[j],
                    cost: prob.cost[j],
                    value,
                }
            })
            .collect();
        let activity: E = cols.iter().map(|c| c.coef * c.value).sum();

        let mut basic_col = None;
        let mut dual = 0.0;
        let needs_raise = !prob.is_neg_inf(prob.rlo[i]) && activity < prob.rlo[i] - prob.feas_tol;
        let needs_lower = !prob.is_pos_inf(prob.rup[i]) && activity > prob.rup[i] + prob.feas_tol;
        if needs_raise || needs_lower {
            let target = if needs_raise { prob.rlo[i] } else { prob.rup[i] };
            // candidate moves that push activity toward the target, cheapest
            // per unit of activity first
            let mut moves: Vec<(usize, E, E)> = cols
                .iter()
                .enumerate()
                .filter_map(|(idx, c)| {
                    let cj = prob.maxmin * c.cost;
                    let toward_upper = needs_raise == (c.coef > 0.0);
                    let room = if toward_upper {
                        c.upper - c.value
                    } else {
                        c.value - c.lower
                    };
                    if room <= 0.0 {
                        return None;
                    }
                    let gain = c.coef.abs() * room;
                    let rate = if needs_raise { cj / c.coef } else { -cj / c.coef };
                    Some((idx, rate, gain))
                })
                .collect();
            moves.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

            let mut deficit = (target - activity).abs();
            for (idx, rate, gain) in moves {
                if deficit <= prob.feas_tol {
                    break;
                }
                let c = &mut cols[idx];
                let toward_upper = needs_raise == (c.coef > 0.0);
                let step = gain.min(deficit);
                let delta = step / c.coef.abs();
                c.value += if toward_upper { delta } else { -delta };
                deficit -= step;
                // the last variable moved prices the row, and stays basic
                // even when the move lands exactly on its bound
                basic_col = Some(c.col);
                dual = if needs_raise { rate } else { -rate };
            }
            if deficit > prob.feas_tol {
                prob.status = PresolveStatus::Infeasible;
                return;
            }
        }

        for c in &cols {
            prob.sol[c.col] = c.value;
            prob.dobias += c.cost * c.value;
            prob.cost[c.col] = 0.0;
        }
        actions.push(
            IsolatedConstraint {
                row: i,
                rlo: prob.rlo[i],
                rup: prob.rup[i],
                entries: cols,
                basic_col,
                dual,
            }
            .into(),
        );
        let col_ids: Vec<I> = entries.iter().map(|&(j, _)| j).collect();
        prob.remove_row(i);
        for j in col_ids {
            prob.remove_col(j);
        }
    }
}

impl Postsolve for IsolatedConstraint {
    fn name(&self) -> &'static str {
        "isolated_constraint"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let i = self.row;
        let mut activity = 0.0;
        for c in &self.entries {
            prob.restore_column(c.col, &[(i, c.coef)]);
            prob.clo[c.col] = c.lower;
            prob.cup[c.col] = c.upper;
            prob.cost[c.col] = prob.maxmin * c.cost;
            prob.sol[c.col] = c.value;
            prob.rcosts[c.col] = prob.maxmin * c.cost - self.dual * c.coef;
            activity += c.coef * c.value;
            if self.basic_col == Some(c.col) {
                prob.set_col_status(c.col, Status::Basic);
            } else if (c.value - c.lower).abs() <= prob.ztolzb {
                prob.set_col_status(c.col, Status::AtLower);
            } else {
                prob.set_col_status(c.col, Status::AtUpper);
            }
            prob.cdone[c.col] = true;
        }
        prob.rlo[i] = self.rlo;
        prob.rup[i] = self.rup;
        prob.acts[i] = activity;
        prob.rowduals[i] = self.dual;
        if self.dual.abs() <= prob.ztoldj {
            prob.set_row_status(i, Status::Basic);
        } else if self.basic_col.is_some() {
            prob.set_row_status(
                i,
                if self.dual > 0.0 { Status::AtLower } else { Status::AtUpper },
            );
        } else {
            // degenerate: the last move landed exactly on a bound; keep the
            // row basic so the basis count stays right
            prob.rowduals[i] = 0.0;
            prob.set_row_status(i, Status::Basic);
        }
        prob.rdone[i] = true;
    }
}
