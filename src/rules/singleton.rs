//! Slack doubletons: an equality row `a x + b s = rhs` whose second column
//! `s` appears nowhere else. The row defines `s`, so both the row and `s`
//! can be eliminated after folding `s`'s cost and bounds onto `x`.

use crate::actions::{Postsolve, PresolveAction};
use crate::interface::basis::Status;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules::divide_interval;
use crate::{E, I, PresolveStatus, ZTOLDP};

pub(crate) struct SlackDoubleton {
    pub row: I,
    pub slack_col: I,
    pub other_col: I,
    pub coef_other: E,
    pub coef_slack: E,
    pub rhs: E,
    pub other_lower: E,
    pub other_upper: E,
    pub other_cost: E,
    pub slack_lower: E,
    pub slack_upper: E,
    pub slack_cost: E,
}

/// One sweep over the row worklist. Returns whether anything was eliminated;
/// the driver keeps sweeping until quiescent.
pub(crate) fn slack_doubleton(
    prob: &mut PresolveMatrix,
    actions: &mut Vec<PresolveAction>,
) -> bool {
    let mut progressed = false;
    let rows: Vec<I> = prob.work.rows_to_do.clone();
    for i in rows {
        if !prob.status.is_feasible() {
            break;
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

        let slackish = |j: I, a: E| {
            prob.col_len[j] == 1
                && !prob.integer[j]
                && !prob.col_prohibited[j]
                && a.abs() > ZTOLDP
        };
        let (s, b, x, a) = if slackish(j2, a2) && (!slackish(j1, a1) || a2.abs() >= a1.abs()) {
            (j2, a2, j1, a1)
        } else if slackish(j1, a1) {
            (j1, a1, j2, a2)
        } else {
            continue;
        };
        if prob.col_prohibited[x] || a.abs() <= ZTOLDP {
            continue;
        }

        // a x = rhs - b s, so s's bounds induce bounds on x
        let (slo, sup) = (prob.clo[s], prob.cup[s]);
        let (bs_lo, bs_hi) = if b > 0.0 {
            (
                if prob.is_neg_inf(slo) { -prob.inf } else { b * slo },
                if prob.is_pos_inf(sup) { prob.inf } else { b * sup },
            )
        } else {
            (
                if prob.is_pos_inf(sup) { -prob.inf } else { b * sup },
                if prob.is_neg_inf(slo) { prob.inf } else { b * slo },
            )
        };
        let term_lo = if prob.is_pos_inf(bs_hi) { -prob.inf } else { rhs - bs_hi };
        let term_hi = if prob.is_neg_inf(bs_lo) { prob.inf } else { rhs - bs_lo };
        let (ilo, iup) = divide_interval(prob, term_lo, term_hi, a);

        let mut lo = prob.clo[x].max(ilo);
        let mut up = prob.cup[x].min(iup);
        if lo > up + prob.feas_tol {
            prob.status = PresolveStatus::Infeasible;
            return progressed;
        }
        if lo > up {
            let mid = 0.5 * (lo + up);
            lo = mid;
            up = mid;
        }

        actions.push(
            SlackDoubleton {
                row: i,
                slack_col: s,
                other_col: x,
                coef_other: a,
                coef_slack: b,
                rhs,
                other_lower: prob.clo[x],
                other_upper: prob.cup[x],
                other_cost: prob.cost[x],
                slack_lower: slo,
                slack_upper: sup,
                slack_cost: prob.cost[s],
            }
            .into(),
        );

        prob.cost[x] -= prob.cost[s] * a / b;
        prob.dobias += prob.cost[s] * rhs / b;
        prob.cost[s] = 0.0;
        prob.clo[x] = lo;
        prob.cup[x] = up;
        prob.sol[s] = (rhs - a * prob.sol[x]) / b;
        prob.remove_row(i);
        prob.remove_col(s);
        prob.mark_col_changed(x);
        progressed = true;
    }
    progressed
}

impl Postsolve for SlackDoubleton {
    fn name(&self) -> &'static str {
        "slack_doubleton"
    }

    fn postsolve(&self, prob: &mut PostsolveMatrix) {
        let (s, x, i) = (self.slack_col, self.other_col, self.row);
        let (a, b) = (self.coef_other, self.coef_slack);

        prob.clo[x] = self.other_lower;
        prob.cup[x] = self.other_upper;
        prob.cost[x] = prob.maxmin * self.other_cost;
        prob.clo[s] = self.slack_lower;
        prob.cup[s] = self.slack_upper;
        prob.cost[s] = prob.maxmin * self.slack_cost;

        prob.add_element(x, i, a);
        prob.restore_column(s, &[(i, b)]);

        prob.rlo[i] = self.rhs;
        prob.rup[i] = self.rhs;
        prob.sol[s] = (self.rhs - a * prob.sol[x]) / b;
        prob.acts[i] = self.rhs;

        // One of the pair turns basic against the restored row. The slack is
        // the natural choice, but if x ended up strictly inside its restored
        // bounds (it was sitting on a bound the slack induced), x must be the
        // basic one and the slack parks on its own bound.
        let xval = prob.sol[x];
        let at_lower =
            self.other_lower > -prob.inf && (xval - self.other_lower).abs() <= prob.ztolzb;
        let at_upper =
            self.other_upper < prob.inf && (xval - self.other_upper).abs() <= prob.ztolzb;
        let x_was_basic = prob.have_status && prob.colstat[x].is_basic();

        if at_lower || at_upper || x_was_basic {
            let y = prob.cost[s] / b;
            prob.rowduals[i] = y;
            prob.rcosts[s] = 0.0;
            prob.rcosts[x] = prob.reduced_cost_of(x);
            prob.set_col_status(s, Status::Basic);
            if !x_was_basic {
                prob.fix_col_status_at_bounds(x);
            }
        } else {
            // zero x's reduced cost instead
            prob.rowduals[i] = 0.0;
            let y = prob.reduced_cost_of(x) / a;
            prob.rowduals[i] = y;
            prob.rcosts[x] = 0.0;
            prob.rcosts[s] = prob.cost[s] - y * b;
            prob.set_col_status(x, Status::Basic);
            let sval = prob.sol[s];
            if self.slack_lower > -prob.inf && (sval - self.slack_lower).abs() <= prob.ztolzb {
                prob.set_col_status(s, Status::AtLower);
            } else if self.slack_upper < prob.inf
                && (sval - self.slack_upper).abs() <= prob.ztolzb
            {
                prob.set_col_status(s, Status::AtUpper);
            } else {
                prob.set_col_status(s, Status::SuperBasic);
            }
        }
        prob.set_row_status(i, Status::AtLower);

        prob.cdone[s] = true;
        prob.rdone[i] = true;
    }
}
