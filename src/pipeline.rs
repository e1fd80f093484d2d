//! The fixed-point driver.
//!
//! Inexpensive transforms run to quiescence inside each major pass; the
//! expensive ones (dual analysis, duplicate detection) run once per pass.
//! The loop stops when a pass neither drops a row nor grows the action log,
//! or after `number_passes` passes. Cleanup transforms always run at the
//! end of a feasible presolve, even with zero passes.

use crate::actions::PresolveAction;
use crate::matrix::presolve::PresolveMatrix;
use crate::rules;
use crate::PresolveStatus;

pub(crate) fn presolve(
    prob: &mut PresolveMatrix,
    actions: &mut Vec<PresolveAction>,
    number_passes: usize,
    do_dual: bool,
) {
    prob.status = PresolveStatus::Feasible;

    rules::fixed::make_fixed(prob, actions);
    if !prob.status.is_feasible() {
        return;
    }

    prob.seed_worklists();

    let mut last_dropped = 0;
    for _pass in 0..number_passes {
        let head0 = actions.len();

        // inexpensive transforms until quiescent
        let fill_level = 2;
        loop {
            let head1 = actions.len();

            while rules::singleton::slack_doubleton(prob, actions) {
                if !prob.status.is_feasible() {
                    return;
                }
            }
            if !prob.status.is_feasible() {
                return;
            }

            rules::doubleton::doubleton(prob, actions);
            if !prob.status.is_feasible() {
                return;
            }

            rules::tighten::tighten(prob, actions);
            if !prob.status.is_feasible() {
                return;
            }

            rules::forcing::forcing_constraints(prob, actions);
            if !prob.status.is_feasible() {
                return;
            }

            rules::implied_free::implied_free(prob, actions, fill_level);
            if !prob.status.is_feasible() {
                return;
            }

            if cfg!(debug_assertions) {
                prob.assert_consistent();
            }

            prob.work.swap_buffers();
            if actions.len() == head1 && fill_level > 0 {
                break;
            }
        }

        prob.seed_worklists();

        if do_dual {
            for _ in 0..5 {
                let head2 = actions.len();
                rules::dual::remove_dual(prob, actions);
                if !prob.status.is_feasible() {
                    return;
                }
                rules::implied_free::implied_free(prob, actions, 0);
                if !prob.status.is_feasible() {
                    return;
                }
                if actions.len() == head2 {
                    break;
                }
            }
        }

        rules::dupcol::dupcol(prob, actions);
        if !prob.status.is_feasible() {
            return;
        }
        rules::dupcol::duprow(prob, actions);
        if !prob.status.is_feasible() {
            return;
        }

        let dropped = (0..prob.nrows).filter(|&i| prob.row_len[i] == 0).count();
        if dropped == last_dropped {
            break;
        }
        last_dropped = dropped;

        if actions.len() == head0 {
            break;
        }
    }

    rules::zeros::drop_zero_coefficients(prob, actions);
    if !prob.status.is_feasible() {
        return;
    }
    rules::empty::drop_empty_cols(prob, actions);
    if !prob.status.is_feasible() {
        return;
    }
    rules::empty::drop_empty_rows(prob, actions);
}
