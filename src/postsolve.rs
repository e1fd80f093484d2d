//! Reverse traversal of the action log.
//!
//! Records run newest-first; each undo sees the problem exactly as it was
//! the moment its transform fired. Property checks equivalent to the
//! original's `check_sol`/`check_nbasic` run between records in debug
//! builds.

use crate::actions::{Postsolve, PresolveAction};
use crate::matrix::postsolve::PostsolveMatrix;

pub(crate) fn run(actions: &[PresolveAction], prob: &mut PostsolveMatrix) {
    for action in actions.iter().rev() {
        action.postsolve(prob);
        if cfg!(debug_assertions) {
            check_sol(prob, action.name());
        }
    }
    if cfg!(debug_assertions) {
        prob.check_free_list();
        if prob.have_status {
            debug_assert_eq!(
                prob.num_basic(),
                prob.nrows0,
                "postsolve lost track of the basis"
            );
        }
    }
}

/// Sanity check on the partially rebuilt solution: finite values, and
/// restored columns inside their restored bounds (loosely, the way the
/// original's debug checks do).
fn check_sol(prob: &PostsolveMatrix, after: &'static str) {
    let slack = 1.0;
    for j in 0..prob.ncols0 {
        if !prob.cdone[j] {
            continue;
        }
        let x = prob.sol[j];
        assert!(
            x.is_finite() && x.abs() < prob.inf,
            "solution for column {j} broke after undoing {after}"
        );
        if prob.clo[j] > -prob.inf && x < prob.clo[j] - slack {
            panic!("column {j} fell below its bound after undoing {after}");
        }
        if prob.cup[j] < prob.inf && x > prob.cup[j] + slack {
            panic!("column {j} rose above its bound after undoing {after}");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::PresolveAction;
    use crate::matrix::postsolve::PostsolveMatrix;
    use crate::rules::fixed::FixedVariable;
    use crate::tests::fixtures::reduced_lp;

    #[test]
    fn records_run_newest_first() {
        // Two fixed-variable records for the same column: the newer one (for
        // a later transform) must be undone first, so the older one's value
        // is what survives.
        let model = reduced_lp();
        let mut prob = PostsolveMatrix::new(&model, 4, 2, 4, 1.0, false).unwrap();
        let actions = vec![
            PresolveAction::FixedVariable(FixedVariable {
                col: 3,
                value: 7.0,
                cost: 0.0,
                elements: vec![],
            }),
            PresolveAction::FixedVariable(FixedVariable {
                col: 3,
                value: 9.0,
                cost: 0.0,
                elements: vec![],
            }),
        ];
        super::run(&actions, &mut prob);
        assert_eq!(prob.sol[3], 7.0);
    }
}
