//! End-to-end presolve/solve-by-hand/postsolve scenarios.
//!
//! Each test plays the external solver: it reads the reduced problem the
//! engine hands back, installs a hand-computed optimal solution, and lets
//! postsolve reconstruct the original-space answer.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use rstest_reuse::{apply, template};

use crate::interface::basis::{Status, WarmStartBasis};
use crate::interface::model::ProblemData;
use crate::messages::{MessageHandler, PresolveMessage};
use crate::tests::fixtures::lp_model;
use crate::{
    E, LpModel, Presolve, PresolveStatus, SolverInterface, PRESOLVE_INF,
};

#[derive(Clone, Default)]
struct SharedRecorder(Rc<RefCell<Vec<PresolveMessage>>>);

impl MessageHandler for SharedRecorder {
    fn message(&mut self, message: &PresolveMessage) {
        self.0.borrow_mut().push(message.clone());
    }
}

fn mark_solved(
    reduced: &mut dyn SolverInterface,
    sol: &[E],
    duals: &[E],
    basis: Option<(&[Status], &[Status])>,
) {
    reduced.set_col_solution(sol);
    reduced.set_row_price(duals);
    if let Some((cols, rows)) = basis {
        reduced.set_warm_start(&WarmStartBasis::from_statuses(cols, rows));
    }
    reduced.set_problem_status(PresolveStatus::Feasible);
    reduced.set_iteration_count(1);
}

/// Primal feasibility and complementary slackness of a minimize model
/// against its own stored solution and duals.
fn assert_optimal_minimize(model: &LpModel, feas: E, dual_tol: E) {
    let x = model.col_solution();
    for j in 0..model.num_cols() {
        let (lo, hi) = (model.col_lower()[j], model.col_upper()[j]);
        if lo > -PRESOLVE_INF {
            assert!(x[j] >= lo - feas, "column {j} below its lower bound");
        }
        if hi < PRESOLVE_INF {
            assert!(x[j] <= hi + feas, "column {j} above its upper bound");
        }
        // interior columns must have vanishing reduced cost
        let interior = (lo <= -PRESOLVE_INF || x[j] > lo + feas)
            && (hi >= PRESOLVE_INF || x[j] < hi - feas);
        if interior {
            assert!(
                model.reduced_cost()[j].abs() <= dual_tol,
                "interior column {j} has nonzero reduced cost"
            );
        }
    }
    let acts = model.row_activity();
    for i in 0..model.num_rows() {
        let (lo, hi) = (model.row_lower()[i], model.row_upper()[i]);
        if lo > -PRESOLVE_INF {
            assert!(acts[i] >= lo - feas, "row {i} below its lower side");
        }
        if hi < PRESOLVE_INF {
            assert!(acts[i] <= hi + feas, "row {i} above its upper side");
        }
        // a slack row must carry a zero dual
        if (lo <= -PRESOLVE_INF || acts[i] > lo + feas)
            && (hi >= PRESOLVE_INF || acts[i] < hi - feas)
        {
            assert!(
                model.row_price()[i].abs() <= dual_tol,
                "inactive row {i} has nonzero dual"
            );
        }
    }
}

#[template]
#[rstest]
fn pass_counts(#[values(1, 5)] passes: usize) {}

#[apply(pass_counts)]
fn fixed_variable_round_trip(passes: usize) {
    // min x1 + x2  s.t.  x1 + x2 = 3, x1 fixed at 1, 0 <= x2 <= 5
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(3.0, 3.0)],
        &[(1.0, 1.0), (0.0, 5.0)],
        &[1.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, passes)
        .unwrap()
        .expect("feasible problem");

    // the whole problem dissolves; the reduced objective already carries it
    assert_eq!(reduced.num_cols(), 0);
    assert_eq!(reduced.num_rows(), 0);
    assert_eq!(reduced.obj_offset(), -3.0);

    mark_solved(reduced, &[], &[], Some((&[], &[])));
    engine.postsolve(true).unwrap();

    assert_eq!(model.col_solution(), &[1.0, 2.0]);
    assert_eq!(model.row_price(), &[1.0]);
    assert_eq!(model.reduced_cost(), &[0.0, 0.0]);
    assert!((model.objective_value() - 3.0).abs() < 1e-6);
    assert_eq!(model.warm_start().unwrap().num_basic(), 1);
    assert_optimal_minimize(&model, 1e-8, 1e-7);
}

#[apply(pass_counts)]
fn doubleton_round_trip(passes: usize) {
    // min x + y  s.t.  x + 2y = 4,  x <= 3,  y <= 1.5,  x, y in [0, 10].
    // The extra singleton rows keep both columns non-singleton so the
    // doubleton rule (not the slack rule) eliminates y.
    let mut model = lp_model(
        &[&[1.0, 2.0], &[1.0, 0.0], &[0.0, 1.0]],
        &[(4.0, 4.0), (-1e30, 3.0), (-1e30, 1.5)],
        &[(0.0, 10.0), (0.0, 10.0)],
        &[1.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, passes)
        .unwrap()
        .expect("feasible problem");

    // one column (x) and two singleton rows survive
    assert_eq!(reduced.num_cols(), 1);
    assert_eq!(reduced.num_rows(), 2);
    assert_eq!(reduced.col_lower(), &[0.0]);
    assert_eq!(reduced.col_upper(), &[4.0]);

    // optimal: x = 1 (the rewritten y-row forces x >= 1), basic
    mark_solved(
        reduced,
        &[1.0],
        &[0.0, -1.0],
        Some((&[Status::Basic], &[Status::Basic, Status::AtUpper])),
    );
    engine.postsolve(true).unwrap();

    assert_eq!(model.col_solution(), &[1.0, 1.5]);
    assert!((model.objective_value() - 2.5).abs() < 1e-6);
    // the equality row got its dual back through dj(y) = 0
    assert_eq!(model.row_price(), &[1.0, 0.0, -1.0]);
    assert_eq!(model.warm_start().unwrap().num_basic(), 3);
    assert_optimal_minimize(&model, 1e-8, 1e-7);
}

#[test]
fn forcing_round_trip_patches_duals() {
    // min -x + 2y  s.t.  x + y <= 0,  x, y >= 0: forcing pins both at zero.
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(-1e30, 0.0)],
        &[(0.0, 1e30), (0.0, 1e30)],
        &[-1.0, 2.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");
    assert_eq!(reduced.num_cols(), 0);
    assert_eq!(reduced.num_rows(), 0);

    mark_solved(reduced, &[], &[], Some((&[], &[])));
    engine.postsolve(true).unwrap();

    assert_eq!(model.col_solution(), &[0.0, 0.0]);
    // the negative cost on x forces a nonzero dual onto the restored row
    assert_eq!(model.row_price(), &[-1.0]);
    assert_eq!(model.reduced_cost(), &[0.0, 3.0]);
    assert_eq!(model.warm_start().unwrap().num_basic(), 1);
    assert_optimal_minimize(&model, 1e-8, 1e-7);
}

#[test]
fn duplicate_columns_split_on_postsolve() {
    // min x1 + x2  s.t.  x1 + x2 >= 1,  x1 in [0, 2], x2 in [0, 3]
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(1.0, 1e30)],
        &[(0.0, 2.0), (0.0, 3.0)],
        &[1.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");

    assert_eq!(reduced.num_cols(), 1);
    assert_eq!(reduced.col_upper(), &[5.0]);

    mark_solved(
        reduced,
        &[1.0],
        &[1.0],
        Some((&[Status::Basic], &[Status::AtLower])),
    );
    engine.postsolve(true).unwrap();

    // merged value 1 splits with the copy parked at its lower bound
    assert_eq!(model.col_solution(), &[1.0, 0.0]);
    assert_eq!(model.row_price(), &[1.0]);
    assert_eq!(model.warm_start().unwrap().num_basic(), 1);
    assert!((model.objective_value() - 1.0).abs() < 1e-6);
    assert_optimal_minimize(&model, 1e-8, 1e-7);
}

#[test]
fn integer_tightening_restarts_and_updates_original() {
    // min x + z  s.t.  x + z >= 3.4,  x integer in [0.3, 2.7], z in [0, 10]
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(3.4, 1e30)],
        &[(0.3, 2.7), (0.0, 10.0)],
        &[1.0, 1.0],
    );
    model.mark_integer(0);
    let recorder = SharedRecorder::default();
    let messages = recorder.0.clone();

    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(recorder));
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");

    // both snapped bounds were pushed back and presolve restarted
    assert_eq!(reduced.col_lower()[0], 1.0);
    assert_eq!(reduced.col_upper()[0], 2.0);
    assert!(messages
        .borrow()
        .contains(&PresolveMessage::IntegerModifications { count: 2 }));

    mark_solved(
        reduced,
        &[1.0, 2.4],
        &[1.0],
        Some((&[Status::AtLower, Status::Basic], &[Status::AtLower])),
    );
    engine.postsolve(true).unwrap();

    // the original model's integer bounds were tightened in place
    assert_eq!(model.col_lower()[0], 1.0);
    assert_eq!(model.col_upper()[0], 2.0);
    assert_eq!(model.col_solution(), &[1.0, 2.4]);
    let x = model.col_solution()[0];
    assert!((x - x.round()).abs() <= 1e-5, "integer variable drifted");
    assert_optimal_minimize(&model, 1e-8, 1e-7);
}

#[test]
fn crossed_bounds_report_infeasible_and_leave_model_alone() {
    let mut model = lp_model(
        &[&[1.0]],
        &[(-1e30, 10.0)],
        &[(5.0, 3.0)],
        &[1.0],
    );
    let recorder = SharedRecorder::default();
    let messages = recorder.0.clone();

    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(recorder));
    let result = engine.presolved_model(1e-8, true, 5).unwrap();
    assert!(result.is_none());

    let messages = messages.borrow();
    assert!(messages.iter().any(|m| matches!(
        m,
        PresolveMessage::ColumnInfeasible { col: 0, .. }
    )));
    assert!(messages
        .iter()
        .any(|m| matches!(m, PresolveMessage::Infeasible { .. })));
    drop(messages);

    assert_eq!(model.col_lower(), &[5.0]);
    assert_eq!(model.col_upper(), &[3.0]);
}

#[test]
fn slightly_crossed_bounds_snap_instead_of_failing() {
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(0.0, 10.0)],
        &[(1.0, 1.0 - 1e-9), (0.0, 4.0)],
        &[0.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine.presolved_model(1e-8, true, 5).unwrap();
    assert!(reduced.is_some());
}

#[test]
fn maximization_negates_duals_across_the_boundary() {
    // max x + y  s.t.  x + 2y = 4, x, y in [0, 10]: optimum x = 4, y = 0.
    let mut model = lp_model(
        &[&[1.0, 2.0]],
        &[(4.0, 4.0)],
        &[(0.0, 10.0), (0.0, 10.0)],
        &[1.0, 1.0],
    );
    model.set_obj_sense(-1.0);
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");
    // fully reduced; offset carries the whole objective
    assert_eq!(reduced.num_cols(), 0);
    assert_eq!(reduced.obj_offset(), -4.0);

    mark_solved(reduced, &[], &[], Some((&[], &[])));
    engine.postsolve(true).unwrap();

    assert_eq!(model.col_solution(), &[4.0, 0.0]);
    assert!((model.objective_value() - 4.0).abs() < 1e-6);
    // maximize convention: the equality row's dual comes back positive
    assert_eq!(model.row_price(), &[1.0]);
    assert_eq!(model.warm_start().unwrap().num_basic(), 1);
}

#[test]
fn empty_problem_round_trips() {
    let mut model = LpModel::new(ProblemData::empty()).unwrap();
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("trivially feasible");
    assert_eq!(reduced.num_cols(), 0);
    mark_solved(reduced, &[], &[], None);
    engine.postsolve(false).unwrap();
}

#[test]
fn presolve_is_idempotent_on_its_own_output() {
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(1.0, 1e30)],
        &[(0.0, 2.0), (0.0, 3.0)],
        &[1.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");
    let reduced = engine.model().unwrap();
    let (cols, rows, elements) = (
        reduced.num_cols(),
        reduced.num_rows(),
        reduced.num_elements(),
    );

    let mut second = Presolve::new(reduced);
    second.set_message_handler(Box::new(SharedRecorder::default()));
    let twice = second
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("still feasible");
    assert_eq!(twice.num_cols(), cols);
    assert_eq!(twice.num_rows(), rows);
    assert_eq!(twice.num_elements(), elements);
}

#[test]
fn postsolve_before_presolve_is_an_error() {
    let mut model = LpModel::new(ProblemData::empty()).unwrap();
    let mut engine = Presolve::new(&mut model);
    assert!(engine.postsolve(true).is_err());
}

#[test]
#[should_panic(expected = "replacement model must match")]
fn set_original_model_checks_dimensions() {
    let mut model = lp_model(
        &[&[1.0, 1.0]],
        &[(0.0, 1.0)],
        &[(0.0, 1.0), (0.0, 1.0)],
        &[1.0, 1.0],
    );
    let mut other = LpModel::new(ProblemData::empty()).unwrap();
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    engine.presolved_model(1e-8, true, 5).unwrap();
    engine.set_original_model(&mut other);
}

#[test]
fn prohibited_columns_survive_untouched() {
    // x0 is fixed, but its only coefficient equals the nonlinear sentinel:
    // the whole column and its row must come through unreduced.
    let mut model = lp_model(
        &[&[7.5, 1.0]],
        &[(0.0, 10.0)],
        &[(2.0, 2.0), (0.0, 4.0)],
        &[1.0, 1.0],
    );
    let mut engine = Presolve::new(&mut model);
    engine.set_message_handler(Box::new(SharedRecorder::default()));
    engine.set_nonlinear_value(7.5);
    let reduced = engine
        .presolved_model(1e-8, true, 5)
        .unwrap()
        .expect("feasible problem");
    assert_eq!(reduced.num_cols(), 2);
    assert_eq!(reduced.num_rows(), 1);
    assert_eq!(reduced.col_lower(), &[2.0, 0.0]);
}
