//! The presolve orchestrator.
//!
//! Owns the original problem reference, the reduced clone, the action log
//! and the index remaps for one presolve/postsolve round. Also owns the
//! integer round trip: after a successful presolve, surviving integer
//! columns get their bounds snapped to integers; tightenings are pushed
//! back into the *original* model and the whole presolve restarts.

use problemo::{common::IntoCommonProblem, Problem};

use crate::actions::PresolveAction;
use crate::interface::basis::WarmStartBasis;
use crate::interface::SolverInterface;
use crate::matrix::postsolve::PostsolveMatrix;
use crate::matrix::presolve::PresolveMatrix;
use crate::messages::{MessageHandler, PresolveMessage, PrintingHandler};
use crate::{pipeline, postsolve, E, I, PresolveStatus, INT_FEAS_TOL, INT_SNAP_TOL};

/// Default bound on the number of major passes.
pub const DEFAULT_PASSES: usize = 5;

pub struct Presolve<'a> {
    original: &'a mut (dyn SolverInterface + 'static),
    reduced: Option<Box<dyn SolverInterface>>,
    actions: Vec<PresolveAction>,
    original_column: Vec<I>,
    original_row: Vec<I>,
    ncols0: I,
    nrows0: I,
    nelems0: I,
    maxmin: E,
    original_offset: E,
    nonlinear_value: E,
    handler: Box<dyn MessageHandler>,
}

impl<'a> Presolve<'a> {
    pub fn new(original: &'a mut (dyn SolverInterface + 'static)) -> Self {
        Presolve {
            original,
            reduced: None,
            actions: Vec::new(),
            original_column: Vec::new(),
            original_row: Vec::new(),
            ncols0: 0,
            nrows0: 0,
            nelems0: 0,
            maxmin: 1.0,
            original_offset: 0.0,
            nonlinear_value: 0.0,
            handler: Box::new(PrintingHandler),
        }
    }

    /// Replaces the diagnostic sink (stdout by default).
    pub fn set_message_handler(&mut self, handler: Box<dyn MessageHandler>) {
        self.handler = handler;
    }

    /// Coefficients exactly equal to this value flag their row and column as
    /// prohibited, keeping nonlinear terms out of every reduction.
    pub fn set_nonlinear_value(&mut self, value: E) {
        self.nonlinear_value = value;
    }

    /// Index of each surviving column in the original problem.
    pub fn original_columns(&self) -> &[I] {
        &self.original_column
    }

    /// Index of each surviving row in the original problem.
    pub fn original_rows(&self) -> &[I] {
        &self.original_row
    }

    /// The reduced problem from the last successful presolve.
    pub fn model(&mut self) -> Option<&mut (dyn SolverInterface + 'static)> {
        self.reduced.as_deref_mut()
    }

    /// Re-points the engine at a different (but structurally identical)
    /// original model without resetting the action log. The new model must
    /// match the old one in dimensions and element count.
    pub fn set_original_model(&mut self, model: &'a mut (dyn SolverInterface + 'static)) {
        assert!(
            model.num_cols() == self.ncols0
                && model.num_rows() == self.nrows0
                && model.num_elements() == self.nelems0,
            "replacement model must match the original's dimensions"
        );
        self.original = model;
    }

    /// Runs presolve and returns the reduced problem, or `None` when the
    /// problem was proven infeasible or unbounded (a diagnostic has been
    /// emitted and the action log destroyed).
    ///
    /// `keep_integers` false strips integrality from the clone before
    /// reducing it. Dual reductions are disabled whenever the original
    /// carries any integer column, regardless of `keep_integers`.
    pub fn presolved_model(
        &mut self,
        feas_tol: E,
        keep_integers: bool,
        number_passes: usize,
    ) -> Result<Option<&mut (dyn SolverInterface + 'static)>, Problem> {
        self.ncols0 = self.original.num_cols();
        self.nrows0 = self.original.num_rows();
        self.nelems0 = self.original.num_elements();
        self.maxmin = self.original.obj_sense();
        self.original_offset = self.original.obj_offset();
        self.actions.clear();
        self.reduced = None;

        let do_dual = !(0..self.ncols0).any(|j| self.original.is_integer(j));

        loop {
            let mut reduced = dyn_clone::clone_box(&*self.original);
            if !keep_integers {
                for j in 0..self.ncols0 {
                    reduced.set_integer(j, false);
                }
            }

            let mut prob = PresolveMatrix::new(&*reduced, feas_tol, self.nonlinear_value)?;
            prob.recompute_acts();

            self.actions.clear();
            pipeline::presolve(&mut prob, &mut self.actions, number_passes, do_dual);

            // double check that nothing slipped through
            if prob.status.is_feasible() {
                for j in 0..prob.ncols {
                    if prob.cup[j] < prob.clo[j] {
                        if prob.cup[j] < prob.clo[j] - INT_FEAS_TOL {
                            prob.status = PresolveStatus::Infeasible;
                        } else {
                            prob.cup[j] = prob.clo[j];
                        }
                    }
                }
                for i in 0..prob.nrows {
                    if prob.rup[i] < prob.rlo[i] {
                        if prob.rup[i] < prob.rlo[i] - INT_FEAS_TOL {
                            prob.status = PresolveStatus::Infeasible;
                        } else {
                            prob.rup[i] = prob.rlo[i];
                        }
                    }
                }
            }

            if !prob.status.is_feasible() {
                if prob.status == PresolveStatus::Infeasible {
                    // name the columns whose bounds crossed, if any
                    for j in 0..prob.ncols {
                        if prob.cup[j] < prob.clo[j] - INT_FEAS_TOL {
                            self.handler.message(&PresolveMessage::ColumnInfeasible {
                                col: prob.original_column[j],
                                lower: prob.clo[j],
                                upper: prob.cup[j],
                            });
                        }
                    }
                }
                match prob.status {
                    PresolveStatus::Infeasible => self.handler.message(&PresolveMessage::Infeasible {
                        tolerance: feas_tol,
                    }),
                    PresolveStatus::Unbounded => {
                        self.handler.message(&PresolveMessage::Unbounded)
                    }
                    _ => self
                        .handler
                        .message(&PresolveMessage::InfeasibleOrUnbounded),
                }
                self.actions.clear();
                return Ok(None);
            }

            // install the reduced problem into the clone
            let data = prob.to_problem_data();
            let integer = data.integer.clone();
            reduced.load_problem(data);
            for (j, &flag) in integer.iter().enumerate() {
                reduced.set_integer(j, flag);
            }
            reduced.set_obj_offset(self.original_offset - prob.dobias);
            reduced.set_col_solution(&prob.sol);
            let basis = WarmStartBasis::from_statuses(&prob.colstat, &prob.rowstat);
            reduced.set_warm_start(&basis);
            self.original_column = prob.original_column.clone();
            self.original_row = prob.original_row.clone();

            // snap integer bounds, pushing tightenings back to the original
            let mut changes = 0;
            let mut integer_infeasible = false;
            for j in 0..reduced.num_cols() {
                if !reduced.is_integer(j) {
                    continue;
                }
                let jorig = self.original_column[j];
                let lower0 = self.original.col_lower()[jorig];
                let upper0 = self.original.col_upper()[jorig];
                let lower = (reduced.col_lower()[j] - INT_SNAP_TOL).ceil();
                let upper = (reduced.col_upper()[j] + INT_SNAP_TOL).floor();
                reduced.set_col_bounds(j, lower, upper);
                if lower > upper + INT_FEAS_TOL {
                    changes += 1;
                    self.handler.message(&PresolveMessage::ColumnInfeasible {
                        col: jorig,
                        lower,
                        upper,
                    });
                    integer_infeasible = true;
                } else {
                    let mut new_lower0 = lower0;
                    let mut new_upper0 = upper0;
                    if lower > lower0 + INT_FEAS_TOL {
                        new_lower0 = lower;
                        changes += 1;
                    }
                    if upper < upper0 - INT_FEAS_TOL {
                        new_upper0 = upper;
                        changes += 1;
                    }
                    if new_lower0 != lower0 || new_upper0 != upper0 {
                        self.original.set_col_bounds(jorig, new_lower0, new_upper0);
                    }
                }
            }
            if changes > 0 {
                self.handler
                    .message(&PresolveMessage::IntegerModifications { count: changes });
            }
            if integer_infeasible {
                self.actions.clear();
                return Ok(None);
            }
            if changes > 0 {
                // bounds moved in the original model: start over
                continue;
            }

            self.handler.message(&PresolveMessage::Statistics {
                rows: reduced.num_rows(),
                row_delta: reduced.num_rows() as i64 - self.nrows0 as i64,
                cols: reduced.num_cols(),
                col_delta: reduced.num_cols() as i64 - self.ncols0 as i64,
                elements: reduced.num_elements(),
                element_delta: reduced.num_elements() as i64 - self.nelems0 as i64,
            });
            self.reduced = Some(reduced);
            return Ok(self.reduced.as_deref_mut());
        }
    }

    /// Rebuilds the original problem's solution from the solved reduced
    /// problem and writes primal, duals and (optionally) a full-size basis
    /// back into the original model.
    pub fn postsolve(&mut self, update_status: bool) -> Result<(), Problem> {
        let reduced = self
            .reduced
            .as_deref()
            .ok_or_else(|| "postsolve requires a successful presolve".gloss())?;

        if !reduced.is_proven_optimal() {
            self.handler.message(&PresolveMessage::NonOptimal);
        }

        let update_status = update_status && reduced.warm_start().is_some();
        let mut prob = PostsolveMatrix::new(
            reduced,
            self.ncols0,
            self.nrows0,
            self.nelems0,
            self.maxmin,
            update_status,
        )?;

        postsolve::run(&self.actions, &mut prob);
        debug_assert_eq!(
            prob.elements_in_use(),
            self.nelems0,
            "postsolve did not rebuild every original element"
        );

        let mut duals = prob.rowduals.clone();
        if self.maxmin < 0.0 {
            for y in duals.iter_mut() {
                *y = -*y;
            }
        }
        self.original.set_row_price(&duals);
        self.original.set_col_solution(&prob.sol);
        if update_status {
            let basis = WarmStartBasis::from_statuses(&prob.colstat, &prob.rowstat);
            self.original.set_warm_start(&basis);
        }
        Ok(())
    }
}
