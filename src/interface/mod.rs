//! The solver surface consumed by the engine.
//!
//! The presolver never owns the "real" problem; it reads and writes it
//! through [`SolverInterface`]. Any LP/MIP solver wrapper can implement the
//! trait; [`LpModel`](model::LpModel) is the crate's own implementation used
//! for tests and for handing problems to faer-based solvers.

use dyn_clone::DynClone;

use crate::interface::basis::WarmStartBasis;
use crate::interface::model::ProblemData;
use crate::{E, I, PresolveStatus};

pub mod basis;
pub mod model;

/// Problem I/O and warm-start surface of an LP/MIP solver.
///
/// The matrix is exposed column-major with explicit starts *and* lengths so
/// implementations may keep gaps between columns; `col_starts` has
/// `num_cols() + 1` entries. The engine clones the problem before reducing
/// it, hence the [`DynClone`] bound.
///
/// Callers must not mutate the model between
/// [`Presolve::presolved_model`](crate::Presolve::presolved_model) and
/// [`Presolve::postsolve`](crate::Presolve::postsolve).
pub trait SolverInterface: DynClone {
    fn num_cols(&self) -> I;
    fn num_rows(&self) -> I;
    fn num_elements(&self) -> I;

    fn col_lower(&self) -> &[E];
    fn col_upper(&self) -> &[E];
    fn objective(&self) -> &[E];
    fn row_lower(&self) -> &[E];
    fn row_upper(&self) -> &[E];
    fn is_integer(&self, col: I) -> bool;

    fn col_starts(&self) -> &[I];
    fn col_lengths(&self) -> &[I];
    fn row_indices(&self) -> &[I];
    fn elements(&self) -> &[E];

    fn col_solution(&self) -> &[E];
    fn row_activity(&self) -> &[E];
    fn row_price(&self) -> &[E];
    fn reduced_cost(&self) -> &[E];
    fn warm_start(&self) -> Option<&WarmStartBasis>;

    /// `+1` minimize, `-1` maximize.
    fn obj_sense(&self) -> E;
    /// Constant subtracted from `c^T x` when reporting objective values.
    fn obj_offset(&self) -> E;
    /// Primal feasibility tolerance; `None` is a configuration error.
    fn primal_tolerance(&self) -> Option<E>;
    /// Dual feasibility tolerance; `None` is a configuration error.
    fn dual_tolerance(&self) -> Option<E>;
    fn is_proven_optimal(&self) -> bool;

    fn set_col_bounds(&mut self, col: I, lower: E, upper: E);
    fn set_col_solution(&mut self, solution: &[E]);
    fn set_row_price(&mut self, duals: &[E]);
    fn set_warm_start(&mut self, basis: &WarmStartBasis);
    fn set_obj_offset(&mut self, offset: E);
    fn set_integer(&mut self, col: I, integer: bool);
    fn set_problem_status(&mut self, status: PresolveStatus);
    fn set_iteration_count(&mut self, iterations: usize);
    /// Replaces the whole problem; used to install the reduced problem into
    /// the clone handed back to the caller.
    fn load_problem(&mut self, data: ProblemData);
}

dyn_clone::clone_trait_object!(SolverInterface);
