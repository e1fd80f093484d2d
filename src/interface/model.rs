//! Self-contained [`SolverInterface`] implementation.
//!
//! [`LpModel`] keeps the whole problem in plain column-major arrays and
//! implements every getter and write-back the engine needs. It doubles as the
//! bridge to the faer-based solver stack: problems can be built from faer
//! triplets/vectors and the reduced problem can be loaded back into one.

use derive_more::{Display, Error};
use faer::sparse::{SparseColMat, Triplet};
use faer::Col;
use problemo::{common::IntoCommonProblem, Problem, ProblemResult};
use serde::{Deserialize, Serialize};

use crate::interface::basis::WarmStartBasis;
use crate::interface::SolverInterface;
use crate::{E, I, PresolveStatus, PRESOLVE_INF};

#[derive(Debug, Display, Error, PartialEq)]
pub enum ModelError {
    #[display("Unable to assemble the sparse constraint matrix")]
    Matrix,
}

/// Full column-major problem description, the payload of
/// [`SolverInterface::load_problem`].
///
/// `col_starts` has `ncols + 1` entries and the representation is gap-free.
/// `obj_offset` is the constant subtracted from `c^T x` when the objective
/// value is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemData {
    pub ncols: I,
    pub nrows: I,
    pub col_starts: Vec<I>,
    pub row_indices: Vec<I>,
    pub elements: Vec<E>,
    pub col_lower: Vec<E>,
    pub col_upper: Vec<E>,
    pub objective: Vec<E>,
    pub row_lower: Vec<E>,
    pub row_upper: Vec<E>,
    pub integer: Vec<bool>,
    pub obj_sense: E,
    pub obj_offset: E,
}

impl ProblemData {
    /// An empty problem with no rows, columns or elements.
    pub fn empty() -> Self {
        ProblemData {
            ncols: 0,
            nrows: 0,
            col_starts: vec![0],
            row_indices: Vec::new(),
            elements: Vec::new(),
            col_lower: Vec::new(),
            col_upper: Vec::new(),
            objective: Vec::new(),
            row_lower: Vec::new(),
            row_upper: Vec::new(),
            integer: Vec::new(),
            obj_sense: 1.0,
            obj_offset: 0.0,
        }
    }

    fn check(self) -> Result<Self, Problem> {
        let ok = self.col_starts.len() == self.ncols + 1
            && self.col_lower.len() == self.ncols
            && self.col_upper.len() == self.ncols
            && self.objective.len() == self.ncols
            && self.integer.len() == self.ncols
            && self.row_lower.len() == self.nrows
            && self.row_upper.len() == self.nrows
            && self.row_indices.len() == self.elements.len()
            && self.col_starts.last().copied() == Some(self.elements.len())
            && self.row_indices.iter().all(|&i| i < self.nrows);
        if ok {
            Ok(self)
        } else {
            Err("problem data arrays have inconsistent lengths".gloss())
        }
    }
}

/// In-memory LP/MIP with solver-side state (solution, duals, basis, status).
///
/// Reduced costs are derived, not stored by the caller: setting row prices
/// recomputes `c - A^T y`, and setting a column solution recomputes row
/// activities, so the model stays internally consistent however the "solver"
/// (often a test) drives it.
#[derive(Debug, Clone)]
pub struct LpModel {
    data: ProblemData,
    col_lengths: Vec<I>,
    solution: Vec<E>,
    activity: Vec<E>,
    duals: Vec<E>,
    rcosts: Vec<E>,
    basis: Option<WarmStartBasis>,
    status: PresolveStatus,
    iterations: usize,
    primal_tol: Option<E>,
    dual_tol: Option<E>,
}

impl LpModel {
    pub fn new(data: ProblemData) -> Result<Self, Problem> {
        let data = data.check()?;
        let ncols = data.ncols;
        let nrows = data.nrows;
        let col_lengths = (0..ncols)
            .map(|j| data.col_starts[j + 1] - data.col_starts[j])
            .collect();
        Ok(LpModel {
            data,
            col_lengths,
            solution: vec![0.0; ncols],
            activity: vec![0.0; nrows],
            duals: vec![0.0; nrows],
            rcosts: vec![0.0; ncols],
            basis: None,
            status: PresolveStatus::Unknown,
            iterations: 0,
            primal_tol: Some(1e-7),
            dual_tol: Some(1e-7),
        })
    }

    /// Builds a model from faer triplets and bound/objective vectors, the
    /// same ingredients the rest of the solver stack works with.
    #[allow(clippy::too_many_arguments)]
    pub fn try_from_triplets(
        nrows: I,
        ncols: I,
        triplets: &[Triplet<I, I, E>],
        objective: Col<E>,
        row_lower: Col<E>,
        row_upper: Col<E>,
        col_lower: Col<E>,
        col_upper: Col<E>,
    ) -> Result<Self, Problem> {
        let a = SparseColMat::try_new_from_triplets(nrows, ncols, triplets)
            .via(ModelError::Matrix)?;
        Ok(Self::from_sparse(
            objective, a, row_lower, row_upper, col_lower, col_upper,
        ))
    }

    /// Builds a continuous model around an existing faer matrix.
    pub fn from_sparse(
        objective: Col<E>,
        a: SparseColMat<I, E>,
        row_lower: Col<E>,
        row_upper: Col<E>,
        col_lower: Col<E>,
        col_upper: Col<E>,
    ) -> Self {
        let ncols = a.ncols();
        let nrows = a.nrows();
        let data = ProblemData {
            ncols,
            nrows,
            col_starts: a.symbolic().col_ptr().to_vec(),
            row_indices: a.symbolic().row_idx().to_vec(),
            elements: a.val().to_vec(),
            col_lower: (0..ncols).map(|j| col_lower[j]).collect(),
            col_upper: (0..ncols).map(|j| col_upper[j]).collect(),
            objective: (0..ncols).map(|j| objective[j]).collect(),
            row_lower: (0..nrows).map(|i| row_lower[i]).collect(),
            row_upper: (0..nrows).map(|i| row_upper[i]).collect(),
            integer: vec![false; ncols],
            obj_sense: 1.0,
            obj_offset: 0.0,
        };
        LpModel::new(data).expect("matrix dimensions are consistent by construction")
    }

    pub fn data(&self) -> &ProblemData {
        &self.data
    }

    pub fn set_obj_sense(&mut self, sense: E) {
        self.data.obj_sense = sense;
    }

    pub fn mark_integer(&mut self, col: I) {
        self.data.integer[col] = true;
    }

    /// Overrides the advertised tolerances; `None` simulates a solver that
    /// fails to supply one.
    pub fn set_tolerances(&mut self, primal: Option<E>, dual: Option<E>) {
        self.primal_tol = primal;
        self.dual_tol = dual;
    }

    /// Objective value of the stored solution, `c^T x - offset`.
    pub fn objective_value(&self) -> E {
        let dot: E = self
            .data
            .objective
            .iter()
            .zip(&self.solution)
            .map(|(c, x)| c * x)
            .sum();
        dot - self.data.obj_offset
    }

    fn recompute_activity(&mut self) {
        self.activity = vec![0.0; self.data.nrows];
        for j in 0..self.data.ncols {
            let start = self.data.col_starts[j];
            for k in start..start + self.col_lengths[j] {
                self.activity[self.data.row_indices[k]] += self.data.elements[k] * self.solution[j];
            }
        }
    }

    fn recompute_rcosts(&mut self) {
        self.rcosts = self.data.objective.clone();
        for j in 0..self.data.ncols {
            let start = self.data.col_starts[j];
            for k in start..start + self.col_lengths[j] {
                self.rcosts[j] -= self.duals[self.data.row_indices[k]] * self.data.elements[k];
            }
        }
    }
}

impl SolverInterface for LpModel {
    fn num_cols(&self) -> I {
        self.data.ncols
    }

    fn num_rows(&self) -> I {
        self.data.nrows
    }

    fn num_elements(&self) -> I {
        self.data.elements.len()
    }

    fn col_lower(&self) -> &[E] {
        &self.data.col_lower
    }

    fn col_upper(&self) -> &[E] {
        &self.data.col_upper
    }

    fn objective(&self) -> &[E] {
        &self.data.objective
    }

    fn row_lower(&self) -> &[E] {
        &self.data.row_lower
    }

    fn row_upper(&self) -> &[E] {
        &self.data.row_upper
    }

    fn is_integer(&self, col: I) -> bool {
        self.data.integer[col]
    }

    fn col_starts(&self) -> &[I] {
        &self.data.col_starts
    }

    fn col_lengths(&self) -> &[I] {
        &self.col_lengths
    }

    fn row_indices(&self) -> &[I] {
        &self.data.row_indices
    }

    fn elements(&self) -> &[E] {
        &self.data.elements
    }

    fn col_solution(&self) -> &[E] {
        &self.solution
    }

    fn row_activity(&self) -> &[E] {
        &self.activity
    }

    fn row_price(&self) -> &[E] {
        &self.duals
    }

    fn reduced_cost(&self) -> &[E] {
        &self.rcosts
    }

    fn warm_start(&self) -> Option<&WarmStartBasis> {
        self.basis.as_ref()
    }

    fn obj_sense(&self) -> E {
        self.data.obj_sense
    }

    fn obj_offset(&self) -> E {
        self.data.obj_offset
    }

    fn primal_tolerance(&self) -> Option<E> {
        self.primal_tol
    }

    fn dual_tolerance(&self) -> Option<E> {
        self.dual_tol
    }

    fn is_proven_optimal(&self) -> bool {
        self.status.is_feasible()
    }

    fn set_col_bounds(&mut self, col: I, lower: E, upper: E) {
        self.data.col_lower[col] = lower;
        self.data.col_upper[col] = upper;
    }

    fn set_col_solution(&mut self, solution: &[E]) {
        self.solution = solution.to_vec();
        self.solution.resize(self.data.ncols, 0.0);
        self.recompute_activity();
    }

    fn set_row_price(&mut self, duals: &[E]) {
        self.duals = duals.to_vec();
        self.duals.resize(self.data.nrows, 0.0);
        self.recompute_rcosts();
    }

    fn set_warm_start(&mut self, basis: &WarmStartBasis) {
        self.basis = Some(basis.clone());
    }

    fn set_obj_offset(&mut self, offset: E) {
        self.data.obj_offset = offset;
    }

    fn set_integer(&mut self, col: I, integer: bool) {
        self.data.integer[col] = integer;
    }

    fn set_problem_status(&mut self, status: PresolveStatus) {
        self.status = status;
    }

    fn set_iteration_count(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    fn load_problem(&mut self, data: ProblemData) {
        let ncols = data.ncols;
        let nrows = data.nrows;
        self.col_lengths = (0..ncols)
            .map(|j| data.col_starts[j + 1] - data.col_starts[j])
            .collect();
        self.data = data;
        self.solution = vec![0.0; ncols];
        self.activity = vec![0.0; nrows];
        self.duals = vec![0.0; nrows];
        self.rcosts = vec![0.0; ncols];
        self.basis = None;
        self.status = PresolveStatus::Unknown;
        self.iterations = 0;
    }
}

/// Convenience for tests and examples: bounds default to `[0, +inf)`.
pub fn default_bounds(n: I) -> (Col<E>, Col<E>) {
    (Col::zeros(n), Col::from_fn(n, |_| PRESOLVE_INF))
}
