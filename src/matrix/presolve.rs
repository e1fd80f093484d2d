//! In-place working matrix for the presolve phase.
//!
//! Column-major and row-major mirrors of the constraint matrix share a pair
//! of fixed arenas sized `2 * nelems0`. Vectors keep trailing gaps so they can
//! grow in place; when a vector runs out of gap it is detached from the
//! storage-order chain and re-appended after the tail (compacting the arena
//! first if even that space is gone).
//!
//! Two invariants hold at every pass boundary:
//! - every stored element appears exactly once in each mirror with the same
//!   value;
//! - for storage-order neighbours `a -> b`: `start[a] + len[a] <= start[b]`.

use problemo::{common::IntoCommonProblem, Problem};

use crate::interface::basis::Status;
use crate::interface::model::ProblemData;
use crate::interface::SolverInterface;
use crate::matrix::{StorageLink, NO_LINK};
use crate::worklist::Worklists;
use crate::{E, I, PresolveStatus, PRESOLVE_INF};

/// Problem state plus both matrix mirrors; the single mutable bundle every
/// reduction rule works on.
pub struct PresolveMatrix {
    // original dimensions
    pub(crate) ncols0: I,
    pub(crate) nrows0: I,
    pub(crate) nelems0: I,
    // current dimensions (differ from the originals only after the final
    // empty-column/empty-row compaction)
    pub(crate) ncols: I,
    pub(crate) nrows: I,

    // per-column state
    pub(crate) clo: Vec<E>,
    pub(crate) cup: Vec<E>,
    pub(crate) cost: Vec<E>,
    pub(crate) integer: Vec<bool>,
    pub(crate) sol: Vec<E>,
    pub(crate) colstat: Vec<Status>,

    // per-row state
    pub(crate) rlo: Vec<E>,
    pub(crate) rup: Vec<E>,
    pub(crate) acts: Vec<E>,
    pub(crate) rowstat: Vec<Status>,

    // scalars
    pub(crate) dobias: E,
    pub(crate) maxmin: E,
    pub(crate) original_offset: E,
    pub(crate) ztolzb: E,
    pub(crate) ztoldj: E,
    pub(crate) feas_tol: E,
    pub(crate) inf: E,
    pub(crate) status: PresolveStatus,

    // column-major store
    pub(crate) col_start: Vec<I>,
    pub(crate) col_len: Vec<I>,
    pub(crate) col_rows: Vec<I>,
    pub(crate) col_vals: Vec<E>,
    // row-major mirror
    pub(crate) row_start: Vec<I>,
    pub(crate) row_len: Vec<I>,
    pub(crate) row_cols: Vec<I>,
    pub(crate) row_vals: Vec<E>,

    pub(crate) clink: StorageLink,
    pub(crate) rlink: StorageLink,
    bufsize: I,

    pub(crate) work: Worklists,
    pub(crate) col_prohibited: Vec<bool>,
    pub(crate) row_prohibited: Vec<bool>,
    pub(crate) any_prohibited: bool,

    pub(crate) original_column: Vec<I>,
    pub(crate) original_row: Vec<I>,
}

impl PresolveMatrix {
    /// Snapshots the interface's problem into the working arenas.
    ///
    /// Fails if the interface does not supply primal/dual tolerances. When
    /// `nonlinear_value` is non-zero, any matrix or objective coefficient
    /// exactly equal to it marks its column (and the element's row) as
    /// prohibited, excluding them from every reduction.
    pub fn new(
        si: &dyn SolverInterface,
        feas_tol: E,
        nonlinear_value: E,
    ) -> Result<PresolveMatrix, Problem> {
        let ncols = si.num_cols();
        let nrows = si.num_rows();
        let nelems = si.num_elements();
        let bufsize = 2 * nelems;

        let ztolzb = si
            .primal_tolerance()
            .ok_or_else(|| "solver interface supplies no primal tolerance".gloss())?;
        let ztoldj = si
            .dual_tolerance()
            .ok_or_else(|| "solver interface supplies no dual tolerance".gloss())?;

        // gap-free copy of the column file
        let si_starts = si.col_starts();
        let si_lengths = si.col_lengths();
        let si_rows = si.row_indices();
        let si_vals = si.elements();

        let mut col_start = vec![0; ncols];
        let mut col_len = vec![0; ncols];
        let mut col_rows = vec![0; bufsize];
        let mut col_vals = vec![0.0; bufsize];
        let mut cursor = 0;
        for j in 0..ncols {
            col_start[j] = cursor;
            col_len[j] = si_lengths[j];
            for k in si_starts[j]..si_starts[j] + si_lengths[j] {
                col_rows[cursor] = si_rows[k];
                col_vals[cursor] = si_vals[k];
                cursor += 1;
            }
        }
        debug_assert_eq!(cursor, nelems);

        // row mirror by counting sort
        let mut row_len = vec![0; nrows];
        for k in 0..nelems {
            row_len[col_rows[k]] += 1;
        }
        let mut row_start = vec![0; nrows];
        let mut acc = 0;
        for i in 0..nrows {
            row_start[i] = acc;
            acc += row_len[i];
        }
        let mut row_cols = vec![0; bufsize];
        let mut row_vals = vec![0.0; bufsize];
        let mut fill = row_start.clone();
        for j in 0..ncols {
            for k in col_start[j]..col_start[j] + col_len[j] {
                let i = col_rows[k];
                row_cols[fill[i]] = j;
                row_vals[fill[i]] = col_vals[k];
                fill[i] += 1;
            }
        }

        let colstat;
        let rowstat;
        match si.warm_start() {
            Some(basis)
                if basis.num_structural() == ncols && basis.num_artificial() == nrows =>
            {
                colstat = (0..ncols).map(|j| basis.col_status(j)).collect();
                rowstat = (0..nrows).map(|i| basis.row_status(i)).collect();
            }
            _ => {
                colstat = vec![Status::AtLower; ncols];
                rowstat = vec![Status::Basic; nrows];
            }
        }

        let mut sol = si.col_solution().to_vec();
        sol.resize(ncols, 0.0);
        let mut acts = si.row_activity().to_vec();
        acts.resize(nrows, 0.0);

        let mut prob = PresolveMatrix {
            ncols0: ncols,
            nrows0: nrows,
            nelems0: nelems,
            ncols,
            nrows,
            clo: si.col_lower().to_vec(),
            cup: si.col_upper().to_vec(),
            cost: si.objective().to_vec(),
            integer: (0..ncols).map(|j| si.is_integer(j)).collect(),
            sol,
            colstat,
            rlo: si.row_lower().to_vec(),
            rup: si.row_upper().to_vec(),
            acts,
            rowstat,
            dobias: 0.0,
            maxmin: si.obj_sense(),
            original_offset: si.obj_offset(),
            ztolzb,
            ztoldj,
            feas_tol,
            inf: PRESOLVE_INF,
            status: PresolveStatus::Unknown,
            col_start,
            col_len,
            col_rows,
            col_vals,
            row_start,
            row_len,
            row_cols,
            row_vals,
            clink: StorageLink::in_order(ncols),
            rlink: StorageLink::in_order(nrows),
            bufsize,
            work: Worklists::new(nrows, ncols),
            col_prohibited: vec![false; ncols],
            row_prohibited: vec![false; nrows],
            any_prohibited: false,
            original_column: (0..ncols).collect(),
            original_row: (0..nrows).collect(),
        };

        if nonlinear_value != 0.0 {
            for j in 0..ncols {
                let mut nonlinear = prob.cost[j] == nonlinear_value;
                for k in prob.col_range(j) {
                    if prob.col_vals[k] == nonlinear_value {
                        nonlinear = true;
                        prob.row_prohibited[prob.col_rows[k]] = true;
                    }
                }
                if nonlinear {
                    prob.col_prohibited[j] = true;
                }
            }
            prob.any_prohibited = prob
                .col_prohibited
                .iter()
                .chain(prob.row_prohibited.iter())
                .any(|&p| p);
        }

        Ok(prob)
    }

    #[inline]
    pub(crate) fn col_range(&self, j: I) -> std::ops::Range<I> {
        self.col_start[j]..self.col_start[j] + self.col_len[j]
    }

    #[inline]
    pub(crate) fn row_range(&self, i: I) -> std::ops::Range<I> {
        self.row_start[i]..self.row_start[i] + self.row_len[i]
    }

    pub(crate) fn find_in_col(&self, j: I, i: I) -> Option<I> {
        self.col_range(j).find(|&k| self.col_rows[k] == i)
    }

    pub(crate) fn find_in_row(&self, i: I, j: I) -> Option<I> {
        self.row_range(i).find(|&k| self.row_cols[k] == j)
    }

    /// Coefficient `a_ij`, zero if the element is not stored.
    pub(crate) fn coeff(&self, i: I, j: I) -> E {
        self.find_in_row(i, j).map_or(0.0, |k| self.row_vals[k])
    }

    /// Snapshot of column `j` as `(row, value)` pairs.
    pub(crate) fn col_entries(&self, j: I) -> Vec<(I, E)> {
        self.col_range(j)
            .map(|k| (self.col_rows[k], self.col_vals[k]))
            .collect()
    }

    /// Snapshot of row `i` as `(col, value)` pairs.
    pub(crate) fn row_entries(&self, i: I) -> Vec<(I, E)> {
        self.row_range(i)
            .map(|k| (self.row_cols[k], self.row_vals[k]))
            .collect()
    }

    fn delete_from_col(&mut self, j: I, i: I) {
        let k = self.find_in_col(j, i).expect("element missing in column file");
        let last = self.col_start[j] + self.col_len[j] - 1;
        self.col_rows.swap(k, last);
        self.col_vals.swap(k, last);
        self.col_len[j] -= 1;
    }

    fn delete_from_row(&mut self, i: I, j: I) {
        let k = self.find_in_row(i, j).expect("element missing in row file");
        let last = self.row_start[i] + self.row_len[i] - 1;
        self.row_cols.swap(k, last);
        self.row_vals.swap(k, last);
        self.row_len[i] -= 1;
    }

    /// Removes `a_ij` from both mirrors.
    pub(crate) fn delete_element(&mut self, i: I, j: I) {
        self.delete_from_col(j, i);
        self.delete_from_row(i, j);
    }

    /// Deletes every element of row `i`, detaches it, and frees its sides.
    ///
    /// The caller is responsible for having logged whatever postsolve needs;
    /// afterwards the row is indistinguishable from a never-binding empty row.
    pub(crate) fn remove_row(&mut self, i: I) {
        for (j, _) in self.row_entries(i) {
            self.delete_from_col(j, i);
            self.mark_col_changed(j);
        }
        self.row_len[i] = 0;
        self.rlink.unlink(i);
        self.rlo[i] = -self.inf;
        self.rup[i] = self.inf;
    }

    /// Deletes every element of column `j` and detaches it. Bounds and cost
    /// are left alone; rules fold the cost and fix bounds as their record
    /// requires before calling this.
    pub(crate) fn remove_col(&mut self, j: I) {
        for (i, _) in self.col_entries(j) {
            self.delete_from_row(i, j);
            self.mark_row_changed(i);
        }
        self.col_len[j] = 0;
        self.clink.unlink(j);
    }

    /// Multiplies column `j` by `factor` in both mirrors.
    pub(crate) fn scale_col(&mut self, j: I, factor: E) {
        for k in self.col_range(j) {
            self.col_vals[k] *= factor;
        }
        for (i, _) in self.col_entries(j) {
            let k = self.find_in_row(i, j).expect("mirror out of sync");
            self.row_vals[k] *= factor;
        }
        self.mark_col_changed(j);
    }

    /// Multiplies row `i` by `factor` in both mirrors.
    pub(crate) fn scale_row(&mut self, i: I, factor: E) {
        for k in self.row_range(i) {
            self.row_vals[k] *= factor;
        }
        for (j, _) in self.row_entries(i) {
            let k = self.find_in_col(j, i).expect("mirror out of sync");
            self.col_vals[k] *= factor;
        }
        self.mark_row_changed(i);
    }

    fn col_gap_end(&self, j: I) -> I {
        match self.clink.next(j) {
            NO_LINK => self.bufsize,
            n => self.col_start[n],
        }
    }

    fn row_gap_end(&self, i: I) -> I {
        match self.rlink.next(i) {
            NO_LINK => self.bufsize,
            n => self.row_start[n],
        }
    }

    fn col_free_start(&self) -> I {
        match self.clink.tail() {
            NO_LINK => 0,
            t => self.col_start[t] + self.col_len[t],
        }
    }

    fn row_free_start(&self) -> I {
        match self.rlink.tail() {
            NO_LINK => 0,
            t => self.row_start[t] + self.row_len[t],
        }
    }

    fn compact_cols(&mut self) {
        let order = self.clink.order();
        let mut cursor = 0;
        for j in order {
            let start = self.col_start[j];
            let len = self.col_len[j];
            self.col_rows.copy_within(start..start + len, cursor);
            self.col_vals.copy_within(start..start + len, cursor);
            self.col_start[j] = cursor;
            cursor += len;
        }
    }

    fn compact_rows(&mut self) {
        let order = self.rlink.order();
        let mut cursor = 0;
        for i in order {
            let start = self.row_start[i];
            let len = self.row_len[i];
            self.row_cols.copy_within(start..start + len, cursor);
            self.row_vals.copy_within(start..start + len, cursor);
            self.row_start[i] = cursor;
            cursor += len;
        }
    }

    fn ensure_col_capacity(&mut self, j: I, extra: I) {
        if self.col_start[j] + self.col_len[j] + extra <= self.col_gap_end(j) {
            return;
        }
        let needed = self.col_len[j] + extra;
        if self.clink.tail() == j || self.col_free_start() + needed > self.bufsize {
            self.compact_cols();
        }
        if self.clink.tail() == j {
            assert!(
                self.col_start[j] + needed <= self.bufsize,
                "presolve column arena exhausted"
            );
            return;
        }
        let free_start = self.col_free_start();
        assert!(
            free_start + needed <= self.bufsize,
            "presolve column arena exhausted"
        );
        let start = self.col_start[j];
        let len = self.col_len[j];
        self.col_rows.copy_within(start..start + len, free_start);
        self.col_vals.copy_within(start..start + len, free_start);
        self.col_start[j] = free_start;
        self.clink.unlink(j);
        self.clink.append(j);
    }

    fn ensure_row_capacity(&mut self, i: I, extra: I) {
        if self.row_start[i] + self.row_len[i] + extra <= self.row_gap_end(i) {
            return;
        }
        let needed = self.row_len[i] + extra;
        if self.rlink.tail() == i || self.row_free_start() + needed > self.bufsize {
            self.compact_rows();
        }
        if self.rlink.tail() == i {
            assert!(
                self.row_start[i] + needed <= self.bufsize,
                "presolve row arena exhausted"
            );
            return;
        }
        let free_start = self.row_free_start();
        assert!(
            free_start + needed <= self.bufsize,
            "presolve row arena exhausted"
        );
        let start = self.row_start[i];
        let len = self.row_len[i];
        self.row_cols.copy_within(start..start + len, free_start);
        self.row_vals.copy_within(start..start + len, free_start);
        self.row_start[i] = free_start;
        self.rlink.unlink(i);
        self.rlink.append(i);
    }

    /// Inserts `a_ij = v` into both mirrors; the element must not exist yet.
    pub(crate) fn insert_element(&mut self, i: I, j: I, v: E) {
        debug_assert!(self.find_in_row(i, j).is_none());
        self.ensure_col_capacity(j, 1);
        let k = self.col_start[j] + self.col_len[j];
        self.col_rows[k] = i;
        self.col_vals[k] = v;
        self.col_len[j] += 1;

        self.ensure_row_capacity(i, 1);
        let k = self.row_start[i] + self.row_len[i];
        self.row_cols[k] = j;
        self.row_vals[k] = v;
        self.row_len[i] += 1;
    }

    /// The fundamental substitution primitive: `row[dst] += alpha * row[src]`.
    ///
    /// Existing coefficients are updated in place; results with magnitude at
    /// most `ztolzb` are dropped, missing ones above the tolerance are
    /// inserted (growing the row/columns as needed). Row and column sides
    /// stay mirrored; touched columns and the destination row are marked
    /// changed. Bounds, activities and costs are the caller's business.
    pub(crate) fn add_multiple_of_row(&mut self, alpha: E, src: I, dst: I) {
        debug_assert_ne!(src, dst);
        for (j, v) in self.row_entries(src) {
            let add = alpha * v;
            match self.find_in_row(dst, j) {
                Some(k) => {
                    let new = self.row_vals[k] + add;
                    if new.abs() <= self.ztolzb {
                        self.delete_element(dst, j);
                    } else {
                        self.row_vals[k] = new;
                        let kc = self.find_in_col(j, dst).expect("mirror out of sync");
                        self.col_vals[kc] = new;
                    }
                }
                None => {
                    if add.abs() > self.ztolzb {
                        self.insert_element(dst, j, add);
                    }
                }
            }
            self.mark_col_changed(j);
        }
        self.mark_row_changed(dst);
    }

    /// Rebuilds row activities from the primal snapshot. The caller's
    /// activity vector is never trusted.
    pub(crate) fn recompute_acts(&mut self) {
        self.acts = vec![0.0; self.nrows];
        for j in 0..self.ncols {
            let x = self.sol[j];
            for k in self.col_range(j) {
                self.acts[self.col_rows[k]] += self.col_vals[k] * x;
            }
        }
    }

    pub(crate) fn mark_row_changed(&mut self, i: I) {
        if !self.row_prohibited[i] {
            self.work.mark_row_changed(i);
        }
    }

    pub(crate) fn mark_col_changed(&mut self, j: I) {
        if !self.col_prohibited[j] {
            self.work.mark_col_changed(j);
        }
    }

    pub(crate) fn seed_worklists(&mut self) {
        if self.any_prohibited {
            self.work
                .seed_respecting_prohibited(&self.row_prohibited, &self.col_prohibited);
        } else {
            self.work.seed_all();
        }
    }

    pub(crate) fn is_pos_inf(&self, v: E) -> bool {
        v >= self.inf
    }

    pub(crate) fn is_neg_inf(&self, v: E) -> bool {
        v <= -self.inf
    }

    /// Number of stored elements (either mirror).
    pub(crate) fn element_count(&self) -> I {
        (0..self.ncols).map(|j| self.col_len[j]).sum()
    }

    /// Gap-free column-major copy of the current (reduced) problem.
    pub(crate) fn to_problem_data(&self) -> ProblemData {
        let nelems = self.element_count();
        let mut col_starts = Vec::with_capacity(self.ncols + 1);
        let mut row_indices = Vec::with_capacity(nelems);
        let mut elements = Vec::with_capacity(nelems);
        col_starts.push(0);
        for j in 0..self.ncols {
            for k in self.col_range(j) {
                row_indices.push(self.col_rows[k]);
                elements.push(self.col_vals[k]);
            }
            col_starts.push(row_indices.len());
        }
        ProblemData {
            ncols: self.ncols,
            nrows: self.nrows,
            col_starts,
            row_indices,
            elements,
            col_lower: self.clo[..self.ncols].to_vec(),
            col_upper: self.cup[..self.ncols].to_vec(),
            objective: self.cost[..self.ncols].to_vec(),
            row_lower: self.rlo[..self.nrows].to_vec(),
            row_upper: self.rup[..self.nrows].to_vec(),
            integer: self.integer[..self.ncols].to_vec(),
            obj_sense: self.maxmin,
            obj_offset: self.original_offset - self.dobias,
        }
    }

    /// Debug/property check: mirror agreement (I1), free-space contract (I2)
    /// and link sanity. Panics on violation.
    pub(crate) fn assert_consistent(&self) {
        // I1: every column element appears once in its row, values equal
        for j in 0..self.ncols {
            for k in self.col_range(j) {
                let i = self.col_rows[k];
                let hits: Vec<I> = self
                    .row_range(i)
                    .filter(|&k2| self.row_cols[k2] == j)
                    .collect();
                assert_eq!(hits.len(), 1, "element ({i},{j}) mirrored {} times", hits.len());
                assert_eq!(
                    self.row_vals[hits[0]], self.col_vals[k],
                    "mirror value mismatch at ({i},{j})"
                );
            }
        }
        let col_elems: I = (0..self.ncols).map(|j| self.col_len[j]).sum();
        let row_elems: I = (0..self.nrows).map(|i| self.row_len[i]).sum();
        assert_eq!(col_elems, row_elems, "mirrors disagree on element count");

        // I2: storage-order neighbours do not overlap
        let order = self.clink.order();
        for w in order.windows(2) {
            assert!(
                self.col_start[w[0]] + self.col_len[w[0]] <= self.col_start[w[1]],
                "column free-space contract violated between {} and {}",
                w[0],
                w[1]
            );
        }
        let order = self.rlink.order();
        for w in order.windows(2) {
            assert!(
                self.row_start[w[0]] + self.row_len[w[0]] <= self.row_start[w[1]],
                "row free-space contract violated between {} and {}",
                w[0],
                w[1]
            );
        }
    }
}
