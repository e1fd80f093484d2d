//! Threaded column-major store for the postsolve phase.
//!
//! There is no row mirror here: each column is a singly-linked chain of
//! arena slots (`link`), and deleted slots go onto a single free list.
//! The arena holds `2 * nelems0` slots, which is enough when presolve's
//! insertions and deletions are balanced; running out is a programming
//! error, not a runtime condition.

use problemo::{common::IntoCommonProblem, Problem};

use crate::interface::basis::Status;
use crate::interface::SolverInterface;
use crate::matrix::NO_LINK;
use crate::{E, I, PRESOLVE_INF};

/// Original-size problem state being rebuilt from the reduced solution.
///
/// Costs are stored in minimize convention (`obj_sense * c`), and row duals /
/// reduced costs are negated on entry under maximization, so every undo
/// kernel reasons in a single sign convention. The orchestrator negates the
/// duals again before writing them back.
pub struct PostsolveMatrix {
    pub(crate) ncols0: I,
    pub(crate) nrows0: I,
    pub(crate) nelems0: I,
    /// Columns/rows currently present (reduced at entry, original at exit).
    pub(crate) ncols: I,
    pub(crate) nrows: I,

    pub(crate) clo: Vec<E>,
    pub(crate) cup: Vec<E>,
    pub(crate) cost: Vec<E>,
    pub(crate) rlo: Vec<E>,
    pub(crate) rup: Vec<E>,

    pub(crate) sol: Vec<E>,
    pub(crate) rcosts: Vec<E>,
    pub(crate) acts: Vec<E>,
    pub(crate) rowduals: Vec<E>,
    pub(crate) colstat: Vec<Status>,
    pub(crate) rowstat: Vec<Status>,
    /// Whether basis statuses are being tracked (postsolve with
    /// `update_status`); when false the status helpers are no-ops.
    pub(crate) have_status: bool,

    pub(crate) col_start: Vec<I>,
    pub(crate) col_len: Vec<I>,
    pub(crate) row_of: Vec<I>,
    pub(crate) vals: Vec<E>,
    pub(crate) link: Vec<I>,
    free_list: I,

    pub(crate) cdone: Vec<bool>,
    pub(crate) rdone: Vec<bool>,

    pub(crate) maxmin: E,
    pub(crate) ztolzb: E,
    pub(crate) ztoldj: E,
    pub(crate) inf: E,
}

impl PostsolveMatrix {
    /// Seeds the arena from the solved reduced problem.
    ///
    /// The reduced matrix must be gap-free; anything else is a programming
    /// error upstream and trips an assertion. Fails only on configuration
    /// problems (missing tolerances on the interface).
    pub fn new(
        si: &dyn SolverInterface,
        ncols0: I,
        nrows0: I,
        nelems0: I,
        maxmin: E,
        update_status: bool,
    ) -> Result<PostsolveMatrix, Problem> {
        let ncols = si.num_cols();
        let nrows = si.num_rows();
        let nelems = si.num_elements();
        let maxlink = 2 * nelems0;

        let ztolzb = si
            .primal_tolerance()
            .ok_or_else(|| "solver interface supplies no primal tolerance".gloss())?;
        let ztoldj = si
            .dual_tolerance()
            .ok_or_else(|| "solver interface supplies no dual tolerance".gloss())?;

        let starts = si.col_starts();
        let lengths = si.col_lengths();
        for j in 0..ncols {
            assert!(
                starts[j + 1] - starts[j] == lengths[j],
                "postsolve input matrix is not gap free"
            );
        }

        let copy_front = |src: &[E], len0: I, scale: E| -> Vec<E> {
            let mut v = vec![0.0; len0];
            for (dst, s) in v.iter_mut().zip(src.iter()) {
                *dst = s * scale;
            }
            v
        };

        let sign = if maxmin < 0.0 { -1.0 } else { 1.0 };
        let clo = copy_front(si.col_lower(), ncols0, 1.0);
        let cup = copy_front(si.col_upper(), ncols0, 1.0);
        let cost = copy_front(si.objective(), ncols0, maxmin);
        let rlo = copy_front(si.row_lower(), nrows0, 1.0);
        let rup = copy_front(si.row_upper(), nrows0, 1.0);
        let sol = copy_front(si.col_solution(), ncols0, 1.0);
        let acts = copy_front(si.row_activity(), nrows0, 1.0);
        let rowduals = copy_front(si.row_price(), nrows0, sign);
        let rcosts = copy_front(si.reduced_cost(), ncols0, sign);

        let mut col_start = vec![0; ncols0];
        let mut col_len = vec![0; ncols0];
        let mut row_of = vec![0; maxlink];
        let mut vals = vec![0.0; maxlink];
        let mut link = vec![NO_LINK; maxlink];

        col_start[..ncols].copy_from_slice(&starts[..ncols]);
        col_len[..ncols].copy_from_slice(&lengths[..ncols]);
        row_of[..nelems].copy_from_slice(&si.row_indices()[..nelems]);
        vals[..nelems].copy_from_slice(&si.elements()[..nelems]);
        for j in 0..ncols {
            let kcs = starts[j];
            let kce = starts[j + 1];
            for k in kcs..kce {
                link[k] = if k + 1 < kce { k + 1 } else { NO_LINK };
            }
        }
        for k in nelems..maxlink {
            link[k] = if k + 1 < maxlink { k + 1 } else { NO_LINK };
        }
        let free_list = if nelems < maxlink { nelems } else { NO_LINK };

        let colstat;
        let rowstat;
        let mut have_status = update_status;
        match si.warm_start() {
            Some(basis)
                if basis.num_structural() == ncols && basis.num_artificial() == nrows =>
            {
                let mut cs = vec![Status::AtLower; ncols0];
                let mut rs = vec![Status::Basic; nrows0];
                for (j, s) in cs.iter_mut().enumerate().take(ncols) {
                    *s = basis.col_status(j);
                }
                for (i, s) in rs.iter_mut().enumerate().take(nrows) {
                    *s = basis.row_status(i);
                }
                colstat = cs;
                rowstat = rs;
            }
            _ => {
                have_status = false;
                colstat = vec![Status::AtLower; ncols0];
                rowstat = vec![Status::Basic; nrows0];
            }
        }

        let mut cdone = vec![false; ncols0];
        let mut rdone = vec![false; nrows0];
        cdone[..ncols].fill(true);
        rdone[..nrows].fill(true);

        Ok(PostsolveMatrix {
            ncols0,
            nrows0,
            nelems0,
            ncols,
            nrows,
            clo,
            cup,
            cost,
            rlo,
            rup,
            sol,
            rcosts,
            acts,
            rowduals,
            colstat,
            rowstat,
            have_status,
            col_start,
            col_len,
            row_of,
            vals,
            link,
            free_list,
            cdone,
            rdone,
            maxmin,
            ztolzb,
            ztoldj,
            inf: PRESOLVE_INF,
        })
    }

    fn claim_slot(&mut self) -> I {
        let k = self.free_list;
        assert!(k != NO_LINK, "postsolve free list exhausted");
        self.free_list = self.link[k];
        k
    }

    fn release_slot(&mut self, k: I) {
        self.link[k] = self.free_list;
        self.free_list = k;
    }

    /// Prepends `a_ij = v` to column `j`'s chain.
    pub(crate) fn add_element(&mut self, j: I, i: I, v: E) {
        let k = self.claim_slot();
        self.row_of[k] = i;
        self.vals[k] = v;
        self.link[k] = if self.col_len[j] > 0 {
            self.col_start[j]
        } else {
            NO_LINK
        };
        self.col_start[j] = k;
        self.col_len[j] += 1;
    }

    /// Removes `a_ij` from column `j`'s chain; the element must exist.
    pub(crate) fn remove_element(&mut self, j: I, i: I) {
        let mut k = self.col_start[j];
        let mut prev = NO_LINK;
        for _ in 0..self.col_len[j] {
            if self.row_of[k] == i {
                if prev == NO_LINK {
                    self.col_start[j] = self.link[k];
                } else {
                    self.link[prev] = self.link[k];
                }
                self.col_len[j] -= 1;
                self.release_slot(k);
                return;
            }
            prev = k;
            k = self.link[k];
        }
        panic!("element ({i},{j}) missing from postsolve column");
    }

    /// Sets `a_ij` if present, inserts it otherwise.
    pub(crate) fn set_or_add_element(&mut self, j: I, i: I, v: E) {
        let mut k = self.col_start[j];
        for _ in 0..self.col_len[j] {
            if self.row_of[k] == i {
                self.vals[k] = v;
                return;
            }
            k = self.link[k];
        }
        self.add_element(j, i, v);
    }

    pub(crate) fn has_element(&self, j: I, i: I) -> bool {
        let mut k = self.col_start[j];
        for _ in 0..self.col_len[j] {
            if self.row_of[k] == i {
                return true;
            }
            k = self.link[k];
        }
        false
    }

    /// Replaces column `j` with a saved `(row, value)` snapshot.
    pub(crate) fn restore_column(&mut self, j: I, elements: &[(I, E)]) {
        while self.col_len[j] > 0 {
            let k = self.col_start[j];
            self.col_start[j] = self.link[k];
            self.col_len[j] -= 1;
            self.release_slot(k);
        }
        for &(i, v) in elements {
            self.add_element(j, i, v);
        }
    }

    /// Column `j` as `(row, value)` pairs, chain order.
    pub(crate) fn col_elements(&self, j: I) -> Vec<(I, E)> {
        let mut out = Vec::with_capacity(self.col_len[j]);
        let mut k = self.col_start[j];
        for _ in 0..self.col_len[j] {
            out.push((self.row_of[k], self.vals[k]));
            k = self.link[k];
        }
        out
    }

    /// `cost_j - sum_i y_i a_ij` over the stored column, minimize convention.
    pub(crate) fn reduced_cost_of(&self, j: I) -> E {
        let mut dj = self.cost[j];
        let mut k = self.col_start[j];
        for _ in 0..self.col_len[j] {
            dj -= self.rowduals[self.row_of[k]] * self.vals[k];
            k = self.link[k];
        }
        dj
    }

    pub(crate) fn set_col_status(&mut self, j: I, status: Status) {
        if self.have_status {
            self.colstat[j] = status;
        }
    }

    pub(crate) fn set_row_status(&mut self, i: I, status: Status) {
        if self.have_status {
            self.rowstat[i] = status;
        }
    }

    /// If a nonbasic column no longer sits on one of its (just restored)
    /// bounds, it becomes superbasic.
    pub(crate) fn fix_col_status_at_bounds(&mut self, j: I) {
        if !self.have_status {
            return;
        }
        let x = self.sol[j];
        self.colstat[j] = match self.colstat[j] {
            Status::Basic => Status::Basic,
            _ => {
                if self.clo[j] > -self.inf && (x - self.clo[j]).abs() <= self.ztolzb {
                    Status::AtLower
                } else if self.cup[j] < self.inf && (x - self.cup[j]).abs() <= self.ztolzb {
                    Status::AtUpper
                } else if self.clo[j] <= -self.inf && self.cup[j] >= self.inf {
                    Status::IsFree
                } else {
                    Status::SuperBasic
                }
            }
        };
    }

    /// Arena slots currently holding elements.
    pub(crate) fn elements_in_use(&self) -> I {
        (0..self.ncols0).map(|j| self.col_len[j]).sum()
    }

    /// Guard routine: the free list and the column chains must partition the
    /// arena exactly. Panics otherwise.
    pub(crate) fn check_free_list(&self) {
        let mut free = 0;
        let mut k = self.free_list;
        while k != NO_LINK {
            free += 1;
            assert!(free <= self.link.len(), "free list contains a cycle");
            k = self.link[k];
        }
        assert_eq!(
            free + self.elements_in_use(),
            2 * self.nelems0,
            "postsolve arena slots leaked"
        );
    }

    /// Number of basic variables, structural plus artificial.
    pub(crate) fn num_basic(&self) -> I {
        let cols = self.colstat.iter().filter(|s| s.is_basic()).count();
        let rows = self.rowstat.iter().filter(|s| s.is_basic()).count();
        cols + rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::model::{default_bounds, LpModel};
    use faer::sparse::Triplet;
    use faer::Col;

    fn reduced_model() -> LpModel {
        // 2 columns, 2 rows, 3 elements
        let triplets = [
            Triplet::new(0, 0, 1.0),
            Triplet::new(1, 0, 2.0),
            Triplet::new(1, 1, -1.0),
        ];
        let (lo, hi) = default_bounds(2);
        LpModel::try_from_triplets(
            2,
            2,
            &triplets,
            Col::from_fn(2, |_| 1.0),
            Col::zeros(2),
            Col::from_fn(2, |_| 5.0),
            lo,
            hi,
        )
        .unwrap()
    }

    fn build(ncols0: I, nrows0: I, nelems0: I) -> PostsolveMatrix {
        PostsolveMatrix::new(&reduced_model(), ncols0, nrows0, nelems0, 1.0, false).unwrap()
    }

    #[test]
    fn seeds_threads_and_free_list() {
        let prob = build(4, 3, 5);
        assert_eq!(prob.col_elements(0), vec![(0, 1.0), (1, 2.0)]);
        assert_eq!(prob.col_elements(1), vec![(1, -1.0)]);
        assert_eq!(prob.elements_in_use(), 3);
        prob.check_free_list();
    }

    #[test]
    fn add_remove_restore_cycle() {
        let mut prob = build(4, 3, 5);
        prob.add_element(2, 2, 4.0);
        assert_eq!(prob.col_elements(2), vec![(2, 4.0)]);

        prob.remove_element(0, 1);
        assert_eq!(prob.col_elements(0), vec![(0, 1.0)]);

        prob.restore_column(0, &[(0, 1.0), (1, 2.0), (2, 7.0)]);
        let mut elements = prob.col_elements(0);
        elements.sort_by_key(|&(i, _)| i);
        assert_eq!(elements, vec![(0, 1.0), (1, 2.0), (2, 7.0)]);
        prob.check_free_list();
    }

    #[test]
    fn set_or_add_updates_in_place() {
        let mut prob = build(4, 3, 5);
        prob.set_or_add_element(0, 1, 9.0);
        prob.set_or_add_element(0, 2, 3.0);
        let mut elements = prob.col_elements(0);
        elements.sort_by_key(|&(i, _)| i);
        assert_eq!(elements, vec![(0, 1.0), (1, 9.0), (2, 3.0)]);
    }

    #[test]
    #[should_panic(expected = "postsolve free list exhausted")]
    fn free_list_underflow_is_a_programming_error() {
        // arena of 2*nelems0 = 6 slots, 3 used at seed time
        let mut prob = build(4, 3, 3);
        for n in 0..4 {
            prob.add_element(3, n, 1.0);
        }
    }

    #[test]
    fn maximize_enters_in_minimize_convention() {
        let mut model = reduced_model();
        model.set_obj_sense(-1.0);
        model.set_col_solution(&[1.0, 1.0]);
        model.set_row_price(&[0.5, -0.25]);
        let prob = PostsolveMatrix::new(&model, 2, 2, 3, -1.0, false).unwrap();
        assert_eq!(prob.cost, vec![-1.0, -1.0]);
        assert_eq!(prob.rowduals, vec![-0.5, 0.25]);
    }
}
