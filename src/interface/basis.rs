//! Warm-start basis representation shared with the solver.
//!
//! Statuses travel across the solver boundary in a compact form: two bits per
//! variable, packed least-significant-bit first. [`Status::SuperBasic`] has no
//! wire representation and collapses to [`Status::IsFree`] when packed.

use serde::{Deserialize, Serialize};

use crate::I;

/// Basis status of a structural variable or of a row's artificial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    AtLower = 0,
    Basic = 1,
    AtUpper = 2,
    IsFree = 3,
    /// Nonbasic but away from both bounds. Only produced by postsolve when a
    /// restored bound no longer touches the solution value.
    SuperBasic = 4,
}

impl Status {
    /// Two-bit wire encoding; `SuperBasic` degrades to `IsFree`.
    pub fn to_wire(self) -> u8 {
        match self {
            Status::SuperBasic => Status::IsFree as u8,
            other => other as u8,
        }
    }

    pub fn from_wire(bits: u8) -> Status {
        match bits & 3 {
            0 => Status::AtLower,
            1 => Status::Basic,
            2 => Status::AtUpper,
            _ => Status::IsFree,
        }
    }

    pub fn is_basic(self) -> bool {
        self == Status::Basic
    }
}

/// A full basis: one status per structural variable and one per row.
///
/// The packed vectors are the wire format; accessors unpack on the fly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmStartBasis {
    num_structural: I,
    num_artificial: I,
    structural: Vec<u8>,
    artificial: Vec<u8>,
}

fn packed_len(n: I) -> I {
    n.div_ceil(4)
}

fn get_packed(packed: &[u8], index: I) -> u8 {
    (packed[index / 4] >> ((index % 4) * 2)) & 3
}

fn set_packed(packed: &mut [u8], index: I, bits: u8) {
    let byte = &mut packed[index / 4];
    let shift = (index % 4) * 2;
    *byte = (*byte & !(3 << shift)) | ((bits & 3) << shift);
}

impl WarmStartBasis {
    /// All-slack basis: columns at their lower bound, artificials basic.
    pub fn new(num_structural: I, num_artificial: I) -> Self {
        let mut basis = WarmStartBasis {
            num_structural,
            num_artificial,
            structural: vec![0; packed_len(num_structural)],
            artificial: vec![0; packed_len(num_artificial)],
        };
        for i in 0..num_artificial {
            basis.set_row_status(i, Status::Basic);
        }
        basis
    }

    pub fn from_statuses(structural: &[Status], artificial: &[Status]) -> Self {
        let mut basis = WarmStartBasis::new(structural.len(), artificial.len());
        for (j, status) in structural.iter().enumerate() {
            basis.set_col_status(j, *status);
        }
        for (i, status) in artificial.iter().enumerate() {
            basis.set_row_status(i, *status);
        }
        basis
    }

    pub fn num_structural(&self) -> I {
        self.num_structural
    }

    pub fn num_artificial(&self) -> I {
        self.num_artificial
    }

    pub fn col_status(&self, col: I) -> Status {
        Status::from_wire(get_packed(&self.structural, col))
    }

    pub fn row_status(&self, row: I) -> Status {
        Status::from_wire(get_packed(&self.artificial, row))
    }

    pub fn set_col_status(&mut self, col: I, status: Status) {
        set_packed(&mut self.structural, col, status.to_wire());
    }

    pub fn set_row_status(&mut self, row: I, status: Status) {
        set_packed(&mut self.artificial, row, status.to_wire());
    }

    /// Number of basic entries, structural and artificial combined.
    pub fn num_basic(&self) -> I {
        let cols = (0..self.num_structural)
            .filter(|&j| self.col_status(j).is_basic())
            .count();
        let rows = (0..self.num_artificial)
            .filter(|&i| self.row_status(i).is_basic())
            .count();
        cols + rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_round_trip() {
        let mut basis = WarmStartBasis::new(9, 5);
        let statuses = [
            Status::AtLower,
            Status::Basic,
            Status::AtUpper,
            Status::IsFree,
            Status::Basic,
            Status::AtLower,
            Status::AtUpper,
            Status::Basic,
            Status::IsFree,
        ];
        for (j, s) in statuses.iter().enumerate() {
            basis.set_col_status(j, *s);
        }
        for (j, s) in statuses.iter().enumerate() {
            assert_eq!(basis.col_status(j), *s);
        }
    }

    #[test]
    fn superbasic_collapses_on_the_wire() {
        let mut basis = WarmStartBasis::new(1, 0);
        basis.set_col_status(0, Status::SuperBasic);
        assert_eq!(basis.col_status(0), Status::IsFree);
        assert_eq!(Status::SuperBasic.to_wire(), 3);
    }

    #[test]
    fn default_basis_is_all_slack() {
        let basis = WarmStartBasis::new(3, 2);
        for j in 0..3 {
            assert_eq!(basis.col_status(j), Status::AtLower);
        }
        for i in 0..2 {
            assert_eq!(basis.row_status(i), Status::Basic);
        }
        assert_eq!(basis.num_basic(), 2);
    }
}
