//! The action log.
//!
//! Every reduction appends one record (or a small batch) describing exactly
//! what postsolve needs to reverse it. The log is a plain vector traversed
//! back-to-front at postsolve time, so records see the world exactly as it
//! was when they were created.
//!
//! Records are a tagged sum type; `enum_dispatch` generates the static
//! dispatch for the [`Postsolve`] contract over all variants.

use enum_dispatch::enum_dispatch;

use crate::matrix::postsolve::PostsolveMatrix;
use crate::rules::doubleton::Doubleton;
use crate::rules::dual::DualFix;
use crate::rules::dupcol::{DuplicateColumn, DuplicateRow};
use crate::rules::empty::{DropEmptyColumns, DropEmptyRows};
use crate::rules::fixed::FixedVariable;
use crate::rules::forcing::{ForcingConstraint, UselessConstraint};
use crate::rules::implied_free::ImpliedFree;
use crate::rules::isolated::IsolatedConstraint;
use crate::rules::singleton::SlackDoubleton;
use crate::rules::tighten::TightenBounds;
use crate::rules::zeros::ZeroCoefficients;

/// Undo contract shared by all action records.
#[enum_dispatch]
pub(crate) trait Postsolve {
    /// Rule name for diagnostics.
    fn name(&self) -> &'static str;

    /// Extends the primal/dual/basis vectors one step back toward the
    /// original problem.
    fn postsolve(&self, prob: &mut PostsolveMatrix);
}

/// One entry of the action log.
#[enum_dispatch(Postsolve)]
pub(crate) enum PresolveAction {
    FixedVariable(FixedVariable),
    SlackDoubleton(SlackDoubleton),
    Doubleton(Doubleton),
    ForcingConstraint(ForcingConstraint),
    UselessConstraint(UselessConstraint),
    ImpliedFree(ImpliedFree),
    TightenBounds(TightenBounds),
    DualFix(DualFix),
    DuplicateColumn(DuplicateColumn),
    DuplicateRow(DuplicateRow),
    IsolatedConstraint(IsolatedConstraint),
    ZeroCoefficients(ZeroCoefficients),
    DropEmptyColumns(DropEmptyColumns),
    DropEmptyRows(DropEmptyRows),
}
