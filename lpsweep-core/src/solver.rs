//! Solver backend trait.

use crate::error::SolverError;
use crate::model::ModelSpec;
use crate::solution::SolveResult;

/// An external MILP/LP solver.
///
/// A backend receives a complete, validated [`ModelSpec`] and returns a
/// [`SolveResult`]. Requirements on implementations:
///
/// - Infeasible and unbounded problems are reported through
///   [`crate::SolveStatus`], never as `Err`.
/// - `Err` is reserved for abnormal terminations (invalid model,
///   numerical breakdown, internal backend failure).
/// - The backend must not retain state between calls; every call stands
///   alone so that sweep scenarios cannot contaminate each other.
pub trait Solver {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Solve the model.
    fn solve(&self, model: &ModelSpec) -> Result<SolveResult, SolverError>;
}
