//! Core model representation and solver seam for lpsweep.
//!
//! This crate defines the canonical optimization-model value object
//! (`ModelSpec`) and the interface to external solvers. A model here is
//! plain data:
//!
//! ```text
//! minimize (or maximize)   c^T x + k
//! subject to               a_i^T x  {=, <=, >=}  b_i    for each row i
//!                          x_j in its declared domain
//! ```
//!
//! where each variable domain is continuous-with-bounds, integer, or
//! binary. Models are assembled by a caller (typically `lpsweep-model`),
//! validated, and then handed to a [`Solver`] implementation. The solver
//! owns nothing; each solve starts from a freshly built `ModelSpec`, so
//! no solver state can leak between repeated solves.
//!
//! The bundled backend lowers models to the `microlp` simplex /
//! branch-and-bound solver. Infeasible and unbounded terminations are
//! reported as [`SolveStatus`] values, not errors: a sweep driver needs
//! to treat "no feasible solution" as an ordinary outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod microlp_backend;
pub mod model;
pub mod solution;
pub mod solver;

pub use error::{ModelError, SolverError};
pub use microlp_backend::MicrolpSolver;
pub use model::{
    Constraint, ConstraintSense, LinearExpr, ModelSpec, Objective, ObjectiveSense, VarDomain,
    VarSpec,
};
pub use solution::{SolveResult, SolveStatus};
pub use solver::Solver;
