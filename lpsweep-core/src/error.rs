//! Error types for model validation and solver backends.

use thiserror::Error;

/// Errors raised by [`crate::ModelSpec::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A constraint or objective term references a variable index that
    /// does not exist in the model.
    #[error("{context} references variable {var}, but the model has {num_vars} variables")]
    UnknownVariable {
        /// Where the bad reference was found ("objective" or a row name).
        context: String,
        /// The out-of-range variable index.
        var: usize,
        /// Number of variables in the model.
        num_vars: usize,
    },

    /// A coefficient, bound, or right-hand side is NaN or infinite where
    /// a finite value is required.
    #[error("{context} contains a non-finite value {value}")]
    NonFiniteValue {
        /// Where the value was found.
        context: String,
        /// The offending value.
        value: f64,
    },

    /// A variable has lower bound greater than upper bound.
    #[error("variable {name} has lower bound {lower} > upper bound {upper}")]
    InvertedBounds {
        /// Variable name.
        name: String,
        /// Declared lower bound.
        lower: f64,
        /// Declared upper bound.
        upper: f64,
    },

    /// Two variables in the same model share a name.
    #[error("duplicate variable name {0:?}")]
    DuplicateVariable(String),
}

/// Errors raised by a [`crate::Solver`] backend.
///
/// Infeasibility and unboundedness are *not* errors; they are
/// [`crate::SolveStatus`] values. A `SolverError` means the backend could
/// not produce a trustworthy status at all.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The model failed validation before it reached the backend.
    #[error("invalid model: {0}")]
    InvalidModel(#[from] ModelError),

    /// The backend terminated abnormally (numerical failure, internal
    /// error). The raw backend message is preserved; no retry is
    /// attempted.
    #[error("solver backend failed: {0}")]
    Backend(String),
}
