//! Error types for table ingestion, spec validation, and sweeps.

use lpsweep_core::SolverError;
use thiserror::Error;

/// Input-table schema violations.
///
/// Schema errors are fatal: they abort before any model construction.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// An expected column is absent from the table. A missing wide
    /// column is an error, never a silent zero coefficient.
    #[error("table {table:?}: missing expected column {column:?}")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Column that was expected.
        column: String,
    },

    /// A column expected to be numeric contains non-numeric values.
    #[error("table {table:?}: column {column:?} is not numeric")]
    NotNumeric {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
    },

    /// A column expected to be categorical is numeric.
    #[error("table {table:?}: column {column:?} is not categorical")]
    NotCategorical {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
    },

    /// Two rows share an identifier.
    #[error("table {table:?}: duplicate entity id {id:?}")]
    DuplicateId {
        /// Table name.
        table: String,
        /// The repeated identifier.
        id: String,
    },

    /// The underlying CSV reader failed (I/O, malformed record).
    #[error("table {table:?}: {source}")]
    Read {
        /// Table name.
        table: String,
        /// Reader error.
        #[source]
        source: csv::Error,
    },
}

/// Constraint-spec violations.
///
/// Config errors are fatal and are raised before any decision variable
/// is created, so a partially assembled model can never reach a solver.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A group or template references a table the inputs do not hold.
    #[error("{context}: unknown table {table:?}")]
    UnknownTable {
        /// Group or template that made the reference.
        context: String,
        /// Missing table name.
        table: String,
    },

    /// A group references a pair index the inputs do not hold.
    #[error("{context}: unknown pair index {index:?}")]
    UnknownIndex {
        /// Group that made the reference.
        context: String,
        /// Missing index name.
        index: String,
    },

    /// A template references a variable group the spec does not declare.
    #[error("template {label:?}: unknown variable group {group:?}")]
    UnknownGroup {
        /// Template label.
        label: String,
        /// Missing group name.
        group: String,
    },

    /// A template or group references a table column that is absent or
    /// has the wrong type.
    #[error("{context}: table {table:?} has no usable column {column:?}")]
    UnknownAttribute {
        /// Group or template that made the reference.
        context: String,
        /// Table the column was looked up on.
        table: String,
        /// Missing or mistyped column.
        column: String,
    },

    /// A pair index lacks an entry for a pair the spec needs.
    #[error("{context}: index {index:?} has no entry for ({row}, {col})")]
    MissingIndexKey {
        /// Group or template that needed the coefficient.
        context: String,
        /// Index name.
        index: String,
        /// Row entity id.
        row: String,
        /// Column entity id.
        col: String,
    },

    /// Two groups or two templates share a name.
    #[error("duplicate {kind} {name:?}")]
    DuplicateName {
        /// "group" or "template label".
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A scenario delta addresses a template label the spec does not
    /// contain.
    #[error("unknown template label {0:?}")]
    UnknownTemplate(String),

    /// A scenario delta tried to set a parameter on a template whose
    /// rule has none.
    #[error("template {0:?} has no adjustable parameter")]
    NoParameter(String),

    /// A template combination is structurally invalid (wrong group
    /// kind, mismatched stage tables, non-finite parameter).
    #[error("template {label:?}: {reason}")]
    Invalid {
        /// Template label.
        label: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Umbrella error for end-to-end runs (load, build, sweep).
#[derive(Error, Debug)]
pub enum Error {
    /// Input schema violation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Constraint-spec violation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Solver backend failure. Infeasibility is *not* reported here;
    /// it is an ordinary sweep outcome.
    #[error(transparent)]
    Solver(#[from] SolverError),
}
