//! Tabular model assembly and scenario sweeps for lpsweep.
//!
//! The crate turns tabular input into solvable optimization models:
//!
//! 1. [`tables::EntityTable`] loads typed entity records from CSV,
//!    preserving declared row order.
//! 2. [`index::PairIndex`] normalizes wide-format cost columns into a
//!    pair-keyed coefficient map, once, at load time.
//! 3. [`builder::ModelBuilder`] lowers a declarative [`spec::BuildSpec`]
//!    (variable groups + labelled constraint templates) into a fresh
//!    `ModelSpec`, failing fast on any bad reference before a single
//!    variable exists.
//! 4. [`scenario::sweep`] re-derives and re-solves the spec across a
//!    list of variations, each in total isolation.
//! 5. [`report::Report`] formats a solve into structured rows.
//!
//! [`network`] packages the recurring three-tier supply-network model on
//! top of these pieces.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod index;
pub mod network;
pub mod report;
pub mod scenario;
pub mod spec;
pub mod tables;

pub use builder::{ModelBuilder, ModelInputs};
pub use error::{ConfigError, Error, SchemaError};
pub use index::{ColumnPattern, PairIndex};
pub use report::{Report, ReportRow, DEFAULT_THRESHOLD};
pub use scenario::{sweep, ScenarioConfig, ScenarioDelta, ScenarioOutcome, Variation};
pub use spec::{BuildSpec, CostSpec, GroupKind, GroupSpec, TemplateRule, TemplateSpec};
pub use tables::{Entity, EntityTable};
