//! Result reporting.
//!
//! A [`Report`] is a pure transformation of a solve result into
//! structured rows: nonzero variable assignments plus the scalar
//! objective. Rendering (console, JSON) is the caller's business; the
//! library only formats.

use std::fmt;

use lpsweep_core::{ModelSpec, SolveResult, SolveStatus};
use serde::Serialize;

/// Default near-zero threshold below which assignments are omitted.
pub const DEFAULT_THRESHOLD: f64 = 1e-6;

/// One reported variable assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Variable name.
    pub name: String,

    /// Value at the optimum.
    pub value: f64,
}

/// Structured view of one solve.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Model name.
    pub model: String,

    /// Termination status.
    #[serde(serialize_with = "status_as_str")]
    pub status: SolveStatus,

    /// Objective value, present only when a solution exists.
    pub objective: Option<f64>,

    /// Nonzero assignments, in variable creation order.
    pub rows: Vec<ReportRow>,

    /// Threshold used to filter near-zero values.
    pub threshold: f64,
}

fn status_as_str<S: serde::Serializer>(
    status: &SolveStatus,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&status.to_string())
}

impl Report {
    /// Build a report from a solved model with the default threshold.
    pub fn from_solve(model: &ModelSpec, result: &SolveResult) -> Self {
        Self::with_threshold(model, result, DEFAULT_THRESHOLD)
    }

    /// Build a report, filtering assignments with |value| <= threshold.
    pub fn with_threshold(model: &ModelSpec, result: &SolveResult, threshold: f64) -> Self {
        let rows = if result.status.has_solution() {
            model
                .vars
                .iter()
                .zip(&result.x)
                .filter(|(_, &value)| value.abs() > threshold)
                .map(|(var, &value)| ReportRow {
                    name: var.name.clone(),
                    value,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            model: model.name.clone(),
            status: result.status,
            objective: result.status.has_solution().then_some(result.obj_val),
            rows,
            threshold,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "{}", self.model)?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Status:       {}", self.status)?;
        match self.objective {
            Some(objective) => writeln!(f, "Objective:    {objective:.6}")?,
            None => writeln!(f, "Objective:    n/a")?,
        }
        if !self.rows.is_empty() {
            writeln!(f, "Assignments (|value| > {:e}):", self.threshold)?;
            for row in &self.rows {
                writeln!(f, "  {:<40} {:>14.6}", row.name, row.value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpsweep_core::{ObjectiveSense, VarDomain};

    fn model() -> ModelSpec {
        let mut m = ModelSpec::new("demo", ObjectiveSense::Minimize);
        m.add_var("x[a]", VarDomain::nonneg());
        m.add_var("x[b]", VarDomain::nonneg());
        m.add_var("x[c]", VarDomain::nonneg());
        m
    }

    #[test]
    fn test_filters_near_zero() {
        let m = model();
        let result = SolveResult::optimal(vec![5.0, 1e-9, 2.0], 7.0);
        let report = Report::from_solve(&m, &result);
        assert_eq!(report.objective, Some(7.0));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].name, "x[a]");
        assert_eq!(report.rows[1].name, "x[c]");
    }

    #[test]
    fn test_custom_threshold() {
        let m = model();
        let result = SolveResult::optimal(vec![5.0, 0.5, 2.0], 7.5);
        let report = Report::with_threshold(&m, &result, 1.0);
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn test_infeasible_has_no_objective() {
        let m = model();
        let report = Report::from_solve(&m, &SolveResult::infeasible());
        assert_eq!(report.objective, None);
        assert!(report.rows.is_empty());
        let text = report.to_string();
        assert!(text.contains("Infeasible"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_display_lists_assignments() {
        let m = model();
        let result = SolveResult::optimal(vec![5.0, 0.0, 2.0], 7.0);
        let text = Report::from_solve(&m, &result).to_string();
        assert!(text.contains("x[a]"));
        assert!(text.contains("x[c]"));
        assert!(!text.contains("x[b]"));
    }
}
