//! Model data structures and validation.
//!
//! A [`ModelSpec`] is an explicit value object: it accumulates variables,
//! constraints, and an objective, and is handed to a solver only after
//! assembly is complete. Builders construct a fresh `ModelSpec` per
//! scenario instead of mutating a shared solver handle.

use std::fmt;

use crate::error::ModelError;

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarDomain {
    /// Continuous variable with (possibly infinite) bounds.
    Continuous {
        /// Lower bound (`f64::NEG_INFINITY` = unbounded below).
        lower: f64,
        /// Upper bound (`f64::INFINITY` = unbounded above).
        upper: f64,
    },

    /// Integer variable with inclusive bounds.
    Integer {
        /// Lower bound.
        lower: i32,
        /// Upper bound.
        upper: i32,
    },

    /// Binary variable (0 or 1).
    Binary,
}

impl VarDomain {
    /// Continuous nonnegative domain, the default for flow quantities.
    pub fn nonneg() -> Self {
        VarDomain::Continuous {
            lower: 0.0,
            upper: f64::INFINITY,
        }
    }

    /// Returns true for integer and binary domains.
    pub fn is_integral(&self) -> bool {
        matches!(self, VarDomain::Integer { .. } | VarDomain::Binary)
    }

    /// Bounds as a continuous interval.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            VarDomain::Continuous { lower, upper } => (lower, upper),
            VarDomain::Integer { lower, upper } => (f64::from(lower), f64::from(upper)),
            VarDomain::Binary => (0.0, 1.0),
        }
    }
}

/// A named decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VarSpec {
    /// Stable name derived from the entities the variable refers to,
    /// e.g. `ship[Farm_3,Plant_1]`.
    pub name: String,

    /// Variable domain.
    pub domain: VarDomain,
}

/// A sparse linear expression: sum of coefficient * variable terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    /// (variable index, coefficient) pairs. Duplicate indices are
    /// summed by consumers.
    pub terms: Vec<(usize, f64)>,
}

impl LinearExpr {
    /// Empty expression.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a term. Zero coefficients are dropped.
    pub fn add(&mut self, var: usize, coeff: f64) {
        if coeff != 0.0 {
            self.terms.push((var, coeff));
        }
    }

    /// Evaluate the expression at a point.
    pub fn value_at(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|&(j, c)| c * x[j]).sum()
    }

    /// Number of stored terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True if the expression has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl FromIterator<(usize, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        let mut expr = LinearExpr::empty();
        for (var, coeff) in iter {
            expr.add(var, coeff);
        }
        expr
    }
}

/// Relation between a constraint row and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Equality.
    Eq,
    /// Less-than-or-equal.
    Le,
    /// Greater-than-or-equal.
    Ge,
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::Eq => write!(f, "="),
            ConstraintSense::Le => write!(f, "<="),
            ConstraintSense::Ge => write!(f, ">="),
        }
    }
}

/// One linear constraint row.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Stable name, e.g. `capacity[Plant_4]`.
    pub name: String,

    /// Left-hand side.
    pub expr: LinearExpr,

    /// Relation to the right-hand side.
    pub sense: ConstraintSense,

    /// Right-hand side.
    pub rhs: f64,
}

impl Constraint {
    /// Signed violation of the row at a point: positive means violated.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.expr.value_at(x);
        match self.sense {
            ConstraintSense::Eq => (lhs - self.rhs).abs(),
            ConstraintSense::Le => lhs - self.rhs,
            ConstraintSense::Ge => self.rhs - lhs,
        }
    }
}

/// Direction of optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    /// Minimize the objective.
    #[default]
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// Linear objective with an optional constant offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objective {
    /// Optimization direction.
    pub sense: ObjectiveSense,

    /// Linear terms.
    pub terms: LinearExpr,

    /// Constant offset added to the reported objective value.
    pub constant: f64,
}

/// A fully assembled optimization model.
///
/// The struct is pure data: constructing it has no side effects, and a
/// caller may inspect, validate, export, or discard it without touching
/// any solver. Repeated assembly from identical inputs produces an
/// identical `ModelSpec` (same variable order, same row order, same
/// coefficients), which is what makes scenario comparisons meaningful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSpec {
    /// Model name, used in logs and reports.
    pub name: String,

    /// Decision variables, in creation order.
    pub vars: Vec<VarSpec>,

    /// Constraint rows, in creation order.
    pub constraints: Vec<Constraint>,

    /// Objective.
    pub objective: Objective,
}

impl ModelSpec {
    /// Create an empty model.
    pub fn new(name: impl Into<String>, sense: ObjectiveSense) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: Objective {
                sense,
                ..Default::default()
            },
        }
    }

    /// Number of decision variables (n).
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraint rows (m).
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Add a variable and return its index.
    pub fn add_var(&mut self, name: impl Into<String>, domain: VarDomain) -> usize {
        self.vars.push(VarSpec {
            name: name.into(),
            domain,
        });
        self.vars.len() - 1
    }

    /// Add a constraint row.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    /// Add an objective term for an existing variable.
    pub fn add_objective_term(&mut self, var: usize, coeff: f64) {
        self.objective.terms.add(var, coeff);
    }

    /// Look up a variable index by name. Linear scan; intended for
    /// reporting and tests, not hot paths.
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }

    /// Validate variable references, bounds, and finiteness.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.num_vars();

        let mut seen = std::collections::HashSet::with_capacity(n);
        for var in &self.vars {
            if !seen.insert(var.name.as_str()) {
                return Err(ModelError::DuplicateVariable(var.name.clone()));
            }
            let (lower, upper) = var.domain.bounds();
            if lower > upper {
                return Err(ModelError::InvertedBounds {
                    name: var.name.clone(),
                    lower,
                    upper,
                });
            }
            // Infinite bounds are fine; NaN is not.
            if lower.is_nan() || upper.is_nan() {
                return Err(ModelError::NonFiniteValue {
                    context: format!("bounds of {}", var.name),
                    value: f64::NAN,
                });
            }
        }

        for (j, coeff) in &self.objective.terms.terms {
            if *j >= n {
                return Err(ModelError::UnknownVariable {
                    context: "objective".to_string(),
                    var: *j,
                    num_vars: n,
                });
            }
            if !coeff.is_finite() {
                return Err(ModelError::NonFiniteValue {
                    context: "objective".to_string(),
                    value: *coeff,
                });
            }
        }
        if !self.objective.constant.is_finite() {
            return Err(ModelError::NonFiniteValue {
                context: "objective constant".to_string(),
                value: self.objective.constant,
            });
        }

        for con in &self.constraints {
            for (j, coeff) in &con.expr.terms {
                if *j >= n {
                    return Err(ModelError::UnknownVariable {
                        context: con.name.clone(),
                        var: *j,
                        num_vars: n,
                    });
                }
                if !coeff.is_finite() {
                    return Err(ModelError::NonFiniteValue {
                        context: con.name.clone(),
                        value: *coeff,
                    });
                }
            }
            if !con.rhs.is_finite() {
                return Err(ModelError::NonFiniteValue {
                    context: format!("rhs of {}", con.name),
                    value: con.rhs,
                });
            }
        }

        Ok(())
    }

    /// Export the constraint matrix A (m x n) in CSC format.
    ///
    /// Duplicate terms within a row are summed. Because variables and
    /// rows are created in deterministic order, two structurally equal
    /// models export identical matrices, which the scenario tests rely
    /// on.
    pub fn constraint_matrix(&self) -> sprs::CsMat<f64> {
        let m = self.num_constraints();
        let n = self.num_vars();
        let mut tri = sprs::TriMat::new((m, n));
        for (i, con) in self.constraints.iter().enumerate() {
            for &(j, coeff) in &con.expr.terms {
                tri.add_triplet(i, j, coeff);
            }
        }
        tri.to_csc()
    }

    /// Right-hand side vector b (length m).
    pub fn rhs(&self) -> Vec<f64> {
        self.constraints.iter().map(|c| c.rhs).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> ModelSpec {
        // min x0 + 2 x1  s.t. x0 + x1 = 10, x0 <= 8
        let mut m = ModelSpec::new("toy", ObjectiveSense::Minimize);
        let x0 = m.add_var("x0", VarDomain::nonneg());
        let x1 = m.add_var("x1", VarDomain::nonneg());
        m.add_objective_term(x0, 1.0);
        m.add_objective_term(x1, 2.0);
        let mut row = LinearExpr::empty();
        row.add(x0, 1.0);
        row.add(x1, 1.0);
        m.add_constraint("total", row, ConstraintSense::Eq, 10.0);
        let mut cap = LinearExpr::empty();
        cap.add(x0, 1.0);
        m.add_constraint("cap_x0", cap, ConstraintSense::Le, 8.0);
        m
    }

    #[test]
    fn test_dimensions() {
        let m = toy_model();
        assert_eq!(m.num_vars(), 2);
        assert_eq!(m.num_constraints(), 2);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_expr_value_and_violation() {
        let m = toy_model();
        let x = [8.0, 2.0];
        assert!((m.constraints[0].expr.value_at(&x) - 10.0).abs() < 1e-12);
        assert!(m.constraints[0].violation(&x) < 1e-12);
        // x0 = 9 violates cap_x0 by 1
        let viol = m.constraints[1].violation(&[9.0, 1.0]);
        assert!((viol - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_coeff_dropped() {
        let mut expr = LinearExpr::empty();
        expr.add(0, 0.0);
        expr.add(1, 2.0);
        assert_eq!(expr.len(), 1);
    }

    #[test]
    fn test_validate_unknown_variable() {
        let mut m = toy_model();
        let mut bad = LinearExpr::empty();
        bad.add(7, 1.0);
        m.add_constraint("bad", bad, ConstraintSense::Le, 1.0);
        assert!(matches!(
            m.validate(),
            Err(ModelError::UnknownVariable { var: 7, .. })
        ));
    }

    #[test]
    fn test_validate_inverted_bounds() {
        let mut m = ModelSpec::new("bad-bounds", ObjectiveSense::Minimize);
        m.add_var(
            "x",
            VarDomain::Continuous {
                lower: 1.0,
                upper: 0.0,
            },
        );
        assert!(matches!(
            m.validate(),
            Err(ModelError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_name() {
        let mut m = ModelSpec::new("dup", ObjectiveSense::Minimize);
        m.add_var("x", VarDomain::nonneg());
        m.add_var("x", VarDomain::Binary);
        assert!(matches!(
            m.validate(),
            Err(ModelError::DuplicateVariable(_))
        ));
    }

    #[test]
    fn test_constraint_matrix_export() {
        let m = toy_model();
        let a = m.constraint_matrix();
        assert_eq!(a.rows(), 2);
        assert_eq!(a.cols(), 2);
        assert_eq!(a.nnz(), 3);
        assert_eq!(m.rhs(), vec![10.0, 8.0]);

        // Determinism: rebuilding yields an identical structure.
        let b = toy_model().constraint_matrix();
        assert_eq!(a.indptr().raw_storage(), b.indptr().raw_storage());
        assert_eq!(a.indices(), b.indices());
        assert_eq!(a.data(), b.data());
    }
}
