//! Solver backend over the `microlp` simplex / branch-and-bound crate.

use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::error::SolverError;
use crate::model::{ConstraintSense, ModelSpec, ObjectiveSense, VarDomain};
use crate::solution::SolveResult;
use crate::solver::Solver;

/// Backend that lowers a [`ModelSpec`] to a [`microlp::Problem`].
///
/// The backend is stateless: each [`Solver::solve`] call builds a fresh
/// `microlp::Problem`, so consecutive solves are fully independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    /// Create a backend instance.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, model: &ModelSpec) -> Result<SolveResult, SolverError> {
        model.validate()?;

        let direction = match model.objective.sense {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };

        // microlp takes the objective coefficient at variable creation,
        // so densify the objective first.
        let n = model.num_vars();
        let mut obj = vec![0.0; n];
        for &(j, c) in &model.objective.terms.terms {
            obj[j] += c;
        }

        let mut problem = Problem::new(direction);
        let mut vars = Vec::with_capacity(n);
        for (j, spec) in model.vars.iter().enumerate() {
            let var = match spec.domain {
                VarDomain::Continuous { lower, upper } => problem.add_var(obj[j], (lower, upper)),
                VarDomain::Integer { lower, upper } => {
                    problem.add_integer_var(obj[j], (lower, upper))
                }
                VarDomain::Binary => problem.add_binary_var(obj[j]),
            };
            vars.push(var);
        }

        for con in &model.constraints {
            let op = match con.sense {
                ConstraintSense::Eq => ComparisonOp::Eq,
                ConstraintSense::Le => ComparisonOp::Le,
                ConstraintSense::Ge => ComparisonOp::Ge,
            };
            let row: Vec<(microlp::Variable, f64)> = con
                .expr
                .terms
                .iter()
                .map(|&(j, c)| (vars[j], c))
                .collect();
            problem.add_constraint(&row, op, con.rhs);
        }

        log::debug!(
            "solving {:?} with microlp: n={}, m={}",
            model.name,
            model.num_vars(),
            model.num_constraints()
        );

        match problem.solve() {
            Ok(solution) => {
                let x: Vec<f64> = vars.iter().map(|&v| *solution.var_value(v)).collect();
                let obj_val = solution.objective() + model.objective.constant;
                Ok(SolveResult::optimal(x, obj_val))
            }
            Err(microlp::Error::Infeasible) => Ok(SolveResult::infeasible()),
            Err(microlp::Error::Unbounded) => Ok(SolveResult::unbounded()),
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearExpr, ModelSpec, ObjectiveSense, VarDomain};
    use crate::solution::SolveStatus;

    #[test]
    fn test_simple_lp() {
        // min x0 + 2 x1  s.t. x0 + x1 = 10, x0 <= 8, x >= 0
        // Optimum: x = (8, 2), obj = 12.
        let mut m = ModelSpec::new("lp", ObjectiveSense::Minimize);
        let x0 = m.add_var("x0", VarDomain::nonneg());
        let x1 = m.add_var("x1", VarDomain::nonneg());
        m.add_objective_term(x0, 1.0);
        m.add_objective_term(x1, 2.0);
        let mut total = LinearExpr::empty();
        total.add(x0, 1.0);
        total.add(x1, 1.0);
        m.add_constraint("total", total, ConstraintSense::Eq, 10.0);
        let mut cap = LinearExpr::empty();
        cap.add(x0, 1.0);
        m.add_constraint("cap", cap, ConstraintSense::Le, 8.0);

        let result = MicrolpSolver::new().solve(&m).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.obj_val - 12.0).abs() < 1e-6);
        assert!((result.x[0] - 8.0).abs() < 1e-6);
        assert!((result.x[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_maximize_with_binary() {
        // max 3 y0 + 2 y1  s.t. y0 + y1 <= 1, binary.
        let mut m = ModelSpec::new("knapsack", ObjectiveSense::Maximize);
        let y0 = m.add_var("y0", VarDomain::Binary);
        let y1 = m.add_var("y1", VarDomain::Binary);
        m.add_objective_term(y0, 3.0);
        m.add_objective_term(y1, 2.0);
        let mut row = LinearExpr::empty();
        row.add(y0, 1.0);
        row.add(y1, 1.0);
        m.add_constraint("pick_one", row, ConstraintSense::Le, 1.0);

        let result = MicrolpSolver::new().solve(&m).unwrap();
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.obj_val - 3.0).abs() < 1e-6);
        assert!((result.x[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_is_status_not_error() {
        // x >= 2 and x <= 1 cannot hold.
        let mut m = ModelSpec::new("empty", ObjectiveSense::Minimize);
        let x = m.add_var("x", VarDomain::nonneg());
        m.add_objective_term(x, 1.0);
        let mut ge = LinearExpr::empty();
        ge.add(x, 1.0);
        m.add_constraint("ge2", ge.clone(), ConstraintSense::Ge, 2.0);
        m.add_constraint("le1", ge, ConstraintSense::Le, 1.0);

        let result = MicrolpSolver::new().solve(&m).unwrap();
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.obj_val.is_infinite());
    }

    #[test]
    fn test_unbounded_is_status_not_error() {
        // min -x with x >= 1 and no upper bound.
        let mut m = ModelSpec::new("unbounded", ObjectiveSense::Minimize);
        let x = m.add_var("x", VarDomain::nonneg());
        m.add_objective_term(x, -1.0);
        let mut row = LinearExpr::empty();
        row.add(x, 1.0);
        m.add_constraint("floor", row, ConstraintSense::Ge, 1.0);

        let result = MicrolpSolver::new().solve(&m).unwrap();
        assert_eq!(result.status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_invalid_model_rejected_before_backend() {
        let mut m = ModelSpec::new("bad", ObjectiveSense::Minimize);
        let mut row = LinearExpr::empty();
        row.add(3, 1.0); // no variables exist
        m.add_constraint("dangling", row, ConstraintSense::Le, 1.0);

        let err = MicrolpSolver::new().solve(&m).unwrap_err();
        assert!(matches!(err, SolverError::InvalidModel(_)));
    }

    #[test]
    fn test_objective_constant_offset() {
        let mut m = ModelSpec::new("offset", ObjectiveSense::Minimize);
        let x = m.add_var("x", VarDomain::Continuous { lower: 1.0, upper: 5.0 });
        m.add_objective_term(x, 2.0);
        m.objective.constant = 100.0;

        let result = MicrolpSolver::new().solve(&m).unwrap();
        assert!((result.obj_val - 102.0).abs() < 1e-6);
    }
}
