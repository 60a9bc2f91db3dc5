//! Scenario configuration and the sweep driver.
//!
//! A sweep re-solves the same base specification under a sequence of
//! variations (a removed template, an adjusted parameter). Every
//! scenario gets a freshly built model; nothing is carried over from
//! one solve to the next, so results are reproducible in isolation and
//! in any order. Variations run in the order supplied; a variation
//! flagged stop-on-infeasible halts the sweep at the first infeasible
//! outcome, which is how parametric threshold searches terminate.

use lpsweep_core::{SolveResult, SolveStatus, Solver};

use crate::builder::{ModelBuilder, ModelInputs};
use crate::error::{ConfigError, Error};
use crate::spec::{BuildSpec, TemplateSpec};

/// An edit applied to a base spec to derive one scenario.
#[derive(Debug, Clone)]
pub enum ScenarioDelta {
    /// Append a template.
    AddTemplate(TemplateSpec),

    /// Remove the template with this label.
    RemoveTemplate(String),

    /// Set the primary parameter of the template with this label.
    SetParam {
        /// Template label.
        label: String,
        /// New parameter value.
        value: f64,
    },
}

/// One fully specified model variant. Immutable; built once, solved
/// once, then discarded.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Scenario label, used in reports.
    pub label: String,

    /// The derived build spec.
    pub spec: BuildSpec,
}

impl ScenarioConfig {
    /// Derive a scenario by applying deltas to a base spec.
    pub fn derive(
        base: &BuildSpec,
        label: impl Into<String>,
        deltas: &[ScenarioDelta],
    ) -> Result<Self, ConfigError> {
        let mut spec = base.clone();
        for delta in deltas {
            match delta {
                ScenarioDelta::AddTemplate(template) => {
                    if spec.template_position(&template.label).is_some() {
                        return Err(ConfigError::DuplicateName {
                            kind: "template label",
                            name: template.label.clone(),
                        });
                    }
                    spec.templates.push(template.clone());
                }
                ScenarioDelta::RemoveTemplate(target) => {
                    let pos = spec
                        .template_position(target)
                        .ok_or_else(|| ConfigError::UnknownTemplate(target.clone()))?;
                    spec.templates.remove(pos);
                }
                ScenarioDelta::SetParam { label: target, value } => {
                    let pos = spec
                        .template_position(target)
                        .ok_or_else(|| ConfigError::UnknownTemplate(target.clone()))?;
                    let param = spec.templates[pos]
                        .rule
                        .param_mut()
                        .ok_or_else(|| ConfigError::NoParameter(target.clone()))?;
                    if !value.is_finite() {
                        return Err(ConfigError::Invalid {
                            label: target.clone(),
                            reason: format!("parameter must be finite, got {value}"),
                        });
                    }
                    *param = *value;
                }
            }
        }
        Ok(Self {
            label: label.into(),
            spec,
        })
    }
}

/// One entry of a sweep: a label, the deltas, and the halt policy.
#[derive(Debug, Clone)]
pub struct Variation {
    /// Scenario label.
    pub label: String,

    /// Deltas applied to the base spec.
    pub deltas: Vec<ScenarioDelta>,

    /// Halt the sweep if this scenario comes back infeasible.
    pub stop_on_infeasible: bool,
}

impl Variation {
    /// A variation with no deltas (re-solves the base spec).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            deltas: Vec::new(),
            stop_on_infeasible: false,
        }
    }

    /// Append a delta.
    pub fn with_delta(mut self, delta: ScenarioDelta) -> Self {
        self.deltas.push(delta);
        self
    }

    /// Halt the sweep at this scenario's infeasibility.
    pub fn stop_on_infeasible(mut self) -> Self {
        self.stop_on_infeasible = true;
        self
    }
}

/// Outcome of one scenario: the config that produced it and the solver
/// verdict. Infeasibility lives here as data, never as an error.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    /// The scenario that was solved.
    pub config: ScenarioConfig,

    /// Solve outcome.
    pub result: SolveResult,
}

/// Run every variation against the base spec, in order.
///
/// Each scenario is derived, built from scratch, and solved in
/// isolation. `SchemaError`/`ConfigError`-class failures and solver
/// breakdowns abort the sweep with an error; infeasible scenarios are
/// recorded as outcomes. When a variation with `stop_on_infeasible`
/// produces an infeasible result, the sweep returns everything solved
/// so far plus that terminating entry.
pub fn sweep(
    inputs: &ModelInputs,
    base: &BuildSpec,
    variations: &[Variation],
    solver: &dyn Solver,
) -> Result<Vec<ScenarioOutcome>, Error> {
    let mut outcomes = Vec::with_capacity(variations.len());
    for variation in variations {
        let config = ScenarioConfig::derive(base, variation.label.clone(), &variation.deltas)?;
        let model = ModelBuilder::new(inputs).build(&config.spec)?;
        let result = solver.solve(&model)?;

        log::info!(
            "scenario {:?}: {} (objective {})",
            config.label,
            result.status,
            result.obj_val
        );

        let infeasible = result.status == SolveStatus::Infeasible;
        outcomes.push(ScenarioOutcome { config, result });

        if infeasible && variation.stop_on_infeasible {
            log::info!(
                "halting sweep at {:?}: first infeasible scenario",
                variation.label
            );
            break;
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::TemplateRule;
    use lpsweep_core::ObjectiveSense;

    fn base() -> BuildSpec {
        BuildSpec::new("m", ObjectiveSense::Minimize).with_template(
            "share",
            TemplateRule::ShareOfTotal {
                group: "ship".into(),
                capacity_attr: "Capacity".into(),
                fraction: 0.03,
            },
        )
    }

    #[test]
    fn test_derive_set_param() {
        let config = ScenarioConfig::derive(
            &base(),
            "alpha=2.5%",
            &[ScenarioDelta::SetParam {
                label: "share".into(),
                value: 0.025,
            }],
        )
        .unwrap();
        assert_eq!(config.spec.templates[0].rule.param(), Some(0.025));
        // The base spec is untouched.
        assert_eq!(base().templates[0].rule.param(), Some(0.03));
    }

    #[test]
    fn test_derive_remove_and_unknown() {
        let config = ScenarioConfig::derive(
            &base(),
            "relaxed",
            &[ScenarioDelta::RemoveTemplate("share".into())],
        )
        .unwrap();
        assert!(config.spec.templates.is_empty());

        let err = ScenarioConfig::derive(
            &base(),
            "bad",
            &[ScenarioDelta::RemoveTemplate("ghost".into())],
        );
        assert!(matches!(err, Err(ConfigError::UnknownTemplate(_))));
    }

    #[test]
    fn test_derive_no_parameter() {
        let spec = BuildSpec::new("m", ObjectiveSense::Minimize).with_template(
            "balance",
            TemplateRule::FlowBalance {
                out_group: "deliver".into(),
                in_group: "ship".into(),
            },
        );
        let err = ScenarioConfig::derive(
            &spec,
            "bad",
            &[ScenarioDelta::SetParam {
                label: "balance".into(),
                value: 1.0,
            }],
        );
        assert!(matches!(err, Err(ConfigError::NoParameter(_))));
    }

    #[test]
    fn test_derive_duplicate_add() {
        let err = ScenarioConfig::derive(
            &base(),
            "dup",
            &[ScenarioDelta::AddTemplate(TemplateSpec::new(
                "share",
                TemplateRule::ColCover {
                    group: "ship".into(),
                    times: 1.0,
                },
            ))],
        );
        assert!(matches!(err, Err(ConfigError::DuplicateName { .. })));
    }
}
