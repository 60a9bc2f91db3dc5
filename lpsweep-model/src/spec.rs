//! Declarative build specification: variable groups and constraint
//! templates.
//!
//! A [`BuildSpec`] is the configuration the model builder consumes: an
//! ordered list of variable groups plus an ordered list of labelled
//! constraint templates. Scenario deltas edit this value (add or remove
//! a template, adjust its parameter); the builder never mutates it.

use lpsweep_core::{ConstraintSense, ObjectiveSense, VarDomain};

/// How a group's variables are indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// One variable per (row entity, column entity) pair.
    Pair {
        /// Table providing row entities.
        rows: String,
        /// Table providing column entities.
        cols: String,
    },

    /// One variable per entity.
    PerEntity {
        /// Table providing the entities.
        table: String,
    },
}

/// Per-unit objective cost of a group's variables.
///
/// The cost of one variable is the sum of whichever components are
/// declared: a pair-index coefficient, a row-entity attribute, a
/// column-entity attribute, and a fixed constant. For `PerEntity`
/// groups only `row_attr` and `fixed` apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostSpec {
    /// Pair index contributing a per-pair coefficient.
    pub index: Option<String>,

    /// Numeric attribute on the row table contributing per-unit cost.
    pub row_attr: Option<String>,

    /// Numeric attribute on the column table contributing per-unit cost.
    pub col_attr: Option<String>,

    /// Constant per-unit cost.
    pub fixed: f64,
}

impl CostSpec {
    /// Zero cost.
    pub fn free() -> Self {
        Self::default()
    }

    /// Cost drawn from a pair index.
    pub fn from_index(index: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            ..Self::default()
        }
    }

    /// Constant per-unit cost.
    pub fn fixed(cost: f64) -> Self {
        Self {
            fixed: cost,
            ..Self::default()
        }
    }

    /// Add a row-attribute component.
    pub fn plus_row_attr(mut self, attr: impl Into<String>) -> Self {
        self.row_attr = Some(attr.into());
        self
    }

    /// Add a column-attribute component.
    pub fn plus_col_attr(mut self, attr: impl Into<String>) -> Self {
        self.col_attr = Some(attr.into());
        self
    }
}

/// A named group of decision variables.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Group name; variable names are `{name}[{entities}]`.
    pub name: String,

    /// Indexing scheme.
    pub kind: GroupKind,

    /// Domain shared by all variables in the group.
    pub domain: VarDomain,

    /// Objective cost of the group's variables.
    pub cost: CostSpec,
}

/// A parametrized constraint rule.
///
/// Each variant is instantiated once per applicable entity combination,
/// in entity declaration order. Attribute names refer to numeric
/// columns unless noted otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateRule {
    /// Per row entity `r`: sum over columns of `x[r,c] <= capacity(r)`.
    RowCapacity {
        /// Pair group the rule applies to.
        group: String,
        /// Capacity attribute on the row table.
        capacity_attr: String,
    },

    /// Per column entity `c`: sum over rows of `x[r,c] <= capacity(c)`.
    ColCapacity {
        /// Pair group the rule applies to.
        group: String,
        /// Capacity attribute on the column table.
        capacity_attr: String,
    },

    /// Per column entity `c`: sum over rows of `x[r,c] {sense} demand(c)`.
    ColDemand {
        /// Pair group the rule applies to.
        group: String,
        /// Demand attribute on the column table.
        demand_attr: String,
        /// Relation between delivered quantity and demand.
        sense: ConstraintSense,
    },

    /// Per column entity `c`: sum over rows of `x[r,c] = times`
    /// (set covering / partitioning).
    ColCover {
        /// Pair group the rule applies to.
        group: String,
        /// Required cover multiplicity (1 = exactly once).
        times: f64,
    },

    /// Per shared entity `e`: outflow cannot exceed inflow,
    /// `sum_c out[e,c] <= sum_r in[r,e]`. The out group's row table must
    /// be the in group's column table.
    FlowBalance {
        /// Downstream pair group (rows are the shared stage).
        out_group: String,
        /// Upstream pair group (columns are the shared stage).
        in_group: String,
    },

    /// Per column entity `c`: sum over rows of
    /// `x[r,c] <= fraction * total`, where `total` is the sum of
    /// `capacity_attr` over the whole row table. This is the parametric
    /// share rule swept in threshold searches.
    ShareOfTotal {
        /// Pair group the rule applies to.
        group: String,
        /// Capacity attribute on the row table whose total is shared.
        capacity_attr: String,
        /// Allowed fraction of the total, e.g. 0.03.
        fraction: f64,
    },

    /// Per pair `(r,c)`: `x[r,c] <= fraction * demand(c)` — no single
    /// row may serve more than a fraction of one column's demand.
    PairShare {
        /// Pair group the rule applies to.
        group: String,
        /// Demand attribute on the column table.
        demand_attr: String,
        /// Allowed fraction of each column's demand.
        fraction: f64,
    },

    /// Fix `x[r,c] = 0` whenever the row and column entities disagree
    /// on a categorical tag (for example a region restriction).
    ForbidTagMismatch {
        /// Pair group the rule applies to.
        group: String,
        /// Categorical column present on both tables.
        tag: String,
    },

    /// Fix `x[r,c] = 0` for every column whenever a row attribute falls
    /// below a threshold (for example a minimum quality grade).
    ForbidBelow {
        /// Pair group the rule applies to.
        group: String,
        /// Attribute on the row table.
        attr: String,
        /// Rows with `attr < min_value` are excluded.
        min_value: f64,
    },

    /// Per column entity `c`: the quality-weighted blend must sit inside
    /// a band relative to demand,
    /// `low * demand(c) <= sum_r quality(r) * x[r,c] <= high * demand(c)`.
    QualityBand {
        /// Pair group the rule applies to.
        group: String,
        /// Quality attribute on the row table.
        quality_attr: String,
        /// Demand attribute on the column table.
        demand_attr: String,
        /// Lower band fraction.
        low: f64,
        /// Upper band fraction.
        high: f64,
    },

    /// Per row entity `r`: `sum_c weight(c) * x[r,c] <= cap` (for
    /// example total assigned hours within a shift).
    RowWeightedCapacity {
        /// Pair group the rule applies to.
        group: String,
        /// Weight attribute on the column table.
        weight_attr: String,
        /// Capacity shared by every row.
        cap: f64,
    },

    /// Link an assignment group to per-row usage flags:
    /// `sum_c x[r,c] <= |cols| * y[r]`. Assigning anything to `r`
    /// forces its flag to 1.
    Activation {
        /// Pair group carrying the assignments.
        assign_group: String,
        /// PerEntity binary group on the assignment rows.
        flag_group: String,
    },

    /// Threshold indicator lowered to big-M form:
    /// `sum_c weight(c) * x[r,c] - M * y[r] <= threshold`. A row whose
    /// weighted load exceeds the threshold forces its flag to 1. When
    /// `big_m` is `None` a conservative constant is used: the sum of
    /// absolute weights over all columns, which bounds any achievable
    /// load. A strict ">" trigger cannot be expressed exactly in
    /// floating point; loads exactly at the threshold leave the flag
    /// free.
    Indicator {
        /// Pair group carrying the assignments.
        assign_group: String,
        /// PerEntity binary group on the assignment rows.
        flag_group: String,
        /// Weight attribute on the column table.
        weight_attr: String,
        /// Load threshold above which the flag must be set.
        threshold: f64,
        /// Explicit big-M constant; defaults to the sum of |weights|.
        big_m: Option<f64>,
    },
}

impl TemplateRule {
    /// Short rule name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TemplateRule::RowCapacity { .. } => "row-capacity",
            TemplateRule::ColCapacity { .. } => "col-capacity",
            TemplateRule::ColDemand { .. } => "col-demand",
            TemplateRule::ColCover { .. } => "col-cover",
            TemplateRule::FlowBalance { .. } => "flow-balance",
            TemplateRule::ShareOfTotal { .. } => "share-of-total",
            TemplateRule::PairShare { .. } => "pair-share",
            TemplateRule::ForbidTagMismatch { .. } => "forbid-tag-mismatch",
            TemplateRule::ForbidBelow { .. } => "forbid-below",
            TemplateRule::QualityBand { .. } => "quality-band",
            TemplateRule::RowWeightedCapacity { .. } => "row-weighted-capacity",
            TemplateRule::Activation { .. } => "activation",
            TemplateRule::Indicator { .. } => "indicator",
        }
    }

    /// Mutable access to the rule's primary numeric parameter, if it
    /// has one. This is the value scenario deltas adjust.
    pub fn param_mut(&mut self) -> Option<&mut f64> {
        match self {
            TemplateRule::ColCover { times, .. } => Some(times),
            TemplateRule::ShareOfTotal { fraction, .. } => Some(fraction),
            TemplateRule::PairShare { fraction, .. } => Some(fraction),
            TemplateRule::ForbidBelow { min_value, .. } => Some(min_value),
            TemplateRule::RowWeightedCapacity { cap, .. } => Some(cap),
            TemplateRule::Indicator { threshold, .. } => Some(threshold),
            _ => None,
        }
    }

    /// Read-only view of the primary numeric parameter.
    pub fn param(&self) -> Option<f64> {
        match self {
            TemplateRule::ColCover { times, .. } => Some(*times),
            TemplateRule::ShareOfTotal { fraction, .. } => Some(*fraction),
            TemplateRule::PairShare { fraction, .. } => Some(*fraction),
            TemplateRule::ForbidBelow { min_value, .. } => Some(*min_value),
            TemplateRule::RowWeightedCapacity { cap, .. } => Some(*cap),
            TemplateRule::Indicator { threshold, .. } => Some(*threshold),
            _ => None,
        }
    }
}

/// A labelled template instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSpec {
    /// Unique label; scenario deltas address templates by it.
    pub label: String,

    /// The rule and its parameters.
    pub rule: TemplateRule,
}

impl TemplateSpec {
    /// Create a labelled template.
    pub fn new(label: impl Into<String>, rule: TemplateRule) -> Self {
        Self {
            label: label.into(),
            rule,
        }
    }
}

/// Complete, ordered build specification for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSpec {
    /// Model name.
    pub name: String,

    /// Optimization direction.
    pub sense: ObjectiveSense,

    /// Variable groups, in declaration order.
    pub groups: Vec<GroupSpec>,

    /// Constraint templates, in declaration order.
    pub templates: Vec<TemplateSpec>,
}

impl BuildSpec {
    /// Empty spec.
    pub fn new(name: impl Into<String>, sense: ObjectiveSense) -> Self {
        Self {
            name: name.into(),
            sense,
            groups: Vec::new(),
            templates: Vec::new(),
        }
    }

    /// Append a variable group.
    pub fn with_group(
        mut self,
        name: impl Into<String>,
        kind: GroupKind,
        domain: VarDomain,
        cost: CostSpec,
    ) -> Self {
        self.groups.push(GroupSpec {
            name: name.into(),
            kind,
            domain,
            cost,
        });
        self
    }

    /// Append a labelled template.
    pub fn with_template(mut self, label: impl Into<String>, rule: TemplateRule) -> Self {
        self.templates.push(TemplateSpec::new(label, rule));
        self
    }

    /// Position of a template by label.
    pub fn template_position(&self, label: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_access() {
        let mut rule = TemplateRule::ShareOfTotal {
            group: "ship".into(),
            capacity_attr: "Capacity".into(),
            fraction: 0.03,
        };
        assert_eq!(rule.param(), Some(0.03));
        *rule.param_mut().unwrap() = 0.025;
        assert_eq!(rule.param(), Some(0.025));

        let mut fixed = TemplateRule::FlowBalance {
            out_group: "deliver".into(),
            in_group: "ship".into(),
        };
        assert!(fixed.param_mut().is_none());
    }

    #[test]
    fn test_template_position() {
        let spec = BuildSpec::new("m", ObjectiveSense::Minimize)
            .with_template(
                "cap",
                TemplateRule::RowCapacity {
                    group: "ship".into(),
                    capacity_attr: "Capacity".into(),
                },
            )
            .with_template(
                "share",
                TemplateRule::ShareOfTotal {
                    group: "ship".into(),
                    capacity_attr: "Capacity".into(),
                    fraction: 0.03,
                },
            );
        assert_eq!(spec.template_position("share"), Some(1));
        assert_eq!(spec.template_position("nope"), None);
    }
}
