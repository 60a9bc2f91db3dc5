//! Model builder: lowers a [`BuildSpec`] against entity tables and pair
//! indexes into a [`ModelSpec`].
//!
//! The build runs in two phases. The resolve phase checks every group
//! and template reference (tables, columns, index keys, group kinds)
//! and lowers all constraints to concrete rows; any [`ConfigError`] is
//! raised here, before a single decision variable exists, so a partial
//! model can never escape. The emit phase then materializes variables,
//! objective terms, and rows; it cannot fail.
//!
//! Determinism: variables are created in group-declaration order, row
//! entities outer, column entities inner; constraints follow template
//! declaration order. Identical inputs therefore produce structurally
//! identical models.

use std::collections::{BTreeMap, HashSet};

use lpsweep_core::{ConstraintSense, LinearExpr, ModelSpec, VarDomain};

use crate::error::ConfigError;
use crate::index::PairIndex;
use crate::spec::{BuildSpec, CostSpec, GroupKind, TemplateRule, TemplateSpec};
use crate::tables::EntityTable;

/// The read-only inputs a build draws from: named entity tables and
/// named pair indexes. Shared by reference across scenario builds.
#[derive(Debug, Clone, Default)]
pub struct ModelInputs {
    tables: BTreeMap<String, EntityTable>,
    indexes: BTreeMap<String, PairIndex>,
}

impl ModelInputs {
    /// Empty inputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its own name.
    pub fn add_table(&mut self, table: EntityTable) -> &mut Self {
        self.tables.insert(table.name().to_string(), table);
        self
    }

    /// Register a pair index under its own name.
    pub fn add_index(&mut self, index: PairIndex) -> &mut Self {
        self.indexes.insert(index.name().to_string(), index);
        self
    }

    /// Look up a table.
    pub fn table(&self, name: &str) -> Option<&EntityTable> {
        self.tables.get(name)
    }

    /// Look up a pair index.
    pub fn index(&self, name: &str) -> Option<&PairIndex> {
        self.indexes.get(name)
    }
}

/// One variable to be created, fully resolved.
struct PlannedVar {
    name: String,
    domain: VarDomain,
    cost: f64,
}

/// One constraint row, fully resolved.
struct PlannedRow {
    name: String,
    expr: LinearExpr,
    sense: ConstraintSense,
    rhs: f64,
}

/// Resolved layout of one variable group.
struct PlannedGroup {
    name: String,
    offset: usize,
    shape: PlannedShape,
}

enum PlannedShape {
    Pair {
        rows_table: String,
        cols_table: String,
        row_ids: Vec<String>,
        col_ids: Vec<String>,
        binary: bool,
    },
    PerEntity {
        table: String,
        ids: Vec<String>,
        binary: bool,
    },
}

impl PlannedGroup {
    fn count(&self) -> usize {
        match &self.shape {
            PlannedShape::Pair {
                row_ids, col_ids, ..
            } => row_ids.len() * col_ids.len(),
            PlannedShape::PerEntity { ids, .. } => ids.len(),
        }
    }
}

/// Borrowed view of a planned pair group, with variable addressing.
struct PairView<'p> {
    rows_table: &'p str,
    cols_table: &'p str,
    row_ids: &'p [String],
    col_ids: &'p [String],
    offset: usize,
    binary: bool,
}

impl<'p> PairView<'p> {
    fn var(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.col_ids.len() + col
    }
}

/// Borrowed view of a planned per-entity group.
struct EntityView<'p> {
    table: &'p str,
    offset: usize,
    binary: bool,
}

impl<'p> EntityView<'p> {
    fn var(&self, pos: usize) -> usize {
        self.offset + pos
    }
}

struct Plan {
    vars: Vec<PlannedVar>,
    rows: Vec<PlannedRow>,
}

/// Assembles fresh [`ModelSpec`] values from a [`BuildSpec`].
///
/// The builder tracks how many variables it has created; a failed build
/// leaves that count untouched, which the fail-fast tests rely on.
pub struct ModelBuilder<'a> {
    inputs: &'a ModelInputs,
    created: usize,
}

impl<'a> ModelBuilder<'a> {
    /// Builder over shared inputs.
    pub fn new(inputs: &'a ModelInputs) -> Self {
        Self { inputs, created: 0 }
    }

    /// Variables created by this builder so far.
    pub fn num_vars(&self) -> usize {
        self.created
    }

    /// Build a model. On error, no variables have been created.
    pub fn build(&mut self, spec: &BuildSpec) -> Result<ModelSpec, ConfigError> {
        let plan = self.resolve(spec)?;

        let mut model = ModelSpec::new(spec.name.clone(), spec.sense);
        for var in plan.vars {
            let idx = model.add_var(var.name, var.domain);
            model.add_objective_term(idx, var.cost);
            self.created += 1;
        }
        for row in plan.rows {
            model.add_constraint(row.name, row.expr, row.sense, row.rhs);
        }

        log::debug!(
            "built model {:?}: {} variables, {} constraints",
            model.name,
            model.num_vars(),
            model.num_constraints()
        );
        Ok(model)
    }

    // ---- resolve phase -------------------------------------------------

    fn resolve(&self, spec: &BuildSpec) -> Result<Plan, ConfigError> {
        let mut groups: Vec<PlannedGroup> = Vec::with_capacity(spec.groups.len());
        let mut vars = Vec::new();
        let mut offset = 0;

        for group in &spec.groups {
            if groups.iter().any(|g| g.name == group.name) {
                return Err(ConfigError::DuplicateName {
                    kind: "group",
                    name: group.name.clone(),
                });
            }
            let context = format!("group {:?}", group.name);
            let binary = matches!(group.domain, VarDomain::Binary);

            let planned = match &group.kind {
                GroupKind::Pair { rows, cols } => {
                    let rt = self.lookup_table(&context, rows)?;
                    let ct = self.lookup_table(&context, cols)?;
                    let costs =
                        self.pair_costs(&context, &group.cost, rt, ct)?;
                    for (k, (row_id, col_id)) in rt
                        .ids()
                        .iter()
                        .flat_map(|r| ct.ids().iter().map(move |c| (r, c)))
                        .enumerate()
                    {
                        vars.push(PlannedVar {
                            name: format!("{}[{},{}]", group.name, row_id, col_id),
                            domain: group.domain,
                            cost: costs[k],
                        });
                    }
                    PlannedGroup {
                        name: group.name.clone(),
                        offset,
                        shape: PlannedShape::Pair {
                            rows_table: rows.clone(),
                            cols_table: cols.clone(),
                            row_ids: rt.ids().to_vec(),
                            col_ids: ct.ids().to_vec(),
                            binary,
                        },
                    }
                }
                GroupKind::PerEntity { table } => {
                    let t = self.lookup_table(&context, table)?;
                    let costs = self.entity_costs(&context, &group.cost, t)?;
                    for (k, id) in t.ids().iter().enumerate() {
                        vars.push(PlannedVar {
                            name: format!("{}[{}]", group.name, id),
                            domain: group.domain,
                            cost: costs[k],
                        });
                    }
                    PlannedGroup {
                        name: group.name.clone(),
                        offset,
                        shape: PlannedShape::PerEntity {
                            table: table.clone(),
                            ids: t.ids().to_vec(),
                            binary,
                        },
                    }
                }
            };
            offset += planned.count();
            groups.push(planned);
        }

        let mut rows = Vec::new();
        let mut labels = HashSet::new();
        for template in &spec.templates {
            if !labels.insert(template.label.as_str()) {
                return Err(ConfigError::DuplicateName {
                    kind: "template label",
                    name: template.label.clone(),
                });
            }
            self.lower_template(template, &groups, &mut rows)?;
        }

        Ok(Plan { vars, rows })
    }

    fn lookup_table(&self, context: &str, name: &str) -> Result<&'a EntityTable, ConfigError> {
        self.inputs
            .table(name)
            .ok_or_else(|| ConfigError::UnknownTable {
                context: context.to_string(),
                table: name.to_string(),
            })
    }

    fn lookup_index(&self, context: &str, name: &str) -> Result<&'a PairIndex, ConfigError> {
        self.inputs
            .index(name)
            .ok_or_else(|| ConfigError::UnknownIndex {
                context: context.to_string(),
                index: name.to_string(),
            })
    }

    fn lookup_numeric<'t>(
        &self,
        context: &str,
        table: &'t EntityTable,
        column: &str,
    ) -> Result<&'t [f64], ConfigError> {
        table
            .numeric_opt(column)
            .ok_or_else(|| ConfigError::UnknownAttribute {
                context: context.to_string(),
                table: table.name().to_string(),
                column: column.to_string(),
            })
    }

    fn lookup_tag<'t>(
        &self,
        context: &str,
        table: &'t EntityTable,
        column: &str,
    ) -> Result<&'t [String], ConfigError> {
        table
            .tag_opt(column)
            .ok_or_else(|| ConfigError::UnknownAttribute {
                context: context.to_string(),
                table: table.name().to_string(),
                column: column.to_string(),
            })
    }

    fn pair_costs(
        &self,
        context: &str,
        cost: &CostSpec,
        rows: &EntityTable,
        cols: &EntityTable,
    ) -> Result<Vec<f64>, ConfigError> {
        let index = match &cost.index {
            Some(name) => Some(self.lookup_index(context, name)?),
            None => None,
        };
        let row_costs = match &cost.row_attr {
            Some(attr) => Some(self.lookup_numeric(context, rows, attr)?),
            None => None,
        };
        let col_costs = match &cost.col_attr {
            Some(attr) => Some(self.lookup_numeric(context, cols, attr)?),
            None => None,
        };

        let mut costs = Vec::with_capacity(rows.len() * cols.len());
        for (ri, row_id) in rows.ids().iter().enumerate() {
            for (ci, col_id) in cols.ids().iter().enumerate() {
                let mut c = cost.fixed;
                if let Some(ix) = index {
                    c += ix
                        .get(row_id, col_id)
                        .ok_or_else(|| ConfigError::MissingIndexKey {
                            context: context.to_string(),
                            index: ix.name().to_string(),
                            row: row_id.clone(),
                            col: col_id.clone(),
                        })?;
                }
                if let Some(rc) = row_costs {
                    c += rc[ri];
                }
                if let Some(cc) = col_costs {
                    c += cc[ci];
                }
                costs.push(c);
            }
        }
        Ok(costs)
    }

    fn entity_costs(
        &self,
        context: &str,
        cost: &CostSpec,
        table: &EntityTable,
    ) -> Result<Vec<f64>, ConfigError> {
        let attr_costs = match &cost.row_attr {
            Some(attr) => Some(self.lookup_numeric(context, table, attr)?),
            None => None,
        };
        Ok((0..table.len())
            .map(|i| cost.fixed + attr_costs.map_or(0.0, |a| a[i]))
            .collect())
    }

    // ---- template lowering ---------------------------------------------

    fn pair_view<'p>(
        &self,
        label: &str,
        groups: &'p [PlannedGroup],
        name: &str,
    ) -> Result<PairView<'p>, ConfigError> {
        let group = groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| ConfigError::UnknownGroup {
                label: label.to_string(),
                group: name.to_string(),
            })?;
        match &group.shape {
            PlannedShape::Pair {
                rows_table,
                cols_table,
                row_ids,
                col_ids,
                binary,
            } => Ok(PairView {
                rows_table,
                cols_table,
                row_ids,
                col_ids,
                offset: group.offset,
                binary: *binary,
            }),
            PlannedShape::PerEntity { .. } => Err(ConfigError::Invalid {
                label: label.to_string(),
                reason: format!("group {name:?} is per-entity, expected a pair group"),
            }),
        }
    }

    fn entity_view<'p>(
        &self,
        label: &str,
        groups: &'p [PlannedGroup],
        name: &str,
    ) -> Result<EntityView<'p>, ConfigError> {
        let group = groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| ConfigError::UnknownGroup {
                label: label.to_string(),
                group: name.to_string(),
            })?;
        match &group.shape {
            PlannedShape::PerEntity { table, binary, .. } => Ok(EntityView {
                table,
                offset: group.offset,
                binary: *binary,
            }),
            PlannedShape::Pair { .. } => Err(ConfigError::Invalid {
                label: label.to_string(),
                reason: format!("group {name:?} is a pair group, expected per-entity"),
            }),
        }
    }

    fn finite_param(label: &str, name: &str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                label: label.to_string(),
                reason: format!("{name} must be finite, got {value}"),
            })
        }
    }

    fn lower_template(
        &self,
        template: &TemplateSpec,
        groups: &[PlannedGroup],
        out: &mut Vec<PlannedRow>,
    ) -> Result<(), ConfigError> {
        let label = template.label.as_str();
        match &template.rule {
            TemplateRule::RowCapacity {
                group,
                capacity_attr,
            } => {
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.rows_table)?;
                let caps = self.lookup_numeric(label, table, capacity_attr)?;
                for (ri, row_id) in view.row_ids.iter().enumerate() {
                    let expr = (0..view.col_ids.len())
                        .map(|ci| (view.var(ri, ci), 1.0))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{row_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: caps[ri],
                    });
                }
            }

            TemplateRule::ColCapacity {
                group,
                capacity_attr,
            } => {
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.cols_table)?;
                let caps = self.lookup_numeric(label, table, capacity_attr)?;
                for (ci, col_id) in view.col_ids.iter().enumerate() {
                    let expr = (0..view.row_ids.len())
                        .map(|ri| (view.var(ri, ci), 1.0))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{col_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: caps[ci],
                    });
                }
            }

            TemplateRule::ColDemand {
                group,
                demand_attr,
                sense,
            } => {
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.cols_table)?;
                let demands = self.lookup_numeric(label, table, demand_attr)?;
                for (ci, col_id) in view.col_ids.iter().enumerate() {
                    let expr = (0..view.row_ids.len())
                        .map(|ri| (view.var(ri, ci), 1.0))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{col_id}]"),
                        expr,
                        sense: *sense,
                        rhs: demands[ci],
                    });
                }
            }

            TemplateRule::ColCover { group, times } => {
                Self::finite_param(label, "times", *times)?;
                let view = self.pair_view(label, groups, group)?;
                for (ci, col_id) in view.col_ids.iter().enumerate() {
                    let expr = (0..view.row_ids.len())
                        .map(|ri| (view.var(ri, ci), 1.0))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{col_id}]"),
                        expr,
                        sense: ConstraintSense::Eq,
                        rhs: *times,
                    });
                }
            }

            TemplateRule::FlowBalance {
                out_group,
                in_group,
            } => {
                let out_view = self.pair_view(label, groups, out_group)?;
                let in_view = self.pair_view(label, groups, in_group)?;
                if out_view.rows_table != in_view.cols_table {
                    return Err(ConfigError::Invalid {
                        label: label.to_string(),
                        reason: format!(
                            "out group rows ({:?}) and in group cols ({:?}) must be the same stage",
                            out_view.rows_table, in_view.cols_table
                        ),
                    });
                }
                for (e, shared_id) in out_view.row_ids.iter().enumerate() {
                    let mut expr = LinearExpr::empty();
                    for ci in 0..out_view.col_ids.len() {
                        expr.add(out_view.var(e, ci), 1.0);
                    }
                    for ri in 0..in_view.row_ids.len() {
                        expr.add(in_view.var(ri, e), -1.0);
                    }
                    out.push(PlannedRow {
                        name: format!("{label}[{shared_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: 0.0,
                    });
                }
            }

            TemplateRule::ShareOfTotal {
                group,
                capacity_attr,
                fraction,
            } => {
                Self::finite_param(label, "fraction", *fraction)?;
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.rows_table)?;
                let caps = self.lookup_numeric(label, table, capacity_attr)?;
                let total: f64 = caps.iter().sum();
                for (ci, col_id) in view.col_ids.iter().enumerate() {
                    let expr = (0..view.row_ids.len())
                        .map(|ri| (view.var(ri, ci), 1.0))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{col_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: fraction * total,
                    });
                }
            }

            TemplateRule::PairShare {
                group,
                demand_attr,
                fraction,
            } => {
                Self::finite_param(label, "fraction", *fraction)?;
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.cols_table)?;
                let demands = self.lookup_numeric(label, table, demand_attr)?;
                for (ri, row_id) in view.row_ids.iter().enumerate() {
                    for (ci, col_id) in view.col_ids.iter().enumerate() {
                        let mut expr = LinearExpr::empty();
                        expr.add(view.var(ri, ci), 1.0);
                        out.push(PlannedRow {
                            name: format!("{label}[{row_id},{col_id}]"),
                            expr,
                            sense: ConstraintSense::Le,
                            rhs: fraction * demands[ci],
                        });
                    }
                }
            }

            TemplateRule::ForbidTagMismatch { group, tag } => {
                let view = self.pair_view(label, groups, group)?;
                let row_table = self.lookup_table(label, view.rows_table)?;
                let col_table = self.lookup_table(label, view.cols_table)?;
                let row_tags = self.lookup_tag(label, row_table, tag)?;
                let col_tags = self.lookup_tag(label, col_table, tag)?;
                for (ri, row_id) in view.row_ids.iter().enumerate() {
                    for (ci, col_id) in view.col_ids.iter().enumerate() {
                        if row_tags[ri] != col_tags[ci] {
                            let mut expr = LinearExpr::empty();
                            expr.add(view.var(ri, ci), 1.0);
                            out.push(PlannedRow {
                                name: format!("{label}[{row_id},{col_id}]"),
                                expr,
                                sense: ConstraintSense::Eq,
                                rhs: 0.0,
                            });
                        }
                    }
                }
            }

            TemplateRule::ForbidBelow {
                group,
                attr,
                min_value,
            } => {
                Self::finite_param(label, "min_value", *min_value)?;
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.rows_table)?;
                let values = self.lookup_numeric(label, table, attr)?;
                for (ri, row_id) in view.row_ids.iter().enumerate() {
                    if values[ri] < *min_value {
                        for (ci, col_id) in view.col_ids.iter().enumerate() {
                            let mut expr = LinearExpr::empty();
                            expr.add(view.var(ri, ci), 1.0);
                            out.push(PlannedRow {
                                name: format!("{label}[{row_id},{col_id}]"),
                                expr,
                                sense: ConstraintSense::Eq,
                                rhs: 0.0,
                            });
                        }
                    }
                }
            }

            TemplateRule::QualityBand {
                group,
                quality_attr,
                demand_attr,
                low,
                high,
            } => {
                Self::finite_param(label, "low", *low)?;
                Self::finite_param(label, "high", *high)?;
                if low > high {
                    return Err(ConfigError::Invalid {
                        label: label.to_string(),
                        reason: format!("band is empty: low {low} > high {high}"),
                    });
                }
                let view = self.pair_view(label, groups, group)?;
                let row_table = self.lookup_table(label, view.rows_table)?;
                let col_table = self.lookup_table(label, view.cols_table)?;
                let qualities = self.lookup_numeric(label, row_table, quality_attr)?;
                let demands = self.lookup_numeric(label, col_table, demand_attr)?;
                for (ci, col_id) in view.col_ids.iter().enumerate() {
                    let expr: LinearExpr = (0..view.row_ids.len())
                        .map(|ri| (view.var(ri, ci), qualities[ri]))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}_lo[{col_id}]"),
                        expr: expr.clone(),
                        sense: ConstraintSense::Ge,
                        rhs: low * demands[ci],
                    });
                    out.push(PlannedRow {
                        name: format!("{label}_hi[{col_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: high * demands[ci],
                    });
                }
            }

            TemplateRule::RowWeightedCapacity {
                group,
                weight_attr,
                cap,
            } => {
                Self::finite_param(label, "cap", *cap)?;
                let view = self.pair_view(label, groups, group)?;
                let table = self.lookup_table(label, view.cols_table)?;
                let weights = self.lookup_numeric(label, table, weight_attr)?;
                for (ri, row_id) in view.row_ids.iter().enumerate() {
                    let expr = (0..view.col_ids.len())
                        .map(|ci| (view.var(ri, ci), weights[ci]))
                        .collect();
                    out.push(PlannedRow {
                        name: format!("{label}[{row_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: *cap,
                    });
                }
            }

            TemplateRule::Activation {
                assign_group,
                flag_group,
            } => {
                let assign = self.pair_view(label, groups, assign_group)?;
                let flags = self.entity_view(label, groups, flag_group)?;
                Self::check_link(label, &assign, &flags)?;
                let big_m = assign.col_ids.len() as f64;
                for (ri, row_id) in assign.row_ids.iter().enumerate() {
                    let mut expr = LinearExpr::empty();
                    for ci in 0..assign.col_ids.len() {
                        expr.add(assign.var(ri, ci), 1.0);
                    }
                    expr.add(flags.var(ri), -big_m);
                    out.push(PlannedRow {
                        name: format!("{label}[{row_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: 0.0,
                    });
                }
            }

            TemplateRule::Indicator {
                assign_group,
                flag_group,
                weight_attr,
                threshold,
                big_m,
            } => {
                Self::finite_param(label, "threshold", *threshold)?;
                let assign = self.pair_view(label, groups, assign_group)?;
                let flags = self.entity_view(label, groups, flag_group)?;
                Self::check_link(label, &assign, &flags)?;
                let table = self.lookup_table(label, assign.cols_table)?;
                let weights = self.lookup_numeric(label, table, weight_attr)?;
                // Conservative constant: no binary assignment row can
                // load more than the sum of absolute weights.
                let m = match big_m {
                    Some(m) => {
                        Self::finite_param(label, "big_m", *m)?;
                        *m
                    }
                    None => weights.iter().map(|w| w.abs()).sum(),
                };
                for (ri, row_id) in assign.row_ids.iter().enumerate() {
                    let mut expr: LinearExpr = (0..assign.col_ids.len())
                        .map(|ci| (assign.var(ri, ci), weights[ci]))
                        .collect();
                    expr.add(flags.var(ri), -m);
                    out.push(PlannedRow {
                        name: format!("{label}[{row_id}]"),
                        expr,
                        sense: ConstraintSense::Le,
                        rhs: *threshold,
                    });
                }
            }
        }
        Ok(())
    }

    /// Activation/indicator links require binary assignments and flags
    /// over the same row entities; the big-M constants are only valid
    /// under those domains.
    fn check_link(
        label: &str,
        assign: &PairView<'_>,
        flags: &EntityView<'_>,
    ) -> Result<(), ConfigError> {
        if !assign.binary || !flags.binary {
            return Err(ConfigError::Invalid {
                label: label.to_string(),
                reason: "activation/indicator links require binary groups".to_string(),
            });
        }
        if assign.rows_table != flags.table {
            return Err(ConfigError::Invalid {
                label: label.to_string(),
                reason: format!(
                    "flag table ({:?}) must match assignment rows ({:?})",
                    flags.table, assign.rows_table
                ),
            });
        }
        Ok(())
    }
}
