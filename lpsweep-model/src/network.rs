//! Three-tier supply-network assembly.
//!
//! The recurring model in this domain: raw material flows from sources
//! through processing facilities to demand centers. Sources sell at a
//! per-ton cost and charge freight per facility; facilities process at a
//! per-ton cost and charge freight per center; centers state a firm
//! demand. The base model minimizes total purchase + freight +
//! processing cost subject to capacities, flow conservation, and
//! demand. Optional rules bolt on: same-region delivery, a minimum
//! source quality grade, a cap on any facility's share of total source
//! capacity (the swept threshold), and a cap on any facility's share of
//! a single center's demand.

use std::path::Path;

use lpsweep_core::{ConstraintSense, ObjectiveSense, VarDomain};

use crate::builder::ModelInputs;
use crate::error::SchemaError;
use crate::index::{ColumnPattern, PairIndex};
use crate::spec::{BuildSpec, CostSpec, GroupKind, TemplateRule};
use crate::tables::EntityTable;

/// Table name for sources.
pub const SOURCES: &str = "sources";
/// Table name for processing facilities.
pub const FACILITIES: &str = "facilities";
/// Table name for demand centers.
pub const CENTERS: &str = "centers";

/// Pair index name: source -> facility freight.
pub const INBOUND_FREIGHT: &str = "inbound_freight";
/// Pair index name: facility -> center freight.
pub const OUTBOUND_FREIGHT: &str = "outbound_freight";

/// Template label of the parametric share-cap rule, the usual sweep
/// target.
pub const SHARE_CAP_LABEL: &str = "share_cap";

/// Wide-column prefix carrying freight coefficients.
const FREIGHT_PREFIX: &str = "Freight_To_";

/// Optional rules layered on the base network model.
#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    /// Facilities may only deliver to centers in their own region.
    pub same_region: bool,

    /// Exclude sources whose `Quality` is below this grade.
    pub quality_floor: Option<f64>,

    /// No facility may process more than this fraction of total source
    /// capacity.
    pub share_cap: Option<f64>,

    /// No facility may serve more than this fraction of any single
    /// center's demand.
    pub pair_share: Option<f64>,
}

/// Load the three network tables and both freight indexes.
///
/// Expected schemas (header row required):
/// - sources: `Source_ID`, `Capacity_Tons`, `Cost_Per_Ton`, `Quality`,
///   one `Freight_To_<facility>` column per facility.
/// - facilities: `Facility_ID`, `Region`, `Capacity_Tons`,
///   `Processing_Cost_Per_Ton`, one `Freight_To_<center>` column per
///   center.
/// - centers: `Center_ID`, `Region`, `Demand_Tons`.
pub fn load_network(
    sources_path: impl AsRef<Path>,
    facilities_path: impl AsRef<Path>,
    centers_path: impl AsRef<Path>,
) -> Result<ModelInputs, SchemaError> {
    let sources = EntityTable::from_path(SOURCES, "Source_ID", sources_path)?;
    let facilities = EntityTable::from_path(FACILITIES, "Facility_ID", facilities_path)?;
    let centers = EntityTable::from_path(CENTERS, "Center_ID", centers_path)?;
    assemble_inputs(sources, facilities, centers)
}

/// Build [`ModelInputs`] from already-loaded tables, checking the fixed
/// schema and constructing both freight indexes.
pub fn assemble_inputs(
    sources: EntityTable,
    facilities: EntityTable,
    centers: EntityTable,
) -> Result<ModelInputs, SchemaError> {
    sources.require_numeric(&["Capacity_Tons", "Cost_Per_Ton", "Quality"])?;
    facilities.require_numeric(&["Capacity_Tons", "Processing_Cost_Per_Ton"])?;
    centers.require_numeric(&["Demand_Tons"])?;

    let pattern = ColumnPattern::new(FREIGHT_PREFIX);
    let inbound = PairIndex::from_wide(INBOUND_FREIGHT, &sources, &facilities, &pattern)?;
    let outbound = PairIndex::from_wide(OUTBOUND_FREIGHT, &facilities, &centers, &pattern)?;

    let mut inputs = ModelInputs::new();
    inputs
        .add_table(sources)
        .add_table(facilities)
        .add_table(centers)
        .add_index(inbound)
        .add_index(outbound);
    Ok(inputs)
}

/// The base network spec plus whichever optional rules are enabled.
pub fn network_spec(options: &NetworkOptions) -> BuildSpec {
    let mut spec = BuildSpec::new("supply-network", ObjectiveSense::Minimize)
        .with_group(
            "ship",
            GroupKind::Pair {
                rows: SOURCES.to_string(),
                cols: FACILITIES.to_string(),
            },
            VarDomain::nonneg(),
            CostSpec::from_index(INBOUND_FREIGHT).plus_row_attr("Cost_Per_Ton"),
        )
        .with_group(
            "deliver",
            GroupKind::Pair {
                rows: FACILITIES.to_string(),
                cols: CENTERS.to_string(),
            },
            VarDomain::nonneg(),
            CostSpec::from_index(OUTBOUND_FREIGHT).plus_row_attr("Processing_Cost_Per_Ton"),
        )
        .with_template(
            "source_capacity",
            TemplateRule::RowCapacity {
                group: "ship".to_string(),
                capacity_attr: "Capacity_Tons".to_string(),
            },
        )
        .with_template(
            "facility_capacity",
            TemplateRule::ColCapacity {
                group: "ship".to_string(),
                capacity_attr: "Capacity_Tons".to_string(),
            },
        )
        .with_template(
            "flow_balance",
            TemplateRule::FlowBalance {
                out_group: "deliver".to_string(),
                in_group: "ship".to_string(),
            },
        )
        .with_template(
            "center_demand",
            TemplateRule::ColDemand {
                group: "deliver".to_string(),
                demand_attr: "Demand_Tons".to_string(),
                sense: ConstraintSense::Eq,
            },
        );

    if options.same_region {
        spec = spec.with_template(
            "same_region",
            TemplateRule::ForbidTagMismatch {
                group: "deliver".to_string(),
                tag: "Region".to_string(),
            },
        );
    }
    if let Some(floor) = options.quality_floor {
        spec = spec.with_template(
            "quality_floor",
            TemplateRule::ForbidBelow {
                group: "ship".to_string(),
                attr: "Quality".to_string(),
                min_value: floor,
            },
        );
    }
    if let Some(fraction) = options.share_cap {
        spec = spec.with_template(
            SHARE_CAP_LABEL,
            TemplateRule::ShareOfTotal {
                group: "ship".to_string(),
                capacity_attr: "Capacity_Tons".to_string(),
                fraction,
            },
        );
    }
    if let Some(fraction) = options.pair_share {
        spec = spec.with_template(
            "pair_share",
            TemplateRule::PairShare {
                group: "deliver".to_string(),
                demand_attr: "Demand_Tons".to_string(),
                fraction,
            },
        );
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;

    const SOURCES_CSV: &str = "\
Source_ID,Capacity_Tons,Cost_Per_Ton,Quality,Freight_To_F_1
S_1,50,2,4,1
S_2,50,3,2,1
";

    const FACILITIES_CSV: &str = "\
Facility_ID,Region,Capacity_Tons,Processing_Cost_Per_Ton,Freight_To_C_1,Freight_To_C_2
F_1,east,100,1,2,3
";

    const CENTERS_CSV: &str = "\
Center_ID,Region,Demand_Tons
C_1,east,20
C_2,west,10
";

    fn inputs() -> ModelInputs {
        let sources =
            EntityTable::from_reader(SOURCES, "Source_ID", SOURCES_CSV.as_bytes()).unwrap();
        let facilities =
            EntityTable::from_reader(FACILITIES, "Facility_ID", FACILITIES_CSV.as_bytes()).unwrap();
        let centers =
            EntityTable::from_reader(CENTERS, "Center_ID", CENTERS_CSV.as_bytes()).unwrap();
        assemble_inputs(sources, facilities, centers).unwrap()
    }

    #[test]
    fn test_base_spec_builds() {
        let inputs = inputs();
        let spec = network_spec(&NetworkOptions::default());
        let model = ModelBuilder::new(&inputs).build(&spec).unwrap();
        // 2 ship vars + 2 deliver vars; 2 source caps + 1 facility cap
        // + 1 balance + 2 demands.
        assert_eq!(model.num_vars(), 4);
        assert_eq!(model.num_constraints(), 6);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_options_add_labelled_templates() {
        let spec = network_spec(&NetworkOptions {
            same_region: true,
            quality_floor: Some(3.0),
            share_cap: Some(0.03),
            pair_share: Some(0.5),
        });
        for label in [
            "same_region",
            "quality_floor",
            SHARE_CAP_LABEL,
            "pair_share",
        ] {
            assert!(spec.template_position(label).is_some(), "missing {label}");
        }
    }

    #[test]
    fn test_missing_schema_column() {
        let sources = EntityTable::from_reader(
            SOURCES,
            "Source_ID",
            "Source_ID,Capacity_Tons\nS_1,50\n".as_bytes(),
        )
        .unwrap();
        let facilities =
            EntityTable::from_reader(FACILITIES, "Facility_ID", FACILITIES_CSV.as_bytes()).unwrap();
        let centers =
            EntityTable::from_reader(CENTERS, "Center_ID", CENTERS_CSV.as_bytes()).unwrap();
        let err = assemble_inputs(sources, facilities, centers);
        assert!(matches!(err, Err(SchemaError::MissingColumn { .. })));
    }
}
