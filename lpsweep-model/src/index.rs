//! Pair-keyed coefficient index.
//!
//! Wide-format input encodes a relationship in column names: the cost
//! from row entity `r` to counterpart `c` lives in a column named after
//! `c` (for example `Freight_To_Facility_7`). A [`ColumnPattern`]
//! declares that translation once, and [`PairIndex::from_wide`] applies
//! it at load time to produce a normalized `(row, col) -> coefficient`
//! map. Nothing downstream parses column names again.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::tables::EntityTable;

/// Declared translation from a counterpart entity id to the wide column
/// that carries its coefficient.
#[derive(Debug, Clone)]
pub struct ColumnPattern {
    prefix: String,
}

impl ColumnPattern {
    /// A pattern that prepends `prefix` to the counterpart id.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Column name carrying the coefficient toward `counterpart`.
    pub fn column_for(&self, counterpart: &str) -> String {
        format!("{}{}", self.prefix, counterpart)
    }
}

/// Read-only sparse mapping from an entity pair to a coefficient.
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    name: String,
    coeffs: HashMap<(String, String), f64>,
}

impl PairIndex {
    /// An empty index (coefficients inserted manually).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coeffs: HashMap::new(),
        }
    }

    /// Build the index from wide-format columns on `rows`.
    ///
    /// For every column entity `c` the column `pattern.column_for(c)`
    /// must exist on the row table and be numeric; a missing column is a
    /// [`SchemaError`], never a silent zero. The result holds exactly
    /// one entry per (row, col) pair.
    pub fn from_wide(
        name: impl Into<String>,
        rows: &EntityTable,
        cols: &EntityTable,
        pattern: &ColumnPattern,
    ) -> Result<Self, SchemaError> {
        let mut index = Self::new(name);
        for col_id in cols.ids() {
            let column = pattern.column_for(col_id);
            let values = rows.numeric(&column)?;
            for (pos, row_id) in rows.ids().iter().enumerate() {
                index.insert(row_id, col_id, values[pos]);
            }
        }
        Ok(index)
    }

    /// Index name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace a coefficient.
    pub fn insert(&mut self, row: &str, col: &str, coeff: f64) {
        self.coeffs.insert((row.to_string(), col.to_string()), coeff);
    }

    /// Coefficient for a pair, if present.
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        self.coeffs.get(&(row.to_string(), col.to_string())).copied()
    }

    /// True if the pair has an entry.
    pub fn contains(&self, row: &str, col: &str) -> bool {
        self.coeffs.contains_key(&(row.to_string(), col.to_string()))
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// True if no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: &str = "\
Source_ID,Capacity,Freight_To_F_1,Freight_To_F_2
S_1,40,1.5,2.5
S_2,60,3.0,1.0
";

    const FACILITIES: &str = "\
Facility_ID,Capacity
F_1,50
F_2,70
";

    fn tables() -> (EntityTable, EntityTable) {
        (
            EntityTable::from_reader("sources", "Source_ID", SOURCES.as_bytes()).unwrap(),
            EntityTable::from_reader("facilities", "Facility_ID", FACILITIES.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_from_wide_exactly_one_entry_per_pair() {
        let (sources, facilities) = tables();
        let pattern = ColumnPattern::new("Freight_To_");
        let index = PairIndex::from_wide("freight", &sources, &facilities, &pattern).unwrap();

        assert_eq!(index.len(), sources.len() * facilities.len());
        assert_eq!(index.get("S_1", "F_1"), Some(1.5));
        assert_eq!(index.get("S_1", "F_2"), Some(2.5));
        assert_eq!(index.get("S_2", "F_1"), Some(3.0));
        assert_eq!(index.get("S_2", "F_2"), Some(1.0));
        assert!(!index.contains("S_1", "F_3"));
    }

    #[test]
    fn test_missing_wide_column_is_schema_error() {
        let (sources, _) = tables();
        let extra = EntityTable::from_reader(
            "facilities",
            "Facility_ID",
            "Facility_ID,Capacity\nF_1,50\nF_3,10\n".as_bytes(),
        )
        .unwrap();
        let pattern = ColumnPattern::new("Freight_To_");
        let err = PairIndex::from_wide("freight", &sources, &extra, &pattern);
        assert!(matches!(err, Err(SchemaError::MissingColumn { column, .. }) if column == "Freight_To_F_3"));
    }

    #[test]
    fn test_column_pattern() {
        let pattern = ColumnPattern::new("Cost_To_");
        assert_eq!(pattern.column_for("Plant_9"), "Cost_To_Plant_9");
    }
}
