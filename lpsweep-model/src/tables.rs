//! Entity tables loaded from CSV input.
//!
//! An [`EntityTable`] is an ordered, immutable collection of records:
//! one identifier column plus any number of numeric or categorical
//! columns. Declared row order is preserved so that model structure and
//! reports are stable across runs. Columns are typed once at load time:
//! a column whose every value parses as `f64` is numeric, anything else
//! is categorical.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::error::SchemaError;

/// An immutable table of entities with a stable row order.
#[derive(Debug, Clone)]
pub struct EntityTable {
    name: String,
    id_column: String,
    ids: Vec<String>,
    positions: HashMap<String, usize>,
    numeric: Vec<(String, Vec<f64>)>,
    tags: Vec<(String, Vec<String>)>,
}

impl EntityTable {
    /// Load a table from a CSV file with a header row.
    pub fn from_path(
        name: impl Into<String>,
        id_column: &str,
        path: impl AsRef<Path>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let reader = csv::Reader::from_path(path.as_ref()).map_err(|source| SchemaError::Read {
            table: name.clone(),
            source,
        })?;
        Self::from_csv_reader(name, id_column, reader)
    }

    /// Load a table from any reader producing CSV with a header row.
    pub fn from_reader(
        name: impl Into<String>,
        id_column: &str,
        rdr: impl io::Read,
    ) -> Result<Self, SchemaError> {
        Self::from_csv_reader(name.into(), id_column, csv::Reader::from_reader(rdr))
    }

    fn from_csv_reader<R: io::Read>(
        name: String,
        id_column: &str,
        mut reader: csv::Reader<R>,
    ) -> Result<Self, SchemaError> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| SchemaError::Read {
                table: name.clone(),
                source,
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let id_pos = headers
            .iter()
            .position(|h| h == id_column)
            .ok_or_else(|| SchemaError::MissingColumn {
                table: name.clone(),
                column: id_column.to_string(),
            })?;

        // Collect raw cells column-wise, then type each column once.
        let mut ids = Vec::new();
        let mut positions = HashMap::new();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|source| SchemaError::Read {
                table: name.clone(),
                source,
            })?;
            let id = record.get(id_pos).unwrap_or("").trim().to_string();
            if positions.insert(id.clone(), ids.len()).is_some() {
                return Err(SchemaError::DuplicateId {
                    table: name.clone(),
                    id,
                });
            }
            ids.push(id);
            for (col, cell) in record.iter().enumerate() {
                raw[col].push(cell.trim().to_string());
            }
        }

        let mut numeric = Vec::new();
        let mut tags = Vec::new();
        for (col, header) in headers.into_iter().enumerate() {
            if col == id_pos {
                continue;
            }
            let cells = std::mem::take(&mut raw[col]);
            let parsed: Option<Vec<f64>> =
                cells.iter().map(|c| c.parse::<f64>().ok()).collect();
            match parsed {
                Some(values) => numeric.push((header, values)),
                None => tags.push((header, cells)),
            }
        }

        Ok(Self {
            name,
            id_column: id_column.to_string(),
            ids,
            positions,
            numeric,
            tags,
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the identifier column.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if the table holds no entities.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entity identifiers in declared order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Row position of an entity id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// True if the id belongs to this table.
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// A numeric column, in row order, if one exists under this name.
    pub fn numeric_opt(&self, column: &str) -> Option<&[f64]> {
        self.numeric
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
    }

    /// A categorical column, in row order, if one exists under this name.
    pub fn tag_opt(&self, column: &str) -> Option<&[String]> {
        self.tags
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
    }

    /// A numeric column, or a schema error naming the table.
    pub fn numeric(&self, column: &str) -> Result<&[f64], SchemaError> {
        if let Some(values) = self.numeric_opt(column) {
            return Ok(values);
        }
        if self.tag_opt(column).is_some() {
            return Err(SchemaError::NotNumeric {
                table: self.name.clone(),
                column: column.to_string(),
            });
        }
        Err(SchemaError::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }

    /// A categorical column, or a schema error naming the table.
    pub fn tag(&self, column: &str) -> Result<&[String], SchemaError> {
        if let Some(values) = self.tag_opt(column) {
            return Ok(values);
        }
        if self.numeric_opt(column).is_some() {
            return Err(SchemaError::NotCategorical {
                table: self.name.clone(),
                column: column.to_string(),
            });
        }
        Err(SchemaError::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }

    /// Check that all listed columns exist and are numeric.
    pub fn require_numeric(&self, columns: &[&str]) -> Result<(), SchemaError> {
        for column in columns {
            self.numeric(column)?;
        }
        Ok(())
    }

    /// Row view of one entity.
    pub fn entity(&self, pos: usize) -> Entity<'_> {
        Entity { table: self, pos }
    }
}

/// A borrowed view of one entity row.
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    table: &'a EntityTable,
    pos: usize,
}

impl<'a> Entity<'a> {
    /// Entity identifier.
    pub fn id(&self) -> &'a str {
        &self.table.ids[self.pos]
    }

    /// Numeric attribute value, if the column exists.
    pub fn attr(&self, column: &str) -> Option<f64> {
        self.table.numeric_opt(column).map(|v| v[self.pos])
    }

    /// Categorical attribute value, if the column exists.
    pub fn tag(&self, column: &str) -> Option<&'a str> {
        self.table.tag_opt(column).map(|v| v[self.pos].as_str())
    }
}
