use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{KappaError, Result};

/// A single row keyed by column name, as it arrives from a caller.
pub type Row = HashMap<String, FieldValue>;

/// Typed cell values. Source data often arrives as strings, so numeric
/// accessors also accept parseable text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view. Booleans read as 0/1 so binary outcomes can be given
    /// either way. `Ok(None)` is a missing value, `Err` text that is not a
    /// number.
    pub fn as_f64(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            FieldValue::Float(v) if v.is_nan() => Ok(None),
            FieldValue::Float(v) => Ok(Some(*v)),
            FieldValue::Integer(v) => Ok(Some(*v as f64)),
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
                    Ok(None)
                } else {
                    trimmed
                        .parse::<f64>()
                        .map(Some)
                        .map_err(|_| format!("'{}' is not a number", s))
                }
            }
            FieldValue::Boolean(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        }
    }

    /// Grouping key view; None for missing values.
    pub fn as_key(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Integer(v) => Some(v.to_string()),
            FieldValue::Float(v) if v.is_nan() => None,
            FieldValue::Float(v) => Some(v.to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Null => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(FieldValue::Null, FieldValue::Float)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// A named column of cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<FieldValue>,
}

/// Small columnar table with named, typed columns.
///
/// A table with columns but no rows is valid: metrics that accept tables
/// check the schema first and then treat zero rows as a degenerate input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    /// Builder form of [`Table::push_column`] for literal tables.
    ///
    /// # Panics
    /// Panics if the column length disagrees with the existing row count.
    pub fn with_column<V: Into<FieldValue>>(mut self, name: &str, values: Vec<V>) -> Self {
        if let Err(e) = self.push_column(name, values) {
            panic!("Table::with_column: {}", e);
        }
        self
    }

    /// Append (or replace) a column; its length must match the row count.
    pub fn push_column<V: Into<FieldValue>>(&mut self, name: &str, values: Vec<V>) -> Result<()> {
        let values: Vec<FieldValue> = values.into_iter().map(Into::into).collect();
        let existing = self.columns.iter().position(|c| c.name == name);
        let others_rows = self
            .columns
            .iter()
            .enumerate()
            .find(|(i, _)| Some(*i) != existing)
            .map(|(_, c)| c.values.len());

        if let Some(rows) = others_rows {
            if rows != values.len() {
                return Err(KappaError::DimensionMismatch(format!(
                    "column '{}' has {} values but {} has {} rows",
                    name,
                    values.len(),
                    self.name,
                    rows
                )));
            }
        }

        match existing {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(())
    }

    /// Build a table from row maps. Columns are the sorted union of keys;
    /// absent keys become missing values.
    pub fn from_rows(name: &str, rows: &[Row]) -> Self {
        let names: BTreeSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
        let columns = names
            .into_iter()
            .map(|col| Column {
                name: col.clone(),
                values: rows
                    .iter()
                    .map(|r| r.get(col).cloned().unwrap_or(FieldValue::Null))
                    .collect(),
            })
            .collect();
        Self {
            name: name.to_string(),
            columns,
        }
    }

    /// Give a column-less table the named (empty) columns, so an empty row
    /// array reads as an empty table of that schema. Tables with any column
    /// are returned unchanged.
    pub fn with_empty_schema(mut self, columns: &[&str]) -> Self {
        if self.columns.is_empty() {
            self.columns = columns
                .iter()
                .map(|c| Column {
                    name: c.to_string(),
                    values: Vec::new(),
                })
                .collect();
        }
        self
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Fail with [`KappaError::MissingColumn`] on the first absent column.
    pub fn require(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(KappaError::MissingColumn {
                table: self.name.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn required(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| KappaError::MissingColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Numeric column with missing values as `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.required(name)?
            .values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.as_f64().map_err(|reason| KappaError::InvalidValue {
                    column: name.to_string(),
                    row,
                    reason,
                })
            })
            .collect()
    }

    /// Key column (ids, group labels) with missing values as `None`.
    pub fn keys(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self.required(name)?.values.iter().map(FieldValue::as_key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accepts_text_and_missing() {
        let t = Table::new("t").with_column(
            "x",
            vec![
                FieldValue::Text("0.5".into()),
                FieldValue::Integer(2),
                FieldValue::Null,
                FieldValue::Text("NA".into()),
            ],
        );
        assert_eq!(t.numeric("x").unwrap(), vec![Some(0.5), Some(2.0), None, None]);
    }

    #[test]
    fn empty_rows_take_schema() {
        let t = Table::from_rows("viability", &[]).with_empty_schema(&["a", "b"]);
        assert!(t.require(&["a", "b"]).is_ok());
        assert_eq!(t.n_rows(), 0);
        assert_eq!(t.numeric("a").unwrap(), Vec::<Option<f64>>::new());
    }

    #[test]
    fn schema_does_not_mask_missing_columns() {
        let mut row = Row::new();
        row.insert("a".to_string(), FieldValue::Float(1.0));
        let t = Table::from_rows("t", &[row]).with_empty_schema(&["a", "b"]);
        assert!(matches!(t.require(&["a", "b"]), Err(KappaError::MissingColumn { .. })));
    }

    #[test]
    fn numeric_rejects_garbage() {
        let t = Table::new("t").with_column("x", vec!["abc"]);
        let err = t.numeric("x").unwrap_err();
        assert!(matches!(err, KappaError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn require_reports_first_missing_column() {
        let t = Table::new("viability").with_column("a", vec![1.0]);
        let err = t.require(&["a", "b", "c"]).unwrap_err();
        match err {
            KappaError::MissingColumn { table, column } => {
                assert_eq!(table, "viability");
                assert_eq!(column, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn push_column_checks_length() {
        let mut t = Table::new("t").with_column("a", vec![1.0, 2.0]);
        assert!(t.push_column("b", vec![1.0]).is_err());
        assert!(t.push_column("a", vec![3.0, 4.0, 5.0]).is_ok());
        assert_eq!(t.n_rows(), 3);
    }

    #[test]
    fn from_rows_fills_missing_keys() {
        let mut r1 = Row::new();
        r1.insert("a".into(), FieldValue::Float(1.0));
        let mut r2 = Row::new();
        r2.insert("b".into(), FieldValue::Text("x".into()));

        let t = Table::from_rows("rows", &[r1, r2]);
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.numeric("a").unwrap(), vec![Some(1.0), None]);
        assert_eq!(t.keys("b").unwrap(), vec![None, Some("x".to_string())]);
    }

    #[test]
    fn field_value_untagged_json() {
        let row: Row =
            serde_json::from_str(r#"{"id": "c1", "v": 0.25, "n": 3, "m": null}"#).unwrap();
        assert_eq!(row["id"], FieldValue::Text("c1".into()));
        assert_eq!(row["v"], FieldValue::Float(0.25));
        assert_eq!(row["n"], FieldValue::Integer(3));
        assert!(row["m"].is_null());
    }
}
