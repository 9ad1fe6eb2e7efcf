//! In-memory, column-oriented materialization of a table.
//!
//! A [`TabularFrame`] lives for exactly one node invocation: it is built by
//! reading an input table, extended by the transform, and consumed by the
//! write step.

use serde::Serialize;

use crate::core::error::{NodeError, NodeResult};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value; `None` for nulls and non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Double(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// How a column's values are held in memory.
///
/// Every DuckDB type maps onto one of these; types without a native
/// representation travel as text and are cast back on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageKind {
    Boolean,
    Integer,
    Double,
    /// Fixed-point values, held as their exact decimal text.
    Decimal,
    Text,
}

impl StorageKind {
    /// Maps a DuckDB type name (as reported by `DESCRIBE`) to a storage kind.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        // Parameterised types: DECIMAL(18,3), VARCHAR(10)
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "BOOLEAN" | "BOOL" | "LOGICAL" => StorageKind::Boolean,
            "TINYINT" | "INT1" | "SMALLINT" | "INT2" | "SHORT" | "INTEGER" | "INT" | "INT4"
            | "SIGNED" | "BIGINT" | "INT8" | "LONG" | "UTINYINT" | "USMALLINT" | "UINTEGER" => {
                StorageKind::Integer
            }
            "FLOAT" | "FLOAT4" | "REAL" | "DOUBLE" | "FLOAT8" => StorageKind::Double,
            "DECIMAL" | "NUMERIC" => StorageKind::Decimal,
            _ => StorageKind::Text,
        }
    }

    /// The DuckDB type used to hold values of this kind.
    pub fn sql_type(self) -> &'static str {
        match self {
            StorageKind::Boolean => "BOOLEAN",
            StorageKind::Integer => "BIGINT",
            StorageKind::Double => "DOUBLE",
            StorageKind::Decimal | StorageKind::Text => "VARCHAR",
        }
    }

    /// The column type given to new columns of this kind.
    pub fn default_declared_type(self) -> &'static str {
        match self {
            // DuckDB's own default precision
            StorageKind::Decimal => "DECIMAL(18,3)",
            other => other.sql_type(),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            StorageKind::Integer | StorageKind::Double | StorageKind::Decimal
        )
    }
}

/// A named column of scalar values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: StorageKind,
    declared_type: String,
    values: Vec<Scalar>,
}

impl Column {
    /// Creates a column whose declared type is the storage kind's own type.
    pub fn new(name: impl Into<String>, kind: StorageKind, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type: kind.default_declared_type().to_string(),
            values,
        }
    }

    /// Creates a column that remembers the type it had in the database.
    pub fn with_declared_type(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        values: Vec<Scalar>,
    ) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            kind: StorageKind::from_declared(&declared_type),
            declared_type,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered set of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularFrame {
    columns: Vec<Column>,
}

impl TabularFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frame, rejecting duplicate names and ragged columns.
    pub fn from_columns(columns: Vec<Column>) -> NodeResult<Self> {
        let mut frame = Self::new();
        for column in columns {
            frame.push_column(column)?;
        }
        Ok(frame)
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Appends a column after all existing ones.
    pub fn push_column(&mut self, column: Column) -> NodeResult<()> {
        if self.has_column(&column.name) {
            return Err(NodeError::schema(&column.name, "column already exists"));
        }
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(NodeError::schema(
                &column.name,
                format!(
                    "column has {} rows but frame has {}",
                    column.len(),
                    self.row_count()
                ),
            ));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Numeric values of a column, `None` where the cell is null.
    pub fn numeric_values(&self, name: &str) -> NodeResult<Vec<Option<f64>>> {
        let column = self
            .column(name)
            .ok_or_else(|| NodeError::schema(name, "column not found"))?;
        if !column.kind.is_numeric() {
            return Err(NodeError::schema(
                name,
                format!("expected a numeric column, found {}", column.declared_type),
            ));
        }
        Ok(column
            .values
            .iter()
            .map(|value| match value {
                Scalar::Text(digits) if column.kind == StorageKind::Decimal => {
                    digits.trim().parse().ok()
                }
                other => other.as_f64(),
            })
            .collect())
    }

    /// The cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Scalar>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Scalar>> + '_ {
        (0..self.row_count()).filter_map(move |i| self.row(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TabularFrame {
        TabularFrame::from_columns(vec![
            Column::with_declared_type("id", "INTEGER", vec![1i64.into(), 2i64.into()]),
            Column::with_declared_type("amount", "DECIMAL(10,2)", vec!["10.00".into(), Scalar::Null]),
            Column::with_declared_type("note", "VARCHAR", vec!["a".into(), "b".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_declared_types_map_to_storage() {
        assert_eq!(StorageKind::from_declared("INTEGER"), StorageKind::Integer);
        assert_eq!(StorageKind::from_declared("ubigint"), StorageKind::Text);
        assert_eq!(StorageKind::from_declared("DECIMAL(18,3)"), StorageKind::Decimal);
        assert_eq!(StorageKind::from_declared("numeric"), StorageKind::Decimal);
        assert_eq!(StorageKind::from_declared("REAL"), StorageKind::Double);
        assert_eq!(StorageKind::from_declared("BOOLEAN"), StorageKind::Boolean);
        assert_eq!(StorageKind::from_declared("TIMESTAMP"), StorageKind::Text);
        assert_eq!(StorageKind::from_declared("INTEGER[]"), StorageKind::Text);
    }

    #[test]
    fn test_shape() {
        let frame = orders();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.column_count(), 3);
        assert_eq!(frame.column_names(), vec!["id", "amount", "note"]);
        assert_eq!(frame.row(1).unwrap()[2], &Scalar::Text("b".into()));
        assert!(frame.row(2).is_none());
        assert_eq!(frame.rows().count(), 2);
    }

    #[test]
    fn test_push_column_appends_at_end() {
        let mut frame = orders();
        frame
            .push_column(Column::new("flag", StorageKind::Boolean, vec![true.into(), false.into()]))
            .unwrap();
        assert_eq!(frame.column_names(), vec!["id", "amount", "note", "flag"]);
    }

    #[test]
    fn test_push_column_rejects_duplicates_and_ragged() {
        let mut frame = orders();
        let dup = Column::new("id", StorageKind::Integer, vec![1i64.into(), 2i64.into()]);
        assert!(frame.push_column(dup).is_err());

        let short = Column::new("x", StorageKind::Integer, vec![1i64.into()]);
        let err = frame.push_column(short).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Schema);
    }

    #[test]
    fn test_numeric_values() {
        let frame = orders();
        assert_eq!(frame.numeric_values("id").unwrap(), vec![Some(1.0), Some(2.0)]);
        assert_eq!(frame.numeric_values("amount").unwrap(), vec![Some(10.0), None]);
        assert!(frame.numeric_values("note").is_err());
        assert!(frame.numeric_values("missing").is_err());
    }

    #[test]
    fn test_empty_frame_has_no_rows() {
        let frame = TabularFrame::new();
        assert_eq!(frame.row_count(), 0);
        assert!(frame.row(0).is_none());
    }
}
