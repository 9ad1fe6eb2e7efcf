//! Table identifiers.
//!
//! Table names arrive from the orchestrator as plain strings, optionally
//! schema-qualified (`staging.orders`). They are validated once and quoted
//! part by part whenever they are spliced into SQL.

use serde::{Deserialize, Serialize};

/// A validated, possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a table name, returning `None` if it is empty, has an empty
    /// qualified part (`.orders`, `staging.`) or names a catalog
    /// (`db.main.orders`).
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let v = v.trim().to_string();
        let parts: Vec<&str> = v.split('.').collect();
        if parts.len() > 2 || parts.iter().any(|part| part.is_empty()) {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the name as given by the orchestrator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits into `(schema, table)`; unqualified names live in `main`.
    pub fn parts(&self) -> (&str, &str) {
        match self.0.rfind('.') {
            Some(pos) => (&self.0[..pos], &self.0[pos + 1..]),
            None => ("main", &self.0),
        }
    }

    /// Returns the schema part if the name is qualified.
    pub fn schema(&self) -> Option<&str> {
        self.0.rfind('.').map(|pos| &self.0[..pos])
    }

    /// Renders the name for SQL with every part double-quoted.
    pub fn quoted(&self) -> String {
        self.0
            .split('.')
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TableName::new(value.clone()).ok_or_else(|| format!("invalid table name '{value}'"))
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

/// Quotes a single SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
