//! Invocation parameters supplied by the orchestrator.
//!
//! Everything the node needs to know about its place in the pipeline arrives
//! through the environment and is resolved exactly once, before any
//! connection is opened. [`NodeConfig::from_lookup`] takes the lookup as a
//! function so the parsing can be exercised without touching the process
//! environment.

use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::core::error::{NodeError, NodeResult};
use crate::core::identifiers::TableName;
use crate::core::signature::DeclaredColumn;

pub const DATABASE_PATH_VAR: &str = "FF_DATABASE_PATH";
pub const INPUT_TABLES_VAR: &str = "FF_INPUT_TABLES";
pub const OUTPUT_TABLE_VAR: &str = "FF_OUTPUT_TABLE";
pub const MODEL_NAME_VAR: &str = "FF_MODEL_NAME";
pub const SCHEMA_VAR: &str = "FF_SCHEMA";
pub const TRACE_PATH_VAR: &str = "FF_TRACE_PATH";

/// The resolved parameters of one node invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Shared database location, or `:memory:`.
    pub database_path: String,
    /// Upstream tables in producer order; the first is the primary input.
    pub input_tables: Vec<TableName>,
    /// The single table this invocation produces.
    pub output_table: TableName,
    /// Name used in diagnostics and traces.
    pub model_name: String,
    /// Output columns the orchestrator expects, if it declared any.
    pub expected_columns: Vec<DeclaredColumn>,
    /// Where run traces go, if anywhere.
    pub trace_path: Option<PathBuf>,
}

impl NodeConfig {
    /// Resolves the configuration from the process environment.
    pub fn from_env() -> NodeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> NodeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = required(&lookup, DATABASE_PATH_VAR)?;

        let input_tables: Vec<TableName> =
            decode_json(INPUT_TABLES_VAR, &required(&lookup, INPUT_TABLES_VAR)?)?;

        let output_raw = required(&lookup, OUTPUT_TABLE_VAR)?;
        let output_table = TableName::new(output_raw.as_str()).ok_or_else(|| {
            NodeError::configuration(OUTPUT_TABLE_VAR, format!("invalid table name '{output_raw}'"))
        })?;

        let model_name = optional(&lookup, MODEL_NAME_VAR)
            .unwrap_or_else(|| output_table.parts().1.to_string());

        let expected_columns: Vec<DeclaredColumn> = match optional(&lookup, SCHEMA_VAR) {
            Some(raw) => decode_json(SCHEMA_VAR, &raw)?,
            None => Vec::new(),
        };
        if let Some(column) = expected_columns.iter().find(|c| c.name.trim().is_empty()) {
            return Err(NodeError::configuration(
                SCHEMA_VAR,
                format!("declared column with empty name ({column:?})"),
            ));
        }

        let trace_path = optional(&lookup, TRACE_PATH_VAR).map(PathBuf::from);

        Ok(Self {
            database_path,
            input_tables,
            output_table,
            model_name,
            expected_columns,
            trace_path,
        })
    }

    /// The first input table, which the reference transforms read.
    pub fn primary_input(&self) -> NodeResult<&TableName> {
        self.input_tables.first().ok_or_else(|| {
            NodeError::configuration(INPUT_TABLES_VAR, "node requires at least one input table")
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> NodeResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(NodeError::configuration(key, "variable is empty")),
        None => Err(NodeError::configuration(key, "variable is not set")),
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn decode_json<T: DeserializeOwned>(key: &str, raw: &str) -> NodeResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| NodeError::configuration(key, format!("invalid value {raw:?}: {e}")))
}
