//! # tablenode
//!
//! A single executable pipeline node for tabular workflows. An external
//! orchestrator launches the node with three environment variables; the node
//! reads its upstream tables from a shared DuckDB file, derives a new table,
//! and commits it under its output name with replace semantics.
//!
//! ## Features
//!
//! - **Typed invocation contract**: `FF_DATABASE_PATH`, `FF_INPUT_TABLES` and
//!   `FF_OUTPUT_TABLE` are resolved once into a [`NodeConfig`]
//! - **Scoped connection**: exactly one connection per run, released on every exit path
//! - **Explicit schemas**: a node declares the columns it reads and writes, and
//!   mismatches are caught before rows are read or written
//! - **Pluggable transforms**: implement [`NodeLogic`] to swap the computation
//! - **Optional Parquet traces**: behind the `telemetry` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablenode::prelude::*;
//!
//! let config = NodeConfig::from_env().expect("orchestrator sets FF_* variables");
//! let node = Node::new(ScoreLogic::default());
//! match node.run(&config) {
//!     Ok(report) => println!("wrote {} rows", report.output_rows),
//!     Err(failure) => std::process::exit(failure.error.exit_code()),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`transforms`]: Ready-made [`NodeLogic`] implementations
//! - [`prelude`]: Commonly used types and traits (import with `use tablenode::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub mod transforms;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::config::{
    DATABASE_PATH_VAR, INPUT_TABLES_VAR, MODEL_NAME_VAR, NodeConfig, OUTPUT_TABLE_VAR, SCHEMA_VAR,
    TRACE_PATH_VAR,
};
pub use crate::core::database::{IN_MEMORY, SharedDatabase};
pub use crate::core::error::{ErrorKind, NodeError, NodeResult};
pub use crate::core::frame::{Column, Scalar, StorageKind, TabularFrame};
pub use crate::core::identifiers::TableName;
pub use crate::core::node::{Node, NodeFailure, NodeLogic, NodeState, Outcome, RunReport};
pub use crate::core::signature::{ColumnKind, ColumnSpec, DeclaredColumn, Signature};
pub use crate::core::telemetry::{MemoryTelemetry, Telemetry, TraceEntry};
pub use crate::core::validation::{ValidationIssue, ValidationResult};

#[cfg(feature = "telemetry")]
pub use crate::core::telemetry::ParquetTelemetry;

pub use transforms::ScoreLogic;

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything needed to write and run a node.
///
/// # Example
/// ```rust
/// use tablenode::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Column, ColumnKind, ErrorKind, Node, NodeConfig, NodeError, NodeFailure, NodeLogic,
        NodeResult, NodeState, Outcome, RunReport, Scalar, ScoreLogic, SharedDatabase, Signature,
        StorageKind, TableName, TabularFrame,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
