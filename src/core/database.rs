//! Session on the shared DuckDB database.
//!
//! A [`SharedDatabase`] owns exactly one connection for the lifetime of a node
//! invocation. [`SharedDatabase::close`] releases it and reports failures; if
//! the session is dropped on an error path instead, `Drop` releases it.

use std::path::Path;

use duckdb::types::{ToSql, ToSqlOutput, Value};
use duckdb::{Connection, params, appender_params_from_iter};
use uuid::Uuid;

use crate::core::error::{NodeError, NodeResult};
use crate::core::frame::{Column, Scalar, StorageKind, TabularFrame};
use crate::core::identifiers::{TableName, quote_ident};

/// Path value that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// One open connection to the shared database.
pub struct SharedDatabase {
    path: String,
    conn: Option<Connection>,
}

impl SharedDatabase {
    /// Opens the database at `path` (or an in-memory one for `:memory:`).
    pub fn open(path: &str) -> NodeResult<Self> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(path))
        }
        .map_err(|e| NodeError::connection(path, e))?;

        log::debug!("Opened database connection to '{}'", path);
        Ok(Self {
            path: path.to_string(),
            conn: Some(conn),
        })
    }

    fn conn(&self) -> NodeResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| NodeError::connection(&self.path, "connection already released"))
    }

    fn conn_mut(&mut self) -> NodeResult<&mut Connection> {
        let path = self.path.clone();
        self.conn
            .as_mut()
            .ok_or_else(|| NodeError::connection(path, "connection already released"))
    }

    /// Runs one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> NodeResult<()> {
        self.conn()?
            .execute_batch(sql)
            .map_err(|e| NodeError::connection(&self.path, e))
    }

    /// Returns `true` if a table or view with this name exists.
    pub fn relation_exists(&self, name: &TableName) -> NodeResult<bool> {
        let (schema, table) = name.parts();
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_catalog = current_database() \
                 AND lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
                params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| NodeError::connection(&self.path, e))?;
        Ok(count > 0)
    }

    /// Ordered `(column, type)` pairs of a table.
    pub fn describe_table(&self, name: &TableName) -> NodeResult<Vec<(String, String)>> {
        let (schema, table) = name.parts();
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_catalog = current_database() \
                 AND lower(table_schema) = lower(?) AND lower(table_name) = lower(?) \
                 ORDER BY ordinal_position",
            )
            .map_err(|e| NodeError::connection(&self.path, e))?;
        let columns = stmt
            .query_map(params![schema, table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| NodeError::connection(&self.path, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| NodeError::connection(&self.path, e))?;

        if columns.is_empty() {
            return Err(NodeError::missing_table(name.as_str()));
        }
        Ok(columns)
    }

    /// Loads a whole table into memory.
    pub fn read_table(&self, name: &TableName) -> NodeResult<TabularFrame> {
        let schema = self.describe_table(name)?;
        let kinds: Vec<StorageKind> = schema
            .iter()
            .map(|(_, declared)| StorageKind::from_declared(declared))
            .collect();

        let projection = schema
            .iter()
            .zip(&kinds)
            .map(|((column, _), kind)| {
                let ident = quote_ident(column);
                format!("CAST({ident} AS {}) AS {ident}", kind.sql_type())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {projection} FROM {}", name.quoted());
        log::debug!("Reading '{}': {}", name, sql);

        let mut values: Vec<Vec<Scalar>> = vec![Vec::new(); schema.len()];
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| NodeError::connection(&self.path, e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| NodeError::connection(&self.path, e))?;
        while let Some(row) = rows
            .next()
            .map_err(|e| NodeError::connection(&self.path, e))?
        {
            for (i, kind) in kinds.iter().enumerate() {
                let cell = match kind {
                    StorageKind::Boolean => row.get::<_, Option<bool>>(i).map(Scalar::from),
                    StorageKind::Integer => row.get::<_, Option<i64>>(i).map(Scalar::from),
                    StorageKind::Double => row.get::<_, Option<f64>>(i).map(Scalar::from),
                    StorageKind::Decimal | StorageKind::Text => row
                        .get::<_, Option<String>>(i)
                        .map(|v| v.map(Scalar::Text).unwrap_or(Scalar::Null)),
                }
                .map_err(|e| NodeError::connection(&self.path, e))?;
                values[i].push(cell);
            }
        }

        let columns = schema
            .into_iter()
            .zip(values)
            .map(|((column, declared), values)| Column::with_declared_type(column, declared, values))
            .collect();
        TabularFrame::from_columns(columns)
    }

    /// Replaces `name` with the frame's content in a single transaction.
    ///
    /// Rows are bulk-loaded into a staging table through an appender and the
    /// target is then created with `CREATE OR REPLACE TABLE ... AS SELECT`,
    /// casting each column back to its declared type. The staging table lives
    /// only inside the transaction.
    pub fn replace_table(&mut self, name: &TableName, frame: &TabularFrame) -> NodeResult<()> {
        if frame.column_count() == 0 {
            return Err(NodeError::write(name.as_str(), "frame has no columns"));
        }
        let write_err = |e: duckdb::Error| NodeError::write(name.as_str(), e);

        let staging_name = format!("__tablenode_stage_{}", Uuid::new_v4().simple());
        let staging = quote_ident(&staging_name);
        let staging_columns = frame
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), c.kind().sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let projection = frame
            .columns()
            .iter()
            .map(|c| {
                let ident = quote_ident(c.name());
                format!("CAST({ident} AS {}) AS {ident}", c.declared_type())
            })
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn_mut()?.transaction().map_err(write_err)?;
        if let Some(schema) = name.schema() {
            tx.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
                .map_err(write_err)?;
        }
        tx.execute_batch(&format!("CREATE TABLE {staging} ({staging_columns})"))
            .map_err(write_err)?;
        {
            let mut appender = tx.appender(&staging_name).map_err(write_err)?;
            for row in frame.rows() {
                appender
                    .append_row(appender_params_from_iter(row.into_iter().cloned()))
                    .map_err(write_err)?;
            }
            appender.flush().map_err(write_err)?;
        }
        tx.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT {projection} FROM {staging}; DROP TABLE {staging};",
            name.quoted()
        ))
        .map_err(write_err)?;
        tx.commit().map_err(write_err)?;

        log::debug!(
            "Replaced table '{}' with {} rows x {} columns",
            name,
            frame.row_count(),
            frame.column_count()
        );
        Ok(())
    }

    /// Number of rows currently in a table.
    pub fn count_rows(&self, name: &TableName) -> NodeResult<usize> {
        if !self.relation_exists(name)? {
            return Err(NodeError::missing_table(name.as_str()));
        }
        let count: i64 = self
            .conn()?
            .query_row(&format!("SELECT COUNT(*) FROM {}", name.quoted()), [], |row| {
                row.get(0)
            })
            .map_err(|e| NodeError::connection(&self.path, e))?;
        Ok(count as usize)
    }

    /// Releases the connection, reporting a failure to close.
    pub fn close(mut self) -> NodeResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| {
                NodeError::connection(&self.path, format!("failed to release connection: {e}"))
            }),
            None => Ok(()),
        }
        .inspect(|_| log::debug!("Closed database connection to '{}'", self.path))
    }
}

impl Drop for SharedDatabase {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => log::debug!("Released database connection to '{}'", self.path),
                Err((_, e)) => log::warn!(
                    "Failed to release database connection to '{}': {}",
                    self.path,
                    e
                ),
            }
        }
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            Scalar::Null => Value::Null,
            Scalar::Boolean(v) => Value::Boolean(*v),
            Scalar::Integer(v) => Value::BigInt(*v),
            Scalar::Double(v) => Value::Double(*v),
            Scalar::Text(v) => Value::Text(v.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}
