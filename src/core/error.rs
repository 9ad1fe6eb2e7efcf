use thiserror::Error;

/// The five terminal failure classes of a node invocation.
///
/// None of them is retried inside the node; the orchestrator only sees the
/// exit code from [`ErrorKind::exit_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Connection,
    MissingTable,
    Schema,
    Write,
}

impl ErrorKind {
    /// Stable name used in diagnostics and traces.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::MissingTable => "MissingTableError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Write => "WriteError",
        }
    }

    /// Process exit status for this kind. Zero is reserved for success.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Connection => 3,
            ErrorKind::MissingTable => 4,
            ErrorKind::Schema => 5,
            ErrorKind::Write => 6,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ConfigurationError: {variable}: {message}")]
    Configuration { variable: String, message: String },

    #[error("ConnectionError: cannot use database '{path}': {message}")]
    Connection { path: String, message: String },

    #[error("MissingTableError: table '{table}' does not exist")]
    MissingTable { table: String },

    #[error("SchemaError: column '{column}': {message}")]
    Schema { column: String, message: String },

    #[error("WriteError: cannot write table '{table}': {message}")]
    Write { table: String, message: String },
}

impl NodeError {
    pub fn configuration(variable: impl Into<String>, message: impl Into<String>) -> Self {
        NodeError::Configuration {
            variable: variable.into(),
            message: message.into(),
        }
    }

    pub fn connection(path: impl Into<String>, message: impl ToString) -> Self {
        NodeError::Connection {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn missing_table(table: impl Into<String>) -> Self {
        NodeError::MissingTable {
            table: table.into(),
        }
    }

    pub fn schema(column: impl Into<String>, message: impl Into<String>) -> Self {
        NodeError::Schema {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn write(table: impl Into<String>, message: impl ToString) -> Self {
        NodeError::Write {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::Configuration { .. } => ErrorKind::Configuration,
            NodeError::Connection { .. } => ErrorKind::Connection,
            NodeError::MissingTable { .. } => ErrorKind::MissingTable,
            NodeError::Schema { .. } => ErrorKind::Schema,
            NodeError::Write { .. } => ErrorKind::Write,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
