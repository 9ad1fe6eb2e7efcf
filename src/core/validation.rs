use crate::core::error::{NodeError, NodeResult};

/// Represents an issue found while checking a table against a declared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A hard error: the node cannot proceed.
    Error { column: String, message: String },
    /// A warning: the node proceeds, but the mismatch is worth reporting.
    Warning { column: String, message: String },
}

/// The result of a schema validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, column: impl Into<String>, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Error {
            column: column.into(),
            message: msg.into(),
        });
    }

    pub fn add_warning(&mut self, column: impl Into<String>, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning {
            column: column.into(),
            message: msg.into(),
        });
    }

    pub fn is_safe(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Error { .. }))
    }

    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Warning { .. }))
    }

    /// Logs every issue under the given context label.
    pub fn log_summary(&self, context: &str) {
        for issue in &self.issues {
            match issue {
                ValidationIssue::Error { column, message } => {
                    log::error!("{}: column '{}': {}", context, column, message)
                }
                ValidationIssue::Warning { column, message } => {
                    log::warn!("{}: column '{}': {}", context, column, message)
                }
            }
        }
    }

    /// Turns the first error into a [`NodeError::Schema`]; warnings pass.
    pub fn into_result(self) -> NodeResult<()> {
        match self.issues.into_iter().find_map(|i| match i {
            ValidationIssue::Error { column, message } => Some((column, message)),
            ValidationIssue::Warning { .. } => None,
        }) {
            Some((column, message)) => Err(NodeError::schema(column, message)),
            None => Ok(()),
        }
    }
}
