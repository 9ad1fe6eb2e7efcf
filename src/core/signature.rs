use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::core::frame::{StorageKind, TabularFrame};
use crate::core::validation::ValidationResult;

/// The kind of values a node expects in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Any,
    Numeric,
    Integer,
    Double,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Returns `true` if a column stored as `storage` satisfies this kind.
    pub fn accepts(self, storage: StorageKind) -> bool {
        match self {
            ColumnKind::Any => true,
            ColumnKind::Numeric => storage.is_numeric(),
            ColumnKind::Integer => storage == StorageKind::Integer,
            ColumnKind::Double => storage == StorageKind::Double,
            ColumnKind::Boolean => storage == StorageKind::Boolean,
            ColumnKind::Text => storage == StorageKind::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Any => "any",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Integer => "integer",
            ColumnKind::Double => "double",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Text => "text",
        }
    }
}

impl FromStr for ColumnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(ColumnKind::Any),
            "numeric" | "number" => Ok(ColumnKind::Numeric),
            "integer" | "int" => Ok(ColumnKind::Integer),
            "double" | "float" => Ok(ColumnKind::Double),
            "boolean" | "bool" => Ok(ColumnKind::Boolean),
            "text" | "string" => Ok(ColumnKind::Text),
            other => Err(format!("unknown column kind '{other}'")),
        }
    }
}

/// A single column in a node signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// An expected output column as declared by the orchestrator (`FF_SCHEMA`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,
}

/// The column contract of a node: what it reads from its primary input and
/// what it adds to its output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub inputs: Vec<ColumnSpec>,
    pub outputs: Vec<ColumnSpec>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input column to the signature.
    pub fn input(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.inputs.push(ColumnSpec::new(name, kind));
        self
    }

    /// Add an output column to the signature.
    pub fn output(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.outputs.push(ColumnSpec::new(name, kind));
        self
    }

    /// Returns a stable, structural hash of the signature.
    pub fn structural_hash(&self) -> String {
        let mut hasher = DefaultHasher::new();
        for column in &self.inputs {
            column.name.hash(&mut hasher);
            column.kind.hash(&mut hasher);
        }
        "input_separator".hash(&mut hasher);
        for column in &self.outputs {
            column.name.hash(&mut hasher);
            column.kind.hash(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    }

    /// Checks a described input table (`(column, type)` pairs) against the
    /// declared inputs. Runs before any rows are read.
    pub fn check_input(&self, schema: &[(String, String)]) -> ValidationResult {
        let mut result = ValidationResult::new();
        for spec in &self.inputs {
            match schema.iter().find(|(name, _)| name == &spec.name) {
                None => result.add_error(&spec.name, "column not found in input table"),
                Some((_, declared)) => {
                    if !spec.kind.accepts(StorageKind::from_declared(declared)) {
                        result.add_error(
                            &spec.name,
                            format!("expected {} column, found {}", spec.kind.as_str(), declared),
                        );
                    }
                }
            }
        }
        result
    }

    /// Checks a transformed frame against the declared outputs and any
    /// orchestrator-declared columns. Runs before the write step.
    pub fn check_output(&self, frame: &TabularFrame, declared: &[DeclaredColumn]) -> ValidationResult {
        let mut result = ValidationResult::new();
        for spec in &self.outputs {
            match frame.column(&spec.name) {
                None => result.add_error(&spec.name, "declared output column was not produced"),
                Some(column) if !spec.kind.accepts(column.kind()) => result.add_error(
                    &spec.name,
                    format!(
                        "expected {} output, produced {}",
                        spec.kind.as_str(),
                        column.declared_type()
                    ),
                ),
                Some(_) => {}
            }
        }

        // Expected columns are matched case-insensitively, like DuckDB identifiers.
        for expected in declared {
            let found = frame
                .columns()
                .iter()
                .find(|c| c.name().eq_ignore_ascii_case(&expected.name));
            match (found, &expected.data_type) {
                (None, _) => result.add_error(&expected.name, "output is missing declared column"),
                (Some(column), Some(data_type))
                    if StorageKind::from_declared(data_type) != column.kind() =>
                {
                    result.add_warning(
                        &expected.name,
                        format!("declared {}, produced {}", data_type, column.declared_type()),
                    )
                }
                _ => {}
            }
        }
        result
    }
}

impl FromStr for Signature {
    type Err = String;

    /// Parses shorthand syntax: "amount:numeric, id -> score:double"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("->").collect();
        if parts.len() != 2 {
            return Err("Signature must contain exactly one '->'".to_string());
        }

        let parse_columns = |part: &str| -> Result<Vec<ColumnSpec>, String> {
            part.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| match c.split_once(':') {
                    Some((name, kind)) => Ok(ColumnSpec::new(name.trim(), kind.parse()?)),
                    None => Ok(ColumnSpec::new(c, ColumnKind::Any)),
                })
                .collect()
        };

        Ok(Signature {
            inputs: parse_columns(parts[0])?,
            outputs: parse_columns(parts[1])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Column, Scalar};

    fn described() -> Vec<(String, String)> {
        vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("amount".to_string(), "DECIMAL(10,2)".to_string()),
            ("note".to_string(), "VARCHAR".to_string()),
        ]
    }

    #[test]
    fn test_input_check_passes() {
        let sig = Signature::new().input("amount", ColumnKind::Numeric);
        assert!(sig.check_input(&described()).is_safe());
    }

    #[test]
    fn test_input_check_missing_column() {
        let sig = Signature::new().input("price", ColumnKind::Numeric);
        let result = sig.check_input(&described());
        assert!(!result.is_safe());
        assert!(result.into_result().unwrap_err().to_string().contains("'price'"));
    }

    #[test]
    fn test_input_check_wrong_kind() {
        let sig = Signature::new().input("note", ColumnKind::Numeric);
        assert!(!sig.check_input(&described()).is_safe());
    }

    #[test]
    fn test_output_check() {
        let frame = TabularFrame::from_columns(vec![
            Column::new("amount", StorageKind::Integer, vec![Scalar::Integer(1)]),
            Column::new("score", StorageKind::Double, vec![Scalar::Double(1.1)]),
        ])
        .unwrap();
        let sig = Signature::new().output("score", ColumnKind::Double);

        assert!(sig.check_output(&frame, &[]).is_safe());

        let declared = vec![
            DeclaredColumn { name: "AMOUNT".into(), data_type: Some("VARCHAR".into()) },
            DeclaredColumn { name: "score".into(), data_type: None },
        ];
        let result = sig.check_output(&frame, &declared);
        assert!(result.is_safe());
        assert!(result.has_warnings());

        let declared = vec![DeclaredColumn { name: "rank".into(), data_type: None }];
        assert!(!sig.check_output(&frame, &declared).is_safe());
    }

    #[test]
    fn test_shorthand_parsing() {
        let sig: Signature = "amount:numeric, id -> score:double".parse().unwrap();
        assert_eq!(sig.inputs[0], ColumnSpec::new("amount", ColumnKind::Numeric));
        assert_eq!(sig.inputs[1], ColumnSpec::new("id", ColumnKind::Any));
        assert_eq!(sig.outputs[0], ColumnSpec::new("score", ColumnKind::Double));

        assert!("amount".parse::<Signature>().is_err());
        assert!("amount:money -> score".parse::<Signature>().is_err());
    }

    #[test]
    fn test_structural_hash() {
        let a: Signature = "amount:numeric -> score:double".parse().unwrap();
        let b: Signature = "amount:numeric -> score:double".parse().unwrap();
        let c: Signature = "amount:any -> score:double".parse().unwrap();
        assert_eq!(a.structural_hash(), b.structural_hash());
        assert_ne!(a.structural_hash(), c.structural_hash());
    }
}
