use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::record::{Bound, Entity, FieldType};

/// Dotted/indexed location of a field inside a raw record, e.g.
/// `message.cycles[2].voltage`. The empty path is the record itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<record>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// The field is absent or does not have its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("required field is missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: FieldType,
        found: &'static str,
    },

    #[error("string is not a valid timestamp")]
    MalformedTimestamp,
}

/// The field is present and typed but its value breaks an invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("value violates bound ({bound})")]
    OutOfBounds { bound: Bound },

    #[error("declares {declared} but the session holds {actual}")]
    CountMismatch { declared: u64, actual: u64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViolationKind {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// One failing field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Entity that owns the failing field.
    pub entity: Entity,
    pub path: FieldPath,
    /// Raw value as received; `None` when the field was missing.
    pub received: Option<Value>,
    pub kind: ViolationKind,
}

impl FieldViolation {
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ViolationKind::Structural(_))
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field '{}': {}", self.entity, self.path, self.kind)?;
        if let Some(received) = &self.received {
            write!(f, " (received {received})")?;
        }
        Ok(())
    }
}

/// Every field-level failure found in one raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionReason {
    entity: Entity,
    violations: Vec<FieldViolation>,
}

impl RejectionReason {
    pub(crate) fn new(entity: Entity, violations: Vec<FieldViolation>) -> Self {
        Self { entity, violations }
    }

    /// Entity that was being validated (the top of the walk).
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Failures in walk order: fields in schema order, list items by index.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|violation| violation.path.as_str())
    }

    pub fn violation_at(&self, path: &str) -> Option<&FieldViolation> {
        self.violations
            .iter()
            .find(|violation| violation.path.as_str() == path)
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rejected with {} violation(s)",
            self.entity,
            self.violations.len()
        )?;
        for (index, violation) in self.violations.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RejectionReason {}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
