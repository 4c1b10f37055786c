use serde_json::{Map, Value};

use super::rejection::{
    json_kind, FieldPath, FieldViolation, InvariantViolation, RejectionReason, StructuralError,
    ViolationKind,
};
use crate::record::{Entity, FieldSpec, FieldType, Presence, Timestamp};

/// Outcome of checking one field of a raw object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Checked<T> {
    Valid(T),
    /// Not present (or `null` for a field that is not required). Only reported
    /// as a violation when the field is required.
    Absent,
    Invalid,
}

impl<T> Checked<T> {
    /// Value of a required field.
    pub(crate) fn valid(self) -> Option<T> {
        match self {
            Checked::Valid(value) => Some(value),
            Checked::Absent | Checked::Invalid => None,
        }
    }

    /// Value of an optional field: `Some(None)` when absent, `None` when invalid.
    pub(crate) fn optional(self) -> Option<Option<T>> {
        match self {
            Checked::Valid(value) => Some(Some(value)),
            Checked::Absent => Some(None),
            Checked::Invalid => None,
        }
    }
}

/// Accumulates every field violation of one validation walk.
///
/// Each field gets at most one violation: a structural failure (missing,
/// mistyped) suppresses that field's bound check.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finish<T>(self, entity: Entity, value: Option<T>) -> Result<T, RejectionReason> {
        match value {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ => Err(RejectionReason::new(entity, self.violations)),
        }
    }

    fn push(
        &mut self,
        entity: Entity,
        path: FieldPath,
        received: Option<&Value>,
        kind: impl Into<ViolationKind>,
    ) {
        self.violations.push(FieldViolation {
            entity,
            path,
            received: received.cloned(),
            kind: kind.into(),
        });
    }

    fn mismatch(&mut self, entity: Entity, path: FieldPath, expected: FieldType, received: &Value) {
        self.push(
            entity,
            path,
            Some(received),
            StructuralError::TypeMismatch {
                expected,
                found: json_kind(received),
            },
        );
    }

    fn out_of_bounds(
        &mut self,
        entity: Entity,
        spec: &FieldSpec,
        path: FieldPath,
        received: Option<&Value>,
    ) {
        if let Some(bound) = spec.bound {
            self.push(entity, path, received, InvariantViolation::OutOfBounds { bound });
        }
    }

    // ---- typed values -------------------------------------------------

    pub(crate) fn check_float(
        &mut self,
        entity: Entity,
        spec: &FieldSpec,
        path: &FieldPath,
        value: f64,
    ) -> Option<f64> {
        if !value.is_finite() {
            self.push(
                entity,
                path.clone(),
                Some(&Value::String(value.to_string())),
                StructuralError::TypeMismatch {
                    expected: spec.field_type,
                    found: "non-finite number",
                },
            );
            return None;
        }

        match spec.bound {
            Some(bound) if !bound.admits_float(value) => {
                self.out_of_bounds(entity, spec, path.clone(), Some(&Value::from(value)));
                None
            }
            _ => Some(value),
        }
    }

    pub(crate) fn check_int(
        &mut self,
        entity: Entity,
        spec: &FieldSpec,
        path: &FieldPath,
        value: i128,
    ) -> Option<i128> {
        match spec.bound {
            Some(bound) if !bound.admits_int(value) => {
                self.out_of_bounds(entity, spec, path.clone(), Some(&int_value(value)));
                None
            }
            _ => Some(value),
        }
    }

    pub(crate) fn check_len(
        &mut self,
        entity: Entity,
        spec: &FieldSpec,
        path: &FieldPath,
        len: usize,
        received: Option<&Value>,
    ) -> bool {
        match spec.bound {
            Some(bound) if !bound.admits_len(len) => {
                self.out_of_bounds(entity, spec, path.clone(), received);
                false
            }
            _ => true,
        }
    }

    /// Spike lists carry no bound, only the requirement that every item is a finite number.
    pub(crate) fn check_float_list(
        &mut self,
        entity: Entity,
        path: &FieldPath,
        values: &[f64],
    ) -> bool {
        let mut admitted = true;
        for (index, value) in values.iter().enumerate() {
            if !value.is_finite() {
                self.push(
                    entity,
                    path.index(index),
                    Some(&Value::String(value.to_string())),
                    StructuralError::TypeMismatch {
                        expected: FieldType::Float,
                        found: "non-finite number",
                    },
                );
                admitted = false;
            }
        }
        admitted
    }

    // ---- raw values ---------------------------------------------------

    pub(crate) fn object<'a>(
        &mut self,
        entity: Entity,
        raw: &'a Value,
        path: &FieldPath,
    ) -> Option<&'a Map<String, Value>> {
        match raw {
            Value::Object(map) => Some(map),
            other => {
                self.mismatch(entity, path.clone(), FieldType::Object, other);
                None
            }
        }
    }

    /// Canonical key first, then the legacy alias. `null` counts as absent
    /// unless the field is required.
    pub(crate) fn lookup<'a>(obj: &'a Map<String, Value>, spec: &FieldSpec) -> Option<&'a Value> {
        let value = obj
            .get(spec.name)
            .or_else(|| spec.alias.and_then(|alias| obj.get(alias)))?;
        match (value, spec.presence) {
            (Value::Null, Presence::Optional | Presence::DefaultEmpty) => None,
            (value, _) => Some(value),
        }
    }

    fn present<'a>(
        &mut self,
        entity: Entity,
        obj: &'a Map<String, Value>,
        spec: &FieldSpec,
        path: &FieldPath,
    ) -> Option<&'a Value> {
        let value = Self::lookup(obj, spec);
        if value.is_none() && spec.presence == Presence::Required {
            self.push(entity, path.clone(), None, StructuralError::Missing);
        }
        value
    }

    pub(crate) fn float(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<f64> {
        let path = parent.field(spec.name);
        let Some(raw) = self.present(entity, obj, spec, &path) else {
            return Checked::Absent;
        };
        let Some(value) = raw.as_f64() else {
            self.mismatch(entity, path, spec.field_type, raw);
            return Checked::Invalid;
        };
        match spec.bound {
            Some(bound) if !bound.admits_float(value) => {
                self.out_of_bounds(entity, spec, path, Some(raw));
                Checked::Invalid
            }
            _ => Checked::Valid(value),
        }
    }

    pub(crate) fn int(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<i128> {
        let path = parent.field(spec.name);
        let Some(raw) = self.present(entity, obj, spec, &path) else {
            return Checked::Absent;
        };
        let integer = match raw {
            Value::Number(number) => number
                .as_u64()
                .map(i128::from)
                .or_else(|| number.as_i64().map(i128::from)),
            _ => None,
        };
        let Some(value) = integer else {
            self.mismatch(entity, path, spec.field_type, raw);
            return Checked::Invalid;
        };
        match spec.bound {
            Some(bound) if !bound.admits_int(value) => {
                self.out_of_bounds(entity, spec, path, Some(raw));
                Checked::Invalid
            }
            _ => Checked::Valid(value),
        }
    }

    pub(crate) fn text(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<String> {
        let path = parent.field(spec.name);
        match self.present(entity, obj, spec, &path) {
            None => Checked::Absent,
            Some(Value::String(text)) => Checked::Valid(text.clone()),
            Some(other) => {
                self.mismatch(entity, path, spec.field_type, other);
                Checked::Invalid
            }
        }
    }

    pub(crate) fn timestamp(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<Timestamp> {
        let path = parent.field(spec.name);
        let Some(raw) = self.present(entity, obj, spec, &path) else {
            return Checked::Absent;
        };
        let Value::String(text) = raw else {
            self.mismatch(entity, path, spec.field_type, raw);
            return Checked::Invalid;
        };
        match Timestamp::parse(text) {
            Ok(timestamp) => Checked::Valid(timestamp),
            Err(_) => {
                self.push(entity, path, Some(raw), StructuralError::MalformedTimestamp);
                Checked::Invalid
            }
        }
    }

    /// A list of numbers; every non-numeric item is reported at its own index.
    pub(crate) fn float_list(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<Vec<f64>> {
        let path = parent.field(spec.name);
        let items = match self.present(entity, obj, spec, &path) {
            None if spec.presence == Presence::DefaultEmpty => return Checked::Valid(Vec::new()),
            None => return Checked::Absent,
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.mismatch(entity, path, spec.field_type, other);
                return Checked::Invalid;
            }
        };

        let mut values = Vec::with_capacity(items.len());
        let mut admitted = true;
        for (index, item) in items.iter().enumerate() {
            match item.as_f64() {
                Some(value) => values.push(value),
                None => {
                    self.mismatch(entity, path.index(index), FieldType::Float, item);
                    admitted = false;
                }
            }
        }

        if admitted {
            Checked::Valid(values)
        } else {
            Checked::Invalid
        }
    }

    /// A list whose items the caller walks itself; only the length bound is checked here.
    pub(crate) fn list<'a>(
        &mut self,
        entity: Entity,
        obj: &'a Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<&'a [Value]> {
        let path = parent.field(spec.name);
        let Some(raw) = self.present(entity, obj, spec, &path) else {
            return Checked::Absent;
        };
        let Value::Array(items) = raw else {
            self.mismatch(entity, path, spec.field_type, raw);
            return Checked::Invalid;
        };
        if self.check_len(entity, spec, &path, items.len(), Some(raw)) {
            Checked::Valid(items.as_slice())
        } else {
            Checked::Invalid
        }
    }

    pub(crate) fn nested<'a>(
        &mut self,
        entity: Entity,
        obj: &'a Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) -> Checked<&'a Map<String, Value>> {
        let path = parent.field(spec.name);
        match self.present(entity, obj, spec, &path) {
            None => Checked::Absent,
            Some(Value::Object(map)) => Checked::Valid(map),
            Some(other) => {
                self.mismatch(entity, path, spec.field_type, other);
                Checked::Invalid
            }
        }
    }

    /// Records a bound violation that depends on more than one field.
    pub(crate) fn cross_field(
        &mut self,
        entity: Entity,
        obj: &Map<String, Value>,
        spec: &FieldSpec,
        parent: &FieldPath,
    ) {
        let received = Self::lookup(obj, spec);
        self.out_of_bounds(entity, spec, parent.field(spec.name), received);
    }

    pub(crate) fn count_mismatch(
        &mut self,
        entity: Entity,
        spec: &FieldSpec,
        parent: &FieldPath,
        declared: u64,
        actual: u64,
    ) {
        self.push(
            entity,
            parent.field(spec.name),
            Some(&Value::from(declared)),
            InvariantViolation::CountMismatch { declared, actual },
        );
    }
}

fn int_value(value: i128) -> Value {
    if let Ok(value) = i64::try_from(value) {
        Value::from(value)
    } else if let Ok(value) = u64::try_from(value) {
        Value::from(value)
    } else {
        Value::String(value.to_string())
    }
}
