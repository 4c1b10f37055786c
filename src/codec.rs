//! Canonical text encoding shared by the queue transport and the session archive.
//!
//! The canonical form is compact JSON with keys in schema order, optional
//! summary fields always present (`null` when unpopulated), floats in their
//! shortest round-trip rendering and timestamps in canonical form. Decoding
//! does not validate; text from outside the process goes through
//! [`crate::validate::parse_and_validate`] instead.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::record::{Entity, Envelope, Session};

/// Values that have a canonical encoding.
pub trait Record: Serialize + DeserializeOwned + sealed::Sealed {
    const ENTITY: Entity;
}

impl Record for Envelope {
    const ENTITY: Entity = Entity::Envelope;
}

impl Record for Session {
    const ENTITY: Entity = Entity::Session;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::record::Envelope {}
    impl Sealed for crate::record::Session {}
}

#[derive(Debug, Error)]
#[error("failed to encode {entity}: {source}")]
pub struct EncodeError {
    pub entity: Entity,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed canonical text at line {line}, column {column}: {source}")]
    Syntax {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("canonical text at line {line}, column {column} is not a {entity}: {source}")]
    Shape {
        entity: Entity,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    fn from_json(entity: Option<Entity>, source: serde_json::Error) -> Self {
        let (line, column) = (source.line(), source.column());
        match entity {
            Some(entity) if source.is_data() => Self::Shape {
                entity,
                line,
                column,
                source,
            },
            _ => Self::Syntax {
                line,
                column,
                source,
            },
        }
    }
}

/// Deterministic canonical encoding.
pub fn encode<R: Record>(record: &R) -> Result<String, EncodeError> {
    serde_json::to_string(record).map_err(|source| EncodeError {
        entity: R::ENTITY,
        source,
    })
}

/// Indented rendering for people reading an archive. Not canonical.
pub fn encode_pretty<R: Record>(record: &R) -> Result<String, EncodeError> {
    serde_json::to_string_pretty(record).map_err(|source| EncodeError {
        entity: R::ENTITY,
        source,
    })
}

/// Decodes trusted canonical text without re-checking invariants.
pub fn decode<R: Record>(text: &str) -> Result<R, DecodeError> {
    serde_json::from_str(text).map_err(|source| DecodeError::from_json(Some(R::ENTITY), source))
}

/// Parses text into an untyped value for [`crate::validate`].
pub fn decode_raw(text: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(text).map_err(|source| DecodeError::from_json(None, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::fields_of;
    use crate::record::{Cycle, Message, Timestamp};
    use crate::session::SessionHandle;

    fn keys(value: &Value) -> Vec<String> {
        value
            .as_object()
            .expect("object")
            .keys()
            .cloned()
            .collect()
    }

    fn key_order(text: &str, names: &[&str]) -> Vec<usize> {
        names
            .iter()
            .map(|name| {
                text.find(&format!("\"{name}\":"))
                    .unwrap_or_else(|| panic!("key {name} missing from {text}"))
            })
            .collect()
    }

    fn sample_envelope() -> Envelope {
        let cycle = Cycle::new(1.2, 5000.5, vec![1000.2], vec![1000.0]).expect("valid cycle");
        let message = Message::new(vec![cycle]).expect("valid message");
        let received_at = Timestamp::parse("2025-11-21T12:34:56.789123").expect("timestamp");
        Envelope::new(1, received_at, message).expect("valid envelope")
    }

    #[test]
    fn envelope_encoding_is_stable() {
        let text = encode(&sample_envelope()).expect("encode");
        assert_eq!(
            text,
            r#"{"sequence_id":1,"received_at":"2025-11-21T12:34:56.789123","message":{"cycles":[{"voltage":1.2,"time":5000.5,"predicted_spikes":[1000.2],"ground_truth_spikes":[1000.0]}]}}"#
        );
        assert_eq!(text, encode(&sample_envelope()).expect("encode"));
    }

    #[test]
    fn keys_follow_schema_order() {
        let text = encode(&sample_envelope()).expect("encode");
        for entity in [Entity::Envelope, Entity::Message, Entity::Cycle] {
            let names: Vec<&str> = fields_of(entity).iter().map(|spec| spec.name).collect();
            let positions = key_order(&text, &names);
            assert!(
                positions.windows(2).all(|pair| pair[0] < pair[1]),
                "{entity} keys out of order in {text}"
            );
        }

        let start = Timestamp::parse("2025-11-21T12:34:00").expect("timestamp");
        let session = SessionHandle::open("10.0.0.5", 9000, start)
            .close(start.checked_add(chrono::TimeDelta::seconds(5)).expect("in range"))
            .expect("close");
        let text = encode(&session).expect("encode");
        for entity in [Entity::Session, Entity::SessionSummary] {
            let names: Vec<&str> = fields_of(entity).iter().map(|spec| spec.name).collect();
            let positions = key_order(&text, &names);
            assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn unpopulated_summary_fields_encode_as_null() {
        let start = Timestamp::parse("2025-11-21T12:34:00").expect("timestamp");
        let handle = SessionHandle::open("10.0.0.5", 9000, start);
        let summary = serde_json::to_value(handle.summary()).expect("summary value");
        assert_eq!(summary["end_time"], Value::Null);
        assert_eq!(summary["total_messages"], Value::Null);

        let mut expected: Vec<String> = fields_of(Entity::SessionSummary)
            .iter()
            .map(|spec| spec.name.to_string())
            .collect();
        expected.sort();
        assert_eq!(keys(&summary), expected);
    }

    #[test]
    fn decode_reports_syntax_and_shape_separately() {
        let syntax = decode::<Envelope>("{\"sequence_id\": 1,").expect_err("truncated");
        assert!(matches!(syntax, DecodeError::Syntax { .. }));

        let shape = decode::<Envelope>(r#"{"sequence_id": "one"}"#).expect_err("wrong shape");
        assert!(matches!(
            shape,
            DecodeError::Shape {
                entity: Entity::Envelope,
                ..
            }
        ));
    }
}
