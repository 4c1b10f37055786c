//! Field tables for every record level.
//!
//! The validator walks these tables and the serializer emits keys in table
//! order, so a field's name, type and bound are declared exactly once.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Cycle,
    Message,
    Envelope,
    SessionSummary,
    Session,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Cycle => "cycle",
            Entity::Message => "message",
            Entity::Envelope => "envelope",
            Entity::SessionSummary => "session summary",
            Entity::Session => "session",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Float,
    Integer,
    Text,
    Timestamp,
    FloatList,
    List,
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Text => "string",
            FieldType::Timestamp => "timestamp string",
            FieldType::FloatList => "list of floats",
            FieldType::List => "list",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    /// Absent or `null` means "not populated".
    Optional,
    /// Absent or `null` means an empty list.
    DefaultEmpty,
}

/// Invariant predicate attached to a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `min < value < max`
    OpenRange { min: f64, max: f64 },
    /// `value >= min`
    AtLeast(f64),
    /// `value >= min`, integer
    IntAtLeast(i64),
    /// `min <= value <= max`, integer
    IntRange { min: i64, max: i64 },
    /// list length `>= n`
    MinItems(usize),
    /// timestamp strictly later than the named sibling field
    After(&'static str),
}

impl Bound {
    pub fn admits_float(&self, value: f64) -> bool {
        match *self {
            Bound::OpenRange { min, max } => value > min && value < max,
            Bound::AtLeast(min) => value >= min,
            _ => true,
        }
    }

    pub fn admits_int(&self, value: i128) -> bool {
        match *self {
            Bound::IntAtLeast(min) => value >= i128::from(min),
            Bound::IntRange { min, max } => value >= i128::from(min) && value <= i128::from(max),
            _ => true,
        }
    }

    pub fn admits_len(&self, len: usize) -> bool {
        match *self {
            Bound::MinItems(min) => len >= min,
            _ => true,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::OpenRange { min, max } => write!(f, "{min:?} < value < {max:?}"),
            Bound::AtLeast(min) => write!(f, "value >= {min:?}"),
            Bound::IntAtLeast(min) => write!(f, "value >= {min}"),
            Bound::IntRange { min, max } => write!(f, "{min} <= value <= {max}"),
            Bound::MinItems(min) => write!(f, "at least {min} item(s)"),
            Bound::After(field) => write!(f, "later than {field}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Compact key used by the device firmware and the first archive format.
    pub alias: Option<&'static str>,
    pub field_type: FieldType,
    pub presence: Presence,
    pub bound: Option<Bound>,
}

impl FieldSpec {
    const fn new(
        name: &'static str,
        alias: Option<&'static str>,
        field_type: FieldType,
        presence: Presence,
        bound: Option<Bound>,
    ) -> Self {
        Self {
            name,
            alias,
            field_type,
            presence,
            bound,
        }
    }
}

pub const VOLTAGE: FieldSpec = FieldSpec::new(
    "voltage",
    Some("v"),
    FieldType::Float,
    Presence::Required,
    Some(Bound::OpenRange { min: 0.0, max: 3.0 }),
);
pub const TIME: FieldSpec = FieldSpec::new(
    "time",
    Some("t"),
    FieldType::Float,
    Presence::Required,
    Some(Bound::AtLeast(0.0)),
);
pub const PREDICTED_SPIKES: FieldSpec = FieldSpec::new(
    "predicted_spikes",
    Some("pred"),
    FieldType::FloatList,
    Presence::DefaultEmpty,
    None,
);
pub const GROUND_TRUTH_SPIKES: FieldSpec = FieldSpec::new(
    "ground_truth_spikes",
    Some("gt"),
    FieldType::FloatList,
    Presence::DefaultEmpty,
    None,
);

pub const CYCLES: FieldSpec = FieldSpec::new(
    "cycles",
    None,
    FieldType::List,
    Presence::Required,
    Some(Bound::MinItems(1)),
);

pub const SEQUENCE_ID: FieldSpec = FieldSpec::new(
    "sequence_id",
    Some("message_id"),
    FieldType::Integer,
    Presence::Required,
    Some(Bound::IntAtLeast(1)),
);
pub const RECEIVED_AT: FieldSpec = FieldSpec::new(
    "received_at",
    None,
    FieldType::Timestamp,
    Presence::Required,
    None,
);
pub const MESSAGE: FieldSpec = FieldSpec::new(
    "message",
    Some("data"),
    FieldType::Object,
    Presence::Required,
    None,
);

pub const CLIENT_ADDRESS: FieldSpec = FieldSpec::new(
    "client_address",
    Some("client_ip"),
    FieldType::Text,
    Presence::Required,
    None,
);
pub const CLIENT_PORT: FieldSpec = FieldSpec::new(
    "client_port",
    None,
    FieldType::Integer,
    Presence::Required,
    Some(Bound::IntRange { min: 0, max: 65535 }),
);
pub const START_TIME: FieldSpec = FieldSpec::new(
    "start_time",
    None,
    FieldType::Timestamp,
    Presence::Required,
    None,
);
pub const END_TIME: FieldSpec = FieldSpec::new(
    "end_time",
    None,
    FieldType::Timestamp,
    Presence::Optional,
    Some(Bound::After("start_time")),
);
pub const TOTAL_MESSAGES: FieldSpec = FieldSpec::new(
    "total_messages",
    None,
    FieldType::Integer,
    Presence::Optional,
    Some(Bound::IntAtLeast(0)),
);
pub const TOTAL_CYCLES: FieldSpec = FieldSpec::new(
    "total_cycles",
    None,
    FieldType::Integer,
    Presence::Optional,
    Some(Bound::IntAtLeast(0)),
);
pub const DURATION_SECONDS: FieldSpec = FieldSpec::new(
    "duration_seconds",
    None,
    FieldType::Float,
    Presence::Optional,
    Some(Bound::AtLeast(0.0)),
);

pub const SUMMARY: FieldSpec = FieldSpec::new(
    "summary",
    Some("session_info"),
    FieldType::Object,
    Presence::Required,
    None,
);
pub const MESSAGES: FieldSpec = FieldSpec::new(
    "messages",
    None,
    FieldType::List,
    Presence::Required,
    None,
);

pub const CYCLE_FIELDS: &[FieldSpec] = &[VOLTAGE, TIME, PREDICTED_SPIKES, GROUND_TRUTH_SPIKES];
pub const MESSAGE_FIELDS: &[FieldSpec] = &[CYCLES];
pub const ENVELOPE_FIELDS: &[FieldSpec] = &[SEQUENCE_ID, RECEIVED_AT, MESSAGE];
pub const SUMMARY_FIELDS: &[FieldSpec] = &[
    CLIENT_ADDRESS,
    CLIENT_PORT,
    START_TIME,
    END_TIME,
    TOTAL_MESSAGES,
    TOTAL_CYCLES,
    DURATION_SECONDS,
];
pub const SESSION_FIELDS: &[FieldSpec] = &[SUMMARY, MESSAGES];

pub fn fields_of(entity: Entity) -> &'static [FieldSpec] {
    match entity {
        Entity::Cycle => CYCLE_FIELDS,
        Entity::Message => MESSAGE_FIELDS,
        Entity::Envelope => ENVELOPE_FIELDS,
        Entity::SessionSummary => SUMMARY_FIELDS,
        Entity::Session => SESSION_FIELDS,
    }
}
