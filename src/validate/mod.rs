//! Raw-to-typed validation.
//!
//! Every entry point takes an untyped `serde_json::Value` and returns either
//! the typed record or a [`RejectionReason`] listing every failing field of
//! the whole input. Validation is pure, so any number of threads may call it
//! concurrently.

mod collector;
mod rejection;

pub(crate) use collector::Collector;
pub use rejection::{
    FieldPath, FieldViolation, InvariantViolation, RejectionReason, StructuralError,
    ViolationKind,
};

use serde_json::{Map, Value};

use crate::codec;
use crate::error::PayloadError;
use crate::record::schema::{
    CLIENT_ADDRESS, CLIENT_PORT, CYCLES, DURATION_SECONDS, END_TIME, GROUND_TRUTH_SPIKES, MESSAGE,
    MESSAGES, PREDICTED_SPIKES, RECEIVED_AT, SEQUENCE_ID, START_TIME, SUMMARY, TIME,
    TOTAL_CYCLES, TOTAL_MESSAGES, VOLTAGE,
};
use crate::record::{Cycle, Entity, Envelope, FieldSpec, Message, Session, SessionSummary};

type Walk<T> = fn(&mut Collector, &Map<String, Value>, &FieldPath) -> Option<T>;

/// Validates one raw envelope (`sequence_id`, `received_at`, `message`).
pub fn validate(raw: &Value) -> Result<Envelope, RejectionReason> {
    run(Entity::Envelope, raw, walk_envelope)
}

/// Validates a whole raw session, including the summary totals cross-check.
pub fn validate_session(raw: &Value) -> Result<Session, RejectionReason> {
    run(Entity::Session, raw, walk_session)
}

pub fn validate_message(raw: &Value) -> Result<Message, RejectionReason> {
    run(Entity::Message, raw, walk_message)
}

pub fn validate_cycle(raw: &Value) -> Result<Cycle, RejectionReason> {
    run(Entity::Cycle, raw, walk_cycle)
}

pub fn validate_summary(raw: &Value) -> Result<SessionSummary, RejectionReason> {
    run(Entity::SessionSummary, raw, walk_summary)
}

/// Parses externally sourced envelope text and validates it.
pub fn parse_and_validate(text: &str) -> Result<Envelope, PayloadError> {
    let raw = codec::decode_raw(text)?;
    Ok(validate(&raw)?)
}

/// Parses externally sourced session text (e.g. an archive file) and validates it.
pub fn parse_and_validate_session(text: &str) -> Result<Session, PayloadError> {
    let raw = codec::decode_raw(text)?;
    Ok(validate_session(&raw)?)
}

fn run<T>(entity: Entity, raw: &Value, walk: Walk<T>) -> Result<T, RejectionReason> {
    let mut collector = Collector::new();
    let root = FieldPath::root();
    let value = collector
        .object(entity, raw, &root)
        .and_then(|obj| walk(&mut collector, obj, &root));
    collector.finish(entity, value)
}

// All fields of a level are checked before any `?`, so one bad field never
// hides another.

fn walk_cycle(c: &mut Collector, obj: &Map<String, Value>, path: &FieldPath) -> Option<Cycle> {
    let entity = Entity::Cycle;
    let voltage = c.float(entity, obj, &VOLTAGE, path).valid();
    let time = c.float(entity, obj, &TIME, path).valid();
    let predicted = c.float_list(entity, obj, &PREDICTED_SPIKES, path).valid();
    let ground_truth = c.float_list(entity, obj, &GROUND_TRUTH_SPIKES, path).valid();

    Some(Cycle::from_parts(voltage?, time?, predicted?, ground_truth?))
}

fn walk_message(c: &mut Collector, obj: &Map<String, Value>, path: &FieldPath) -> Option<Message> {
    let items = c.list(Entity::Message, obj, &CYCLES, path).valid()?;
    let cycles_path = path.field(CYCLES.name);

    let mut cycles = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item_path = cycles_path.index(index);
        let cycle = c
            .object(Entity::Cycle, item, &item_path)
            .and_then(|cycle| walk_cycle(c, cycle, &item_path));
        cycles.push(cycle);
    }

    cycles
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .map(Message::from_parts)
}

fn walk_envelope(
    c: &mut Collector,
    obj: &Map<String, Value>,
    path: &FieldPath,
) -> Option<Envelope> {
    let entity = Entity::Envelope;
    let sequence_id = c
        .int(entity, obj, &SEQUENCE_ID, path)
        .valid()
        .and_then(|id| u64::try_from(id).ok());
    let received_at = c.timestamp(entity, obj, &RECEIVED_AT, path).valid();
    let message_path = path.field(MESSAGE.name);
    let message = c
        .nested(entity, obj, &MESSAGE, path)
        .valid()
        .and_then(|message| walk_message(c, message, &message_path));

    Some(Envelope::from_parts(sequence_id?, received_at?, message?))
}

fn walk_summary(
    c: &mut Collector,
    obj: &Map<String, Value>,
    path: &FieldPath,
) -> Option<SessionSummary> {
    let entity = Entity::SessionSummary;
    let client_address = c.text(entity, obj, &CLIENT_ADDRESS, path).valid();
    let client_port = c
        .int(entity, obj, &CLIENT_PORT, path)
        .valid()
        .and_then(|port| u16::try_from(port).ok());
    let start_time = c.timestamp(entity, obj, &START_TIME, path).valid();
    let mut end_time = c.timestamp(entity, obj, &END_TIME, path).optional();
    let total_messages = to_count(c.int(entity, obj, &TOTAL_MESSAGES, path).optional());
    let total_cycles = to_count(c.int(entity, obj, &TOTAL_CYCLES, path).optional());
    let duration_seconds = c.float(entity, obj, &DURATION_SECONDS, path).optional();

    if let (Some(start), Some(Some(end))) = (start_time, end_time) {
        if end <= start {
            c.cross_field(entity, obj, &END_TIME, path);
            end_time = None;
        }
    }

    Some(SessionSummary::from_parts(
        client_address?,
        client_port?,
        start_time?,
        end_time?,
        total_messages?,
        total_cycles?,
        duration_seconds?,
    ))
}

fn walk_session(c: &mut Collector, obj: &Map<String, Value>, path: &FieldPath) -> Option<Session> {
    let entity = Entity::Session;
    let summary_path = path.field(SUMMARY.name);
    let summary_obj = c.nested(entity, obj, &SUMMARY, path).valid();
    let summary = summary_obj.and_then(|summary| walk_summary(c, summary, &summary_path));

    let items = c.list(entity, obj, &MESSAGES, path).valid();
    let messages = items.map(|items| {
        let messages_path = path.field(MESSAGES.name);
        let mut envelopes = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = messages_path.index(index);
            let envelope = c
                .object(Entity::Envelope, item, &item_path)
                .and_then(|envelope| walk_envelope(c, envelope, &item_path));
            envelopes.push(envelope);
        }
        envelopes
    });
    let messages: Option<Vec<Envelope>> = messages.and_then(|all| all.into_iter().collect());

    // Totals are checked against the raw input, independent of other failures.
    // A mistyped or negative total is reported by walk_summary instead.
    if let (Some(summary_obj), Some(items)) = (summary_obj, items) {
        let declared =
            |spec: &FieldSpec| Collector::lookup(summary_obj, spec).and_then(Value::as_u64);

        if let Some(declared) = declared(&TOTAL_MESSAGES) {
            let actual = items.len() as u64;
            if declared != actual {
                c.count_mismatch(
                    Entity::SessionSummary,
                    &TOTAL_MESSAGES,
                    &summary_path,
                    declared,
                    actual,
                );
            }
        }

        let actual_cycles: Option<u64> = items.iter().map(raw_cycle_count).sum();
        if let (Some(declared), Some(actual)) = (declared(&TOTAL_CYCLES), actual_cycles) {
            if declared != actual {
                c.count_mismatch(
                    Entity::SessionSummary,
                    &TOTAL_CYCLES,
                    &summary_path,
                    declared,
                    actual,
                );
            }
        }
    }

    Some(Session::from_parts(summary?, messages?))
}

/// Length of a raw envelope's `message.cycles` list, if it has one.
fn raw_cycle_count(envelope: &Value) -> Option<u64> {
    let envelope = envelope.as_object()?;
    let message = Collector::lookup(envelope, &MESSAGE)?.as_object()?;
    let cycles = Collector::lookup(message, &CYCLES)?.as_array()?;
    Some(cycles.len() as u64)
}

fn to_count(value: Option<Option<i128>>) -> Option<Option<u64>> {
    match value {
        Some(Some(count)) => u64::try_from(count).ok().map(Some),
        Some(None) => Some(None),
        None => None,
    }
}
