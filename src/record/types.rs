use serde::{Deserialize, Serialize};

use super::schema::{self, Entity};
use super::timestamp::Timestamp;
use crate::validate::{Collector, FieldPath, RejectionReason};

/// One voltage/time sample with the spike timestamps observed around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    voltage: f64,
    time: f64,
    #[serde(default)]
    predicted_spikes: Vec<f64>,
    #[serde(default)]
    ground_truth_spikes: Vec<f64>,
}

impl Cycle {
    /// Builds a cycle from typed values, applying the same bounds as the validator.
    pub fn new(
        voltage: f64,
        time: f64,
        predicted_spikes: Vec<f64>,
        ground_truth_spikes: Vec<f64>,
    ) -> Result<Self, RejectionReason> {
        let root = FieldPath::root();
        let mut collector = Collector::new();

        let voltage = collector.check_float(
            Entity::Cycle,
            &schema::VOLTAGE,
            &root.field(schema::VOLTAGE.name),
            voltage,
        );
        let time = collector.check_float(
            Entity::Cycle,
            &schema::TIME,
            &root.field(schema::TIME.name),
            time,
        );
        let predicted_ok = collector.check_float_list(
            Entity::Cycle,
            &root.field(schema::PREDICTED_SPIKES.name),
            &predicted_spikes,
        );
        let ground_truth_ok = collector.check_float_list(
            Entity::Cycle,
            &root.field(schema::GROUND_TRUTH_SPIKES.name),
            &ground_truth_spikes,
        );

        let cycle = match (voltage, time, predicted_ok && ground_truth_ok) {
            (Some(voltage), Some(time), true) => Some(Self::from_parts(
                voltage,
                time,
                predicted_spikes,
                ground_truth_spikes,
            )),
            _ => None,
        };
        collector.finish(Entity::Cycle, cycle)
    }

    pub(crate) fn from_parts(
        voltage: f64,
        time: f64,
        predicted_spikes: Vec<f64>,
        ground_truth_spikes: Vec<f64>,
    ) -> Self {
        Self {
            voltage,
            time,
            predicted_spikes,
            ground_truth_spikes,
        }
    }

    /// Volts.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Microseconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn predicted_spikes(&self) -> &[f64] {
        &self.predicted_spikes
    }

    pub fn ground_truth_spikes(&self) -> &[f64] {
        &self.ground_truth_spikes
    }
}

/// One device transmission: a non-empty run of cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    cycles: Vec<Cycle>,
}

impl Message {
    pub fn new(cycles: Vec<Cycle>) -> Result<Self, RejectionReason> {
        let mut collector = Collector::new();
        let admitted = collector.check_len(
            Entity::Message,
            &schema::CYCLES,
            &FieldPath::root().field(schema::CYCLES.name),
            cycles.len(),
            None,
        );
        let message = admitted.then(|| Self::from_parts(cycles));
        collector.finish(Entity::Message, message)
    }

    pub(crate) fn from_parts(cycles: Vec<Cycle>) -> Self {
        Self { cycles }
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }
}

/// A message plus the transport metadata stamped on receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    sequence_id: u64,
    received_at: Timestamp,
    message: Message,
}

impl Envelope {
    pub fn new(
        sequence_id: u64,
        received_at: Timestamp,
        message: Message,
    ) -> Result<Self, RejectionReason> {
        let mut collector = Collector::new();
        let sequence_id = collector.check_int(
            Entity::Envelope,
            &schema::SEQUENCE_ID,
            &FieldPath::root().field(schema::SEQUENCE_ID.name),
            i128::from(sequence_id),
        );
        let envelope = sequence_id
            .and_then(|id| u64::try_from(id).ok())
            .map(|id| Self::from_parts(id, received_at, message));
        collector.finish(Entity::Envelope, envelope)
    }

    pub(crate) fn from_parts(sequence_id: u64, received_at: Timestamp, message: Message) -> Self {
        Self {
            sequence_id,
            received_at,
            message,
        }
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn cycle_count(&self) -> usize {
        self.message.cycle_count()
    }
}

/// Metadata describing one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    client_address: String,
    client_port: u16,
    start_time: Timestamp,
    end_time: Option<Timestamp>,
    total_messages: Option<u64>,
    total_cycles: Option<u64>,
    duration_seconds: Option<f64>,
}

impl SessionSummary {
    /// Summary of a session that has just started: nothing but the peer and start time.
    pub(crate) fn opened(client_address: String, client_port: u16, start_time: Timestamp) -> Self {
        Self {
            client_address,
            client_port,
            start_time,
            end_time: None,
            total_messages: None,
            total_cycles: None,
            duration_seconds: None,
        }
    }

    pub(crate) fn finalized(
        &self,
        end_time: Timestamp,
        total_messages: u64,
        total_cycles: u64,
    ) -> Self {
        Self {
            end_time: Some(end_time),
            total_messages: Some(total_messages),
            total_cycles: Some(total_cycles),
            duration_seconds: Some(end_time.seconds_since(&self.start_time)),
            ..self.clone()
        }
    }

    pub(crate) fn from_parts(
        client_address: String,
        client_port: u16,
        start_time: Timestamp,
        end_time: Option<Timestamp>,
        total_messages: Option<u64>,
        total_cycles: Option<u64>,
        duration_seconds: Option<f64>,
    ) -> Self {
        Self {
            client_address,
            client_port,
            start_time,
            end_time,
            total_messages,
            total_cycles,
            duration_seconds,
        }
    }

    pub fn client_address(&self) -> &str {
        &self.client_address
    }

    pub fn client_port(&self) -> u16 {
        self.client_port
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    pub fn total_messages(&self) -> Option<u64> {
        self.total_messages
    }

    pub fn total_cycles(&self) -> Option<u64> {
        self.total_cycles
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }
}

/// Summary plus every accepted envelope, in the order they were received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    summary: SessionSummary,
    messages: Vec<Envelope>,
}

impl Session {
    pub(crate) fn from_parts(summary: SessionSummary, messages: Vec<Envelope>) -> Self {
        Self { summary, messages }
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn messages(&self) -> &[Envelope] {
        &self.messages
    }

    /// Cycle count derived from the stored envelopes, independent of the summary.
    pub fn cycle_count(&self) -> u64 {
        self.messages
            .iter()
            .map(|envelope| envelope.cycle_count() as u64)
            .sum()
    }
}
