use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SessionError, TemporalOrderError};
use crate::record::{Envelope, Session, SessionSummary, Timestamp};
use crate::validate;

#[derive(Debug)]
struct SessionState {
    summary: SessionSummary,
    messages: Vec<Envelope>,
    message_count: u64,
    cycle_count: u64,
    last_sequence_id: Option<u64>,
    closed: bool,
}

/// Handle to one open recording session.
///
/// Clones share the same session. `accept` and `close` on a handle are
/// serialized by a per-session mutex, so the running counts always equal the
/// stored envelopes. Separate handles share nothing.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    state: Arc<Mutex<SessionState>>,
}

/// Begins a new session with an empty message list.
pub fn open(
    client_address: impl Into<String>,
    client_port: u16,
    start_time: Timestamp,
) -> SessionHandle {
    SessionHandle::open(client_address, client_port, start_time)
}

impl SessionHandle {
    pub fn open(
        client_address: impl Into<String>,
        client_port: u16,
        start_time: Timestamp,
    ) -> Self {
        let summary = SessionSummary::opened(client_address.into(), client_port, start_time);
        let id = Uuid::new_v4();
        debug!(
            session_id = %id,
            client = %summary.client_address(),
            port = summary.client_port(),
            start_time = %start_time,
            "Session opened"
        );

        Self {
            id,
            state: Arc::new(Mutex::new(SessionState {
                summary,
                messages: Vec::new(),
                message_count: 0,
                cycle_count: 0,
                last_sequence_id: None,
                closed: false,
            })),
        }
    }

    /// Process-local identifier used in logs. Not part of the archive.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Validates `raw` and appends it in received order.
    ///
    /// On rejection the session is left exactly as it was. Once the session
    /// is closed every call fails with [`SessionError::SessionClosed`],
    /// whatever `raw` contains.
    pub fn accept(&self, raw: &Value) -> Result<Envelope, SessionError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let envelope = validate::validate(raw).map_err(|reason| {
            debug!(
                session_id = %self.id,
                violations = reason.violations().len(),
                "Envelope rejected"
            );
            SessionError::Rejected(reason)
        })?;

        let mut state = self.state.lock();
        // close may have won the race while we were validating
        if state.closed {
            return Err(self.closed_error());
        }

        let sequence_id = envelope.sequence_id();
        if let Some(last) = state.last_sequence_id {
            if sequence_id <= last {
                warn!(
                    session_id = %self.id,
                    sequence_id,
                    last_sequence_id = last,
                    "Envelope sequence id is not increasing"
                );
            }
        }

        state.messages.push(envelope.clone());
        state.message_count += 1;
        state.cycle_count += envelope.cycle_count() as u64;
        state.last_sequence_id = Some(sequence_id);

        Ok(envelope)
    }

    /// Finalizes the session.
    ///
    /// Fails without closing when `end_time` is not after the start time, or
    /// when the running counts disagree with the stored envelopes.
    pub fn close(&self, end_time: Timestamp) -> Result<Session, SessionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(self.closed_error());
        }

        let start_time = state.summary.start_time();
        if end_time <= start_time {
            return Err(TemporalOrderError::EndNotAfterStart {
                start: start_time,
                end: end_time,
            }
            .into());
        }

        let stored_messages = state.messages.len() as u64;
        if stored_messages != state.message_count {
            return Err(TemporalOrderError::TotalsMismatch {
                field: "total_messages",
                running: state.message_count,
                actual: stored_messages,
            }
            .into());
        }
        let stored_cycles: u64 = state
            .messages
            .iter()
            .map(|envelope| envelope.cycle_count() as u64)
            .sum();
        if stored_cycles != state.cycle_count {
            return Err(TemporalOrderError::TotalsMismatch {
                field: "total_cycles",
                running: state.cycle_count,
                actual: stored_cycles,
            }
            .into());
        }

        let summary = state
            .summary
            .finalized(end_time, state.message_count, state.cycle_count);
        state.summary = summary.clone();
        state.closed = true;
        let messages = std::mem::take(&mut state.messages);

        debug!(
            session_id = %self.id,
            messages = state.message_count,
            cycles = state.cycle_count,
            "Session closed"
        );

        Ok(Session::from_parts(summary, messages))
    }

    pub fn message_count(&self) -> u64 {
        self.state.lock().message_count
    }

    pub fn cycle_count(&self) -> u64 {
        self.state.lock().cycle_count
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current summary; totals and end time are populated only after close.
    pub fn summary(&self) -> SessionSummary {
        self.state.lock().summary.clone()
    }

    fn closed_error(&self) -> SessionError {
        SessionError::SessionClosed {
            session_id: self.id,
        }
    }
}
