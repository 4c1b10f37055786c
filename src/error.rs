use thiserror::Error;
use uuid::Uuid;

use crate::codec::{DecodeError, EncodeError};
use crate::record::Timestamp;
use crate::validate::RejectionReason;

/// Externally sourced text that could not be turned into a trusted record.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Rejected(#[from] RejectionReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalOrderError {
    #[error("end_time {end} is not after start_time {start}")]
    EndNotAfterStart { start: Timestamp, end: Timestamp },

    #[error("running {field} count {running} disagrees with {actual} stored")]
    TotalsMismatch {
        field: &'static str,
        running: u64,
        actual: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] RejectionReason),

    #[error("session {session_id} is closed")]
    SessionClosed { session_id: Uuid },

    #[error(transparent)]
    TemporalOrder(#[from] TemporalOrderError),
}

/// Failure reported by a queue or archive collaborator.
#[derive(Debug, Error)]
#[error("{sink} sink failed: {source}")]
pub struct SinkError {
    pub sink: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl SinkError {
    pub fn new(sink: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self {
            sink,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("aborting session after {count} rejected frames (limit {limit})")]
    TooManyRejections { count: u64, limit: u64 },
}
