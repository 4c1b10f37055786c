//! Validation, canonical encoding and session aggregation for spike-detector
//! telemetry.
//!
//! Raw device records enter as `serde_json::Value`s and leave either as typed,
//! invariant-checked records or as a [`RejectionReason`] naming every failing
//! field. Accepted envelopes accumulate in a [`SessionHandle`] until the
//! session is closed and archived.

pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod record;
pub mod session;
pub mod telemetry;
pub mod validate;

pub use codec::{decode, decode_raw, encode, DecodeError, EncodeError};
pub use config::IngestConfig;
pub use error::{IngestError, PayloadError, SessionError, SinkError, TemporalOrderError};
pub use record::{Cycle, Envelope, Message, Session, SessionSummary, Timestamp};
pub use session::{MessageStats, SessionHandle, SessionStats};
pub use validate::{validate, validate_session, RejectionReason};
