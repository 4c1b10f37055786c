//! Record schema: cycles, messages, envelopes and sessions.
//!
//! Values of these types are immutable once built. They are produced by the
//! validator, by the typed constructors (which apply the same bounds), or by
//! decoding trusted canonical text.

pub mod schema;
pub mod timestamp;
mod types;

pub use schema::{Bound, Entity, FieldSpec, FieldType, Presence};
pub use timestamp::{Timestamp, TimestampParseError};
pub use types::{Cycle, Envelope, Message, Session, SessionSummary};
