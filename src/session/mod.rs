//! Session aggregation: validated envelopes rolled into one archive unit.

mod aggregator;
mod stats;

pub use aggregator::{open, SessionHandle};
pub use stats::{MessageStats, SessionStats};
