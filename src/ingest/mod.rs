//! Async ingestion: device frames over a channel into one session.

mod coordinator;
mod sink;

pub use coordinator::{
    ingest_channel, Clock, FrameOutcome, IngestCommand, IngestCoordinator, SystemClock,
};
pub use sink::{ArchiveSink, MemoryArchive, MemoryQueue, QueueSink};
