use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sink::{ArchiveSink, QueueSink};
use crate::codec;
use crate::config::IngestConfig;
use crate::error::{IngestError, SessionError};
use crate::record::{Envelope, Session, Timestamp};
use crate::session::{MessageStats, SessionHandle, SessionStats};
use crate::validate::RejectionReason;

/// Source of receipt and close times.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[derive(Debug)]
pub enum IngestCommand {
    /// One raw device frame, shaped like a message (`{"cycles": [...]}`).
    Frame {
        payload: Value,
        reply: Option<oneshot::Sender<FrameOutcome>>,
    },
    /// Finalize the session. `None` closes at the clock's current time.
    Close { end_time: Option<Timestamp> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Accepted(Envelope),
    Rejected(RejectionReason),
}

/// Bounded command channel sized from the config.
pub fn ingest_channel(
    config: &IngestConfig,
) -> (mpsc::Sender<IngestCommand>, mpsc::Receiver<IngestCommand>) {
    mpsc::channel(config.channel_capacity)
}

/// Drives one session: frames in, encoded envelopes to the queue, the
/// finalized session to the archive.
pub struct IngestCoordinator {
    config: IngestConfig,
    session: SessionHandle,
    queue: Arc<dyn QueueSink>,
    archive: Arc<dyn ArchiveSink>,
    clock: Arc<dyn Clock>,
    next_sequence_id: u64,
    rejections: u64,
}

impl IngestCoordinator {
    pub fn new(
        config: IngestConfig,
        session: SessionHandle,
        queue: Arc<dyn QueueSink>,
        archive: Arc<dyn ArchiveSink>,
    ) -> Self {
        Self {
            config,
            session,
            queue,
            archive,
            clock: Arc::new(SystemClock),
            next_sequence_id: 1,
            rejections: 0,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Processes commands in arrival order until a `Close` command, the
    /// channel closing, or cancellation, then closes and archives the session.
    ///
    /// Sink failures and exceeding `max_rejections` abort without closing.
    /// A failed close (end time not after the start) leaves the session open
    /// and is returned as [`IngestError::Session`]; callers that want to retry
    /// must keep a clone of the [`SessionHandle`] they passed to `new`, then
    /// close and archive through it.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<IngestCommand>,
        cancel: CancellationToken,
    ) -> Result<Session, IngestError> {
        info!(session_id = %self.session.id(), "Ingestion started");

        let end_time = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(session_id = %self.session.id(), "Cancelled, closing session");
                    break None;
                }
                command = rx.recv() => match command {
                    Some(IngestCommand::Frame { payload, reply }) => {
                        let outcome = self.handle_frame(payload).await?;
                        let rejected = matches!(outcome, FrameOutcome::Rejected(_));
                        if let Some(reply) = reply {
                            // caller may have stopped waiting
                            let _ = reply.send(outcome);
                        }
                        if rejected {
                            self.check_rejection_limit()?;
                        }
                    }
                    Some(IngestCommand::Close { end_time }) => break end_time,
                    None => {
                        debug!(session_id = %self.session.id(), "Frame channel closed");
                        break None;
                    }
                },
            }
        };

        self.finish(end_time).await
    }

    async fn handle_frame(&mut self, payload: Value) -> Result<FrameOutcome, IngestError> {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        let received_at = self.clock.now();

        let raw = json!({
            "sequence_id": sequence_id,
            "received_at": received_at.to_string(),
            "message": payload,
        });

        let envelope = match self.session.accept(&raw) {
            Ok(envelope) => envelope,
            Err(SessionError::Rejected(reason)) => {
                self.rejections += 1;
                warn!(
                    session_id = %self.session.id(),
                    sequence_id,
                    violations = reason.violations().len(),
                    reason = %reason,
                    "Frame rejected"
                );
                return Ok(FrameOutcome::Rejected(reason));
            }
            Err(e) => return Err(e.into()),
        };

        let encoded = codec::encode(&envelope)?;
        self.queue.push(encoded).await?;

        let stats = MessageStats::of(&envelope);
        info!(
            session_id = %self.session.id(),
            sequence_id = stats.sequence_id,
            cycles = stats.cycle_count,
            voltage_min = stats.voltage_min,
            voltage_max = stats.voltage_max,
            voltage_mean = stats.voltage_mean,
            time_min = stats.time_min,
            time_max = stats.time_max,
            spikes = stats.spike_count,
            "Envelope accepted"
        );

        Ok(FrameOutcome::Accepted(envelope))
    }

    fn check_rejection_limit(&self) -> Result<(), IngestError> {
        match self.config.max_rejections {
            Some(limit) if self.rejections > limit => Err(IngestError::TooManyRejections {
                count: self.rejections,
                limit,
            }),
            _ => Ok(()),
        }
    }

    async fn finish(self, end_time: Option<Timestamp>) -> Result<Session, IngestError> {
        let end_time = end_time.unwrap_or_else(|| self.clock.now());
        let session = self.session.close(end_time)?;
        self.archive.store(&session).await?;

        let stats = SessionStats::of(&session);
        info!(
            session_id = %self.session.id(),
            client = %stats.client_address,
            messages = stats.message_count,
            cycles = stats.cycle_count,
            rejected = self.rejections,
            duration_seconds = stats.duration_seconds.unwrap_or_default(),
            voltage_min = ?stats.voltage_min,
            voltage_max = ?stats.voltage_max,
            voltage_mean = ?stats.voltage_mean,
            spikes = stats.spike_count,
            "Session archived"
        );

        Ok(session)
    }
}
