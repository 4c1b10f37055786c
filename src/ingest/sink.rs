use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::codec;
use crate::error::SinkError;
use crate::record::Session;

/// Downstream transport for accepted envelopes, already canonically encoded.
#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn push(&self, payload: String) -> Result<(), SinkError>;
}

/// Durable store for finalized sessions. Called once per session, at close.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    async fn store(&self, session: &Session) -> Result<(), SinkError>;
}

/// In-process FIFO queue: push at the tail, pop from the head.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<String> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Removes and returns everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.items.lock().drain(..).collect()
    }
}

#[async_trait]
impl QueueSink for MemoryQueue {
    async fn push(&self, payload: String) -> Result<(), SinkError> {
        self.items.lock().push_back(payload);
        Ok(())
    }
}

/// Keeps archived sessions as canonical text, the way a file archive would.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    sessions: Mutex<Vec<String>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl ArchiveSink for MemoryArchive {
    async fn store(&self, session: &Session) -> Result<(), SinkError> {
        let text = codec::encode(session).map_err(|e| SinkError::new("archive", e))?;
        self.sessions.lock().push(text);
        Ok(())
    }
}
