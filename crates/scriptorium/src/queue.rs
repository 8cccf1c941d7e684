//! Generation requests and the queue collaborators that carry them.
//!
//! Enqueuing is fire-and-forget: a queue accepts a [`GenerationRequest`] and
//! returns immediately. Delivery guarantees, ordering and retries belong to
//! the transport behind the queue.
use crate::error::{Result, ScriptoriumError};
use crate::template::DestinationLocator;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

/// Message asking the recognition engine to generate a derivative.
///
/// Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub event: String,
    pub queue: String,
    /// Locator of the source artifact's content.
    pub source_uri: String,
    pub destination_uri: DestinationLocator,
    pub destination_term_uri: String,
    pub destination_artifact_type: String,
    /// When set, the engine result is written into this file field of the
    /// source artifact instead of a new artifact on the parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_field: Option<String>,
    pub mimetype: String,
    pub args: String,
}

/// Accepts generation requests for delivery.
pub trait DerivativeQueue: Send + Sync {
    fn enqueue(&self, request: GenerationRequest) -> Result<()>;
}

/// Queue that keeps every request in memory.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    sent: Mutex<Vec<GenerationRequest>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<GenerationRequest> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl DerivativeQueue for MemoryQueue {
    fn enqueue(&self, request: GenerationRequest) -> Result<()> {
        self.sent.lock().push(request);
        Ok(())
    }
}

/// Queue that writes each request as one JSON line.
pub struct JsonLinesQueue<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesQueue<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> DerivativeQueue for JsonLinesQueue<W> {
    fn enqueue(&self, request: GenerationRequest) -> Result<()> {
        let line = serde_json::to_string(&request)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| ScriptoriumError::queue(&request.queue, e.to_string()))
    }
}

/// Queue backed by a tokio unbounded channel.
///
/// `enqueue` never blocks; an async consumer drains the receiver.
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    sender: tokio::sync::mpsc::UnboundedSender<GenerationRequest>,
}

#[cfg(feature = "tokio-runtime")]
impl ChannelQueue {
    pub fn channel() -> (Self, tokio::sync::mpsc::UnboundedReceiver<GenerationRequest>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[cfg(feature = "tokio-runtime")]
impl DerivativeQueue for ChannelQueue {
    fn enqueue(&self, request: GenerationRequest) -> Result<()> {
        let queue = request.queue.clone();
        self.sender
            .send(request)
            .map_err(|_| ScriptoriumError::queue(queue, "receiver dropped"))
    }
}
