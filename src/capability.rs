//! Capability traits injected into a connection: the small set of
//! collaborators the engine calls out to instead of making policy decisions
//! itself (notices, notifications, COPY data movement).
//!
//! Each concern gets its own small trait rather than one god-object, and
//! every trait has a default, log-and-discard implementation so a caller
//! that doesn't care about notices or doesn't use COPY never has to
//! implement one.

use crate::error::{ErrorDict, Result};
use crate::result::Notification;

/// Receives out-of-band server events: notices and LISTEN/NOTIFY deliveries.
///
/// The default implementation logs both at `tracing::debug!`/`tracing::info!`
/// and otherwise discards them.
pub trait EventHandler: Send + 'static {
    fn notice(&mut self, notice: ErrorDict) {
        tracing::debug!(message = notice.message(), severity = notice.severity(), "server notice");
    }

    fn notification(&mut self, notification: Notification) {
        tracing::info!(
            channel = notification.channel,
            pid = notification.pid,
            "notification received"
        );
    }
}

/// Default handler used when a caller doesn't need to observe notices or
/// notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingEventHandler;

impl EventHandler for DiscardingEventHandler {}

/// Supplies outbound data for a Copy-In (`COPY ... FROM STDIN`) request.
///
/// Called repeatedly until it returns `Ok(None)`, at which point `CopyDone`
/// is sent. Returning `Err` aborts the copy with `CopyFail`.
pub trait CopyProducer: Send {
    /// Called once with the server's `CopyInResponse` before the first `read`.
    fn describe(&mut self, column_count: u16, binary: bool) {
        let _ = (column_count, binary);
    }

    /// Return the next chunk to send, or `None` when input is exhausted.
    fn read(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Receives inbound data for a Copy-Out (`COPY ... TO STDOUT`) request.
///
/// A `write` error is swallowed: the copy keeps draining `CopyData` from the
/// server so the connection stays in sync with the wire, it just stops
/// forwarding bytes to this consumer.
pub trait CopyConsumer: Send {
    /// Called once with the server's `CopyOutResponse` before the first `write`.
    fn describe(&mut self, column_count: u16, binary: bool) {
        let _ = (column_count, binary);
    }

    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Called once after the final `CopyData`/`CopyDone`, success or not.
    fn close(&mut self) {}
}

/// A `CopyProducer` backed by an in-memory buffer, chunked at `chunk_size`.
pub struct BufferProducer {
    data: Vec<u8>,
    offset: usize,
    chunk_size: usize,
}

impl BufferProducer {
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self { data, offset: 0, chunk_size: chunk_size.max(1) }
    }
}

impl CopyProducer for BufferProducer {
    fn read(&mut self) -> Result<Option<Vec<u8>>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// A `CopyConsumer` that appends every chunk into an in-memory buffer.
#[derive(Debug, Default)]
pub struct BufferConsumer {
    pub data: Vec<u8>,
}

impl CopyConsumer for BufferConsumer {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }
}
