//! Copy-In and Copy-Out pull/push loops.
//!
//! Both loops run inline inside the request/response exchange that drives
//! them (see `connection::run_query`): a `CopyInResponse`/`CopyOutResponse`
//! is just another frame in that response stream, and these functions take
//! over reading/writing on the same transport for exactly the frames that
//! belong to the copy sub-protocol before handing control back.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::capability::{CopyConsumer, CopyProducer};
use crate::error::{Error, Result};
use crate::protocol::backend::{msg_type, CopyData, CopyDone};
use crate::protocol::codec::{write_frame, FrameReader};
use crate::protocol::frontend::{write_copy_data, write_copy_done, write_copy_fail};

/// Pull from `producer` and forward each chunk as a `CopyData` frame until it
/// signals end-of-stream (`CopyDone`) or fails (`CopyFail`).
///
/// Each iteration yields to the scheduler so a long producer can't starve the
/// rest of the actor's event loop.
pub(crate) async fn drive_copy_in<T>(transport: &mut FrameReader<T>, producer: &mut dyn CopyProducer) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match producer.read() {
            Ok(Some(chunk)) => {
                let mut buf = Vec::new();
                write_copy_data(&mut buf, &chunk);
                write_frame(transport.get_mut(), &buf).await?;
                tokio::task::yield_now().await;
            }
            Ok(None) => {
                let mut buf = Vec::new();
                write_copy_done(&mut buf);
                write_frame(transport.get_mut(), &buf).await?;
                return Ok(());
            }
            Err(err) => {
                let mut buf = Vec::new();
                write_copy_fail(&mut buf, &err.to_string());
                write_frame(transport.get_mut(), &buf).await?;
                return Err(err);
            }
        }
    }
}

/// Read `CopyData` frames and forward them to `consumer` until `CopyDone`.
///
/// A `write` failure is logged and swallowed: the server doesn't know the
/// consumer gave up, so the wire still needs draining up to `CopyDone`.
pub(crate) async fn drive_copy_out<T>(transport: &mut FrameReader<T>, consumer: &mut dyn CopyConsumer) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = transport.next_frame().await?;
        match frame.type_byte {
            msg_type::COPY_DATA => {
                let data = CopyData::parse(&frame.payload)?;
                if let Err(err) = consumer.write(data.data) {
                    tracing::warn!(error = %err, "copy-out consumer failed, continuing to drain");
                }
            }
            msg_type::COPY_DONE => {
                CopyDone::parse(&frame.payload)?;
                consumer.close();
                return Ok(());
            }
            other => {
                return Err(Error::Protocol(format!("unexpected message {other:#x} during copy-out")));
            }
        }
    }
}
