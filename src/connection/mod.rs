//! The connection actor: a background task that owns the transport and
//! drives exactly one request at a time, paired with the cheap, cloneable
//! `Handle` callers use to enqueue work.

mod auth;
mod startup;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

pub use startup::{server_version_num, ParameterMap};

use crate::cancel::CancelHandle;
use crate::capability::{CopyConsumer, CopyProducer, DiscardingEventHandler, EventHandler};
use crate::copy::{drive_copy_in, drive_copy_out};
use crate::error::{Error, Result};
use crate::opts::ConnectOptions;
use crate::protocol::backend::{
    msg_type, CommandComplete, CopyInResponse, CopyOutResponse, DataRow, EmptyQueryResponse, ErrorResponse,
    FunctionCallResponse, NoticeResponse, NotificationResponse, ParameterStatus, ReadyForQuery, RowDescription,
};
use crate::protocol::codec::{write_frame, FrameReader};
use crate::protocol::frontend::{write_function_call, write_query, write_terminate};
use crate::protocol::types::{FormatCode, Oid, TransactionStatus};
use crate::request::Request;
use crate::result::{Notification, QueryResult, Row, Status};

/// A live connection to a PostgreSQL backend, speaking the simple query
/// protocol plus its ancillary flows.
///
/// There is no public value of this type: `connect` hands back a `Handle`
/// and spawns the connection as a background task. The struct exists only
/// as a namespace for the constructors.
pub struct Connection;

impl Connection {
    /// Perform start-up and spawn the connection actor, discarding notices
    /// and notifications.
    pub async fn connect<T>(transport: T, options: &ConnectOptions) -> Result<(Handle, ParameterMap)>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::connect_with_handler(transport, options, DiscardingEventHandler).await
    }

    /// Like [`connect`](Self::connect), delivering notices and notifications
    /// to `event_handler` for the lifetime of the connection.
    pub async fn connect_with_handler<T, H>(
        mut transport: T,
        options: &ConnectOptions,
        event_handler: H,
    ) -> Result<(Handle, ParameterMap)>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        H: EventHandler,
    {
        let outcome = startup::perform_startup(&mut transport, options).await?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancelHandle::new(outcome.backend_pid, outcome.backend_secret);
        let transaction_status = Arc::new(AtomicU8::new(outcome.transaction_status as u8));

        let reader = FrameReader::new(transport);
        tokio::spawn(run(reader, receiver, Box::new(event_handler), Arc::clone(&transaction_status)));

        Ok((Handle { sender, cancel, transaction_status }, outcome.params))
    }
}

/// A cheap, cloneable reference to a running connection actor.
#[derive(Clone)]
pub struct Handle {
    sender: mpsc::UnboundedSender<Request>,
    cancel: CancelHandle,
    transaction_status: Arc<AtomicU8>,
}

impl Handle {
    /// Run a simple-query request. The query text may hold several
    /// semicolon-separated statements; only the last result is surfaced.
    pub async fn execute(&self, sql: impl Into<String>) -> Result<QueryResult> {
        let (completion, rx) = oneshot::channel();
        self.send(Request::Query { sql: sql.into(), completion })?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Issue a fast-path function call. All arguments and the result share
    /// `format`.
    pub async fn call_function(
        &self,
        function_oid: Oid,
        format: FormatCode,
        args: &[Option<&[u8]>],
    ) -> Result<Option<Vec<u8>>> {
        let (completion, rx) = oneshot::channel();
        let args = args.iter().map(|a| a.map(<[u8]>::to_vec)).collect();
        self.send(Request::FunctionCall { function_oid, args, format, completion })?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Run a `COPY ... FROM STDIN` statement, pulling outbound chunks from `producer`.
    pub async fn copy_in(&self, sql: impl Into<String>, producer: Box<dyn CopyProducer + Send>) -> Result<QueryResult> {
        let (completion, rx) = oneshot::channel();
        self.send(Request::CopyIn { sql: sql.into(), producer, completion })?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Run a `COPY ... TO STDOUT` statement, pushing inbound chunks to `consumer`.
    pub async fn copy_out(
        &self,
        sql: impl Into<String>,
        consumer: Box<dyn CopyConsumer + Send>,
    ) -> Result<QueryResult> {
        let (completion, rx) = oneshot::channel();
        self.send(Request::CopyOut { sql: sql.into(), consumer, completion })?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Snapshot the backend pid and secret key needed to cancel the request
    /// currently running on this connection.
    pub fn get_cancel(&self) -> CancelHandle {
        self.cancel
    }

    /// The connection's transaction status as of its last `ReadyForQuery`.
    pub fn transaction_status(&self) -> TransactionStatus {
        TransactionStatus::from_byte(self.transaction_status.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Enqueue `Terminate` and let the actor close the transport.
    pub async fn finish(&self) -> Result<()> {
        let (completion, rx) = oneshot::channel();
        self.send(Request::Finish { completion })?;
        rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    fn send(&self, request: Request) -> Result<()> {
        self.sender.send(request).map_err(|_| Error::ConnectionClosed)
    }
}

/// What, if anything, is driving the copy sub-protocol for the in-flight request.
enum CopySlot {
    None,
    In(Box<dyn CopyProducer + Send>),
    Out(Box<dyn CopyConsumer + Send>),
}

/// The actor loop: dequeue one request, drive it to completion, repeat.
///
/// While idle between requests, notices, notifications, and parameter
/// changes can still arrive unsolicited — `select!` races the next request
/// against the next frame so they reach `event_handler` without waiting for
/// the caller to issue another request first. `FrameReader::next_frame` is
/// cancel-safe, so losing the race to an incoming request never drops bytes
/// already buffered from a partial read.
///
/// A transport-breaking error ends the loop; the receiver is dropped, so
/// every subsequent `Handle` send fails and the caller observes
/// `ConnectionClosed`, matching the "reject further enqueues" requirement.
async fn run<T>(
    mut transport: FrameReader<T>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    mut event_handler: Box<dyn EventHandler>,
    shared_status: Arc<AtomicU8>,
) where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut transaction_status = TransactionStatus::from_byte(shared_status.load(Ordering::Relaxed)).unwrap_or_default();
    tracing::trace!(status = ?transaction_status, "connection ready");

    loop {
        let request = tokio::select! {
            biased;
            request = requests.recv() => match request {
                Some(request) => request,
                None => return,
            },
            frame = transport.next_frame() => {
                match frame.and_then(|frame| dispatch_idle_frame(frame, event_handler.as_mut())) {
                    Ok(()) => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "connection closed while idle");
                        return;
                    }
                }
            }
        };

        match request {
            Request::Finish { completion } => {
                let mut buf = Vec::new();
                write_terminate(&mut buf);
                let result = write_frame(transport.get_mut(), &buf).await;
                let _ = completion.send(result);
                return;
            }
            Request::Query { sql, completion } => {
                let (result, status) = run_query(&mut transport, &sql, CopySlot::None, event_handler.as_mut()).await;
                transaction_status = status;
                shared_status.store(transaction_status as u8, Ordering::Relaxed);
                tracing::trace!(status = ?transaction_status, "ready for query");
                let broken = result.as_ref().err().is_some_and(Error::is_connection_broken);
                let _ = completion.send(result);
                if broken {
                    return;
                }
            }
            Request::CopyIn { sql, producer, completion } => {
                let (result, status) =
                    run_query(&mut transport, &sql, CopySlot::In(producer), event_handler.as_mut()).await;
                transaction_status = status;
                shared_status.store(transaction_status as u8, Ordering::Relaxed);
                tracing::trace!(status = ?transaction_status, "ready for query");
                let broken = result.as_ref().err().is_some_and(Error::is_connection_broken);
                let _ = completion.send(result);
                if broken {
                    return;
                }
            }
            Request::CopyOut { sql, consumer, completion } => {
                let (result, status) =
                    run_query(&mut transport, &sql, CopySlot::Out(consumer), event_handler.as_mut()).await;
                transaction_status = status;
                shared_status.store(transaction_status as u8, Ordering::Relaxed);
                tracing::trace!(status = ?transaction_status, "ready for query");
                let broken = result.as_ref().err().is_some_and(Error::is_connection_broken);
                let _ = completion.send(result);
                if broken {
                    return;
                }
            }
            Request::FunctionCall { function_oid, args, format, completion } => {
                let (result, status) =
                    run_function_call(&mut transport, function_oid, &args, format, event_handler.as_mut()).await;
                transaction_status = status;
                shared_status.store(transaction_status as u8, Ordering::Relaxed);
                tracing::trace!(status = ?transaction_status, "ready for query");
                let broken = result.as_ref().err().is_some_and(Error::is_connection_broken);
                let _ = completion.send(result);
                if broken {
                    return;
                }
            }
        }
    }
}

/// Handle one message that arrived with no request in flight: a notice, a
/// notification, or a parameter change. Anything else is a protocol error —
/// the backend has nothing else to say unsolicited.
fn dispatch_idle_frame(frame: crate::protocol::codec::Frame, event_handler: &mut dyn EventHandler) -> Result<()> {
    if !msg_type::is_async_type(frame.type_byte) {
        return Err(Error::Protocol(format!("unexpected message {:#x} while idle", frame.type_byte)));
    }

    match frame.type_byte {
        msg_type::NOTICE_RESPONSE => {
            let notice = NoticeResponse::parse(&frame.payload)?;
            event_handler.notice(notice.0);
            Ok(())
        }
        msg_type::NOTIFICATION_RESPONSE => {
            let n = NotificationResponse::parse(&frame.payload)?;
            event_handler.notification(Notification {
                pid: n.pid,
                channel: n.channel.to_string(),
                payload: n.payload.to_string(),
            });
            Ok(())
        }
        msg_type::PARAMETER_STATUS => {
            ParameterStatus::parse(&frame.payload)?;
            Ok(())
        }
        _ => unreachable!("guarded by is_async_type above"),
    }
}

/// Send one `Query` message and accumulate its response stream into a
/// `QueryResult`, returning the connection's transaction status as of the
/// terminating `ReadyForQuery`.
async fn run_query<T>(
    transport: &mut FrameReader<T>,
    sql: &str,
    mut copy: CopySlot,
    event_handler: &mut dyn EventHandler,
) -> (Result<QueryResult>, TransactionStatus)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut status = TransactionStatus::Idle;

    let mut buf = Vec::new();
    write_query(&mut buf, sql);
    if let Err(err) = write_frame(transport.get_mut(), &buf).await {
        return (Err(err), status);
    }

    let mut result = QueryResult::new();
    let mut pending_error: Option<Error> = None;

    loop {
        let frame = match transport.next_frame().await {
            Ok(frame) => frame,
            Err(err) => return (Err(err), status),
        };

        match frame.type_byte {
            msg_type::ROW_DESCRIPTION => match RowDescription::parse(&frame.payload) {
                Ok(desc) => result.set_row_description(&desc),
                Err(err) => return (Err(err), status),
            },
            msg_type::DATA_ROW => match DataRow::parse(&frame.payload) {
                Ok(row) => {
                    let columns: Row = row.iter().map(|col| col.map(<[u8]>::to_vec)).collect();
                    result.push_row(columns);
                }
                Err(err) => return (Err(err), status),
            },
            msg_type::COMMAND_COMPLETE => match CommandComplete::parse(&frame.payload) {
                Ok(cc) => result.apply_command_complete(&cc),
                Err(err) => return (Err(err), status),
            },
            msg_type::EMPTY_QUERY_RESPONSE => match EmptyQueryResponse::parse(&frame.payload) {
                Ok(_) => result.set_empty_query(),
                Err(err) => return (Err(err), status),
            },
            msg_type::ERROR_RESPONSE => match ErrorResponse::parse(&frame.payload) {
                Ok(err) => pending_error = Some(err.into_error()),
                Err(err) => return (Err(err), status),
            },
            msg_type::NOTICE_RESPONSE => match NoticeResponse::parse(&frame.payload) {
                Ok(notice) => event_handler.notice(notice.0),
                Err(err) => return (Err(err), status),
            },
            msg_type::NOTIFICATION_RESPONSE => match NotificationResponse::parse(&frame.payload) {
                Ok(n) => event_handler.notification(Notification {
                    pid: n.pid,
                    channel: n.channel.to_string(),
                    payload: n.payload.to_string(),
                }),
                Err(err) => return (Err(err), status),
            },
            msg_type::PARAMETER_STATUS => {
                if let Err(err) = ParameterStatus::parse(&frame.payload) {
                    return (Err(err), status);
                }
            }
            msg_type::COPY_IN_RESPONSE => {
                let resp = match CopyInResponse::parse(&frame.payload) {
                    Ok(resp) => resp,
                    Err(err) => return (Err(err), status),
                };
                result.status = Status::CopyIn;
                if let CopySlot::In(ref mut producer) = copy {
                    producer.describe(resp.column_formats.len() as u16, matches!(resp.format, FormatCode::Binary));
                    if let Err(err) = drive_copy_in(transport, producer.as_mut()).await {
                        pending_error.get_or_insert(err);
                    }
                }
            }
            msg_type::COPY_OUT_RESPONSE => {
                let resp = match CopyOutResponse::parse(&frame.payload) {
                    Ok(resp) => resp,
                    Err(err) => return (Err(err), status),
                };
                result.status = Status::CopyOut;
                if let CopySlot::Out(ref mut consumer) = copy {
                    consumer.describe(resp.column_formats.len() as u16, matches!(resp.format, FormatCode::Binary));
                    if let Err(err) = drive_copy_out(transport, consumer.as_mut()).await {
                        return (Err(err), status);
                    }
                }
            }
            msg_type::READY_FOR_QUERY => {
                match ReadyForQuery::parse(&frame.payload) {
                    Ok(rfq) => {
                        if let Some(s) = rfq.transaction_status() {
                            status = s;
                        }
                    }
                    Err(err) => return (Err(err), status),
                }
                break;
            }
            other => {
                return (
                    Err(Error::Protocol(format!("unexpected message {other:#x} during query execution"))),
                    status,
                );
            }
        }
    }

    if let Some(err) = pending_error {
        (Err(err), status)
    } else {
        (Ok(result), status)
    }
}

/// Send an `F` FunctionCall message and read its `V` FunctionCallResponse.
async fn run_function_call<T>(
    transport: &mut FrameReader<T>,
    function_oid: Oid,
    args: &[Option<Vec<u8>>],
    format: FormatCode,
    event_handler: &mut dyn EventHandler,
) -> (Result<Option<Vec<u8>>>, TransactionStatus)
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut status = TransactionStatus::Idle;

    let arg_refs: Vec<Option<&[u8]>> = args.iter().map(|value| value.as_deref()).collect();
    let mut buf = Vec::new();
    write_function_call(&mut buf, function_oid, &arg_refs, format);
    if let Err(err) = write_frame(transport.get_mut(), &buf).await {
        return (Err(err), status);
    }

    let mut value: Option<Option<Vec<u8>>> = None;
    let mut pending_error: Option<Error> = None;

    loop {
        let frame = match transport.next_frame().await {
            Ok(frame) => frame,
            Err(err) => return (Err(err), status),
        };

        match frame.type_byte {
            msg_type::FUNCTION_CALL_RESPONSE => match FunctionCallResponse::parse(&frame.payload) {
                Ok(resp) => value = Some(resp.value.map(<[u8]>::to_vec)),
                Err(err) => return (Err(err), status),
            },
            msg_type::ERROR_RESPONSE => match ErrorResponse::parse(&frame.payload) {
                Ok(err) => pending_error = Some(err.into_error()),
                Err(err) => return (Err(err), status),
            },
            msg_type::NOTICE_RESPONSE => match NoticeResponse::parse(&frame.payload) {
                Ok(notice) => event_handler.notice(notice.0),
                Err(err) => return (Err(err), status),
            },
            msg_type::NOTIFICATION_RESPONSE => match NotificationResponse::parse(&frame.payload) {
                Ok(n) => event_handler.notification(Notification {
                    pid: n.pid,
                    channel: n.channel.to_string(),
                    payload: n.payload.to_string(),
                }),
                Err(err) => return (Err(err), status),
            },
            msg_type::PARAMETER_STATUS => {
                if let Err(err) = ParameterStatus::parse(&frame.payload) {
                    return (Err(err), status);
                }
            }
            msg_type::READY_FOR_QUERY => {
                match ReadyForQuery::parse(&frame.payload) {
                    Ok(rfq) => {
                        if let Some(s) = rfq.transaction_status() {
                            status = s;
                        }
                    }
                    Err(err) => return (Err(err), status),
                }
                break;
            }
            other => {
                return (
                    Err(Error::Protocol(format!("unexpected message {other:#x} during function call"))),
                    status,
                );
            }
        }
    }

    if let Some(err) = pending_error {
        (Err(err), status)
    } else {
        (Ok(value.flatten()), status)
    }
}
