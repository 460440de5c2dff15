//! The message shape that crosses from a `Handle` into the connection actor.

use tokio::sync::oneshot;

use crate::capability::{CopyConsumer, CopyProducer};
use crate::error::Result;
use crate::protocol::types::{FormatCode, Oid};
use crate::result::QueryResult;

/// Completion channel shared by every request whose result is a `QueryResult`.
pub(crate) type QueryCompletion = oneshot::Sender<Result<QueryResult>>;

/// Caller intent enqueued on the connection actor's channel.
///
/// The actor processes one variant at a time; the single-in-flight invariant
/// comes for free from the actor being a loop over one `mpsc` receiver rather
/// than from any locking.
pub(crate) enum Request {
    Query {
        sql: String,
        completion: QueryCompletion,
    },
    FunctionCall {
        function_oid: Oid,
        args: Vec<Option<Vec<u8>>>,
        format: FormatCode,
        completion: oneshot::Sender<Result<Option<Vec<u8>>>>,
    },
    CopyIn {
        sql: String,
        producer: Box<dyn CopyProducer + Send>,
        completion: QueryCompletion,
    },
    CopyOut {
        sql: String,
        consumer: Box<dyn CopyConsumer + Send>,
        completion: QueryCompletion,
    },
    Finish {
        completion: oneshot::Sender<Result<()>>,
    },
}
