//! PostgreSQL frontend (client → server) messages.

pub mod auth;
pub mod copy;
pub mod fastpath;
pub mod simple;
pub mod startup;

pub use auth::{md5_password, write_password};
pub use copy::{write_copy_data, write_copy_done, write_copy_fail};
pub use fastpath::write_function_call;
pub use simple::write_query;
pub use startup::{write_cancel_request, write_ssl_request, write_startup, write_terminate};

/// Frontend message type bytes.
pub mod msg_type {
    /// Password/auth response
    pub const PASSWORD: u8 = b'p';
    /// Query (simple query protocol)
    pub const QUERY: u8 = b'Q';
    /// Function call (fast-path protocol)
    pub const FUNCTION_CALL: u8 = b'F';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// CopyFail
    pub const COPY_FAIL: u8 = b'f';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}
