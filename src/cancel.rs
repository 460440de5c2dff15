//! Query cancellation on a parallel connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::error::{Error, Result};
use crate::protocol::codec::write_frame;
use crate::protocol::frontend::write_cancel_request;

/// Opaque bundle of the backend pid and secret key needed to cancel the
/// request currently in flight on the connection this was snapshotted from.
///
/// Address resolution is a caller concern (out of scope here): the caller
/// supplies a brand-new transport to the same backend when calling `cancel`.
#[derive(Debug, Clone, Copy)]
pub struct CancelHandle {
    pid: u32,
    secret: u32,
}

impl CancelHandle {
    pub(crate) fn new(pid: u32, secret: u32) -> Self {
        Self { pid, secret }
    }

    /// Send a `CancelRequest` over `transport` and wait for the backend to
    /// close it, up to `timeout`.
    ///
    /// The cancel protocol defines no response: a fresh connection carries
    /// one 16-byte message and the server simply drops it. This engine
    /// doesn't parse anything off `transport`, but it does wait for EOF so
    /// the caller has something to await other than "trust it worked".
    pub async fn cancel<T>(&self, mut transport: T, timeout: Duration) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        write_cancel_request(&mut buf, self.pid, self.secret);
        write_frame(&mut transport, &buf).await?;

        let mut scratch = [0u8; 1];
        match tokio::time::timeout(timeout, transport.read(&mut scratch)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(Error::TransportError(err)),
            Err(_) => Err(Error::TimeoutError),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn cancel_writes_the_expected_frame_and_observes_close() {
        let (mut server, client) = tokio::io::duplex(64);
        let handle = CancelHandle::new(42, 99);

        let cancel = tokio::spawn(async move { handle.cancel(client, Duration::from_secs(1)).await });

        let mut buf = [0u8; 16];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf[0..4], 16i32.to_be_bytes());
        assert_eq!(buf[4..8], 80877102i32.to_be_bytes());
        assert_eq!(buf[8..12], 42i32.to_be_bytes());
        assert_eq!(buf[12..16], 99i32.to_be_bytes());

        drop(server);
        cancel.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancel_times_out_if_the_server_never_closes() {
        let (server, client) = tokio::io::duplex(64);
        let handle = CancelHandle::new(1, 1);

        let result = handle.cancel(client, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::TimeoutError)));
        drop(server);
    }
}
