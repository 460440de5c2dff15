//! Connection start-up: encryption negotiation, StartupMessage, the
//! authentication exchange, and parameter/key intake up to the first
//! `ReadyForQuery`.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite};

use super::auth::{self, AuthStep};
use crate::error::{Error, Result};
use crate::opts::{ConnectOptions, EncryptionMode};
use crate::protocol::backend::auth::AuthenticationMessage;
use crate::protocol::backend::{msg_type, BackendKeyData, ErrorResponse, ParameterStatus, ReadyForQuery};
use crate::protocol::codec::{read_message, read_ssl_reply, write_frame};
use crate::protocol::frontend::{write_ssl_request, write_startup};
use crate::protocol::types::TransactionStatus;

/// Backend parameter name → latest value, as accumulated during start-up
/// (`server_version`, `client_encoding`, `DateStyle`, ...).
pub type ParameterMap = HashMap<String, String>;

/// Parse a `server_version` value (`"16.1"`, `"9.6.3"`, ...) into the numeric
/// form `major*10000 + minor*100 + patch`, e.g. `"16.1"` -> `160100`.
pub fn server_version_num(raw: &str) -> Option<u32> {
    let mut parts = raw.split(|c: char| !c.is_ascii_digit()).filter(|s| !s.is_empty());
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    Some(major * 10000 + minor * 100 + patch)
}

/// Everything collected while driving the connection from `Started` to `Ready`.
pub(crate) struct StartupOutcome {
    pub params: ParameterMap,
    pub backend_pid: u32,
    pub backend_secret: u32,
    pub transaction_status: TransactionStatus,
}

/// Send `SSLRequest` and interpret the server's single-byte reply.
///
/// This engine drives the negotiation bytes (send the request, read `S`/`N`)
/// but never performs the TLS handshake itself — encryption is the byte
/// transport's concern. `Prefer`/`Require` are only meaningful when `T` is a
/// transport that already knows how to continue the same byte stream under
/// TLS once negotiation selects it; a plain `TcpStream` will simply keep
/// speaking plaintext after an `S` reply, which is a caller configuration
/// error rather than something this function can detect.
async fn negotiate_encryption<T>(transport: &mut T, mode: EncryptionMode) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match mode {
        EncryptionMode::Disable | EncryptionMode::Allow => Ok(()),
        EncryptionMode::Prefer | EncryptionMode::Require => {
            let mut buf = Vec::new();
            write_ssl_request(&mut buf);
            write_frame(transport, &buf).await?;

            match read_ssl_reply(transport).await? {
                b'S' => Ok(()),
                b'N' if mode == EncryptionMode::Prefer => Ok(()),
                b'N' => Err(Error::UnsupportedError(
                    "server declined encryption and the connection requires it".into(),
                )),
                other => Err(Error::Protocol(format!(
                    "unexpected SSL negotiation reply byte {other:#x}"
                ))),
            }
        }
    }
}

/// Drive start-up to completion: encryption negotiation, `StartupMessage`,
/// the authentication exchange, and ParameterStatus/BackendKeyData intake up
/// to the first `ReadyForQuery`.
pub(crate) async fn perform_startup<T>(transport: &mut T, options: &ConnectOptions) -> Result<StartupOutcome>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    negotiate_encryption(transport, options.encryption).await?;

    let mut buf = Vec::new();
    write_startup(&mut buf, &options.startup_params());
    write_frame(transport, &buf).await?;

    let mut params = ParameterMap::new();
    let mut backend_pid = 0u32;
    let mut backend_secret = 0u32;

    loop {
        let frame = read_message(transport).await?;
        match frame.type_byte {
            msg_type::AUTHENTICATION => {
                let message = AuthenticationMessage::parse(&frame.payload)?;
                match auth::dispatch(transport, options, message).await? {
                    AuthStep::Done => {}
                    AuthStep::Continued => {}
                }
            }
            msg_type::BACKEND_KEY_DATA => {
                let data = BackendKeyData::parse(&frame.payload)?;
                backend_pid = data.process_id();
                backend_secret = data.secret();
            }
            msg_type::PARAMETER_STATUS => {
                let ps = ParameterStatus::parse(&frame.payload)?;
                params.insert(ps.name.to_string(), ps.value.to_string());
            }
            msg_type::NOTICE_RESPONSE => {
                tracing::debug!("notice received during start-up");
            }
            msg_type::ERROR_RESPONSE => {
                let err = ErrorResponse::parse(&frame.payload)?;
                return Err(err.into_error());
            }
            msg_type::READY_FOR_QUERY => {
                let rfq = ReadyForQuery::parse(&frame.payload)?;
                let transaction_status = rfq
                    .transaction_status()
                    .ok_or_else(|| Error::Protocol("ReadyForQuery: unrecognized transaction status byte".into()))?;
                return Ok(StartupOutcome { params, backend_pid, backend_secret, transaction_status });
            }
            other => {
                return Err(Error::Protocol(format!("unexpected message {other:#x} during start-up")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_part_version() {
        assert_eq!(server_version_num("16.1"), Some(160100));
    }

    #[test]
    fn parses_three_part_version() {
        assert_eq!(server_version_num("9.6.3"), Some(90603));
    }

    #[test]
    fn rejects_non_numeric_version() {
        assert_eq!(server_version_num("devel"), None);
    }
}
