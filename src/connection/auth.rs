//! Authentication submachine: react to one `R` Authentication message.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::opts::ConnectOptions;
use crate::protocol::backend::auth::AuthenticationMessage;
use crate::protocol::codec::write_frame;
use crate::protocol::frontend::{md5_password, write_password};

/// Outcome of dispatching one authentication challenge.
pub(crate) enum AuthStep {
    /// `AuthenticationOk` — advance the state machine past authentication.
    Done,
    /// A password response was written; keep reading for the next message.
    Continued,
}

/// Compute and send the password response for a cleartext or MD5 challenge,
/// or fail with `UnsupportedError`/`AuthenticationError` per §4.3.
pub(crate) async fn dispatch<T>(
    transport: &mut T,
    options: &ConnectOptions,
    message: AuthenticationMessage,
) -> Result<AuthStep>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match message {
        AuthenticationMessage::Ok => Ok(AuthStep::Done),
        AuthenticationMessage::CleartextPassword => {
            let password = options.password.as_deref().ok_or_else(|| {
                Error::AuthenticationError(
                    "server requested a cleartext password but none was configured".into(),
                )
            })?;
            let mut buf = Vec::new();
            write_password(&mut buf, password);
            write_frame(transport, &buf).await?;
            Ok(AuthStep::Continued)
        }
        AuthenticationMessage::Md5Password { salt } => {
            let password = options.password.as_deref().ok_or_else(|| {
                Error::AuthenticationError(
                    "server requested an MD5 password but none was configured".into(),
                )
            })?;
            let response = md5_password(&options.user, password, &salt);
            let mut buf = Vec::new();
            write_password(&mut buf, &response);
            write_frame(transport, &buf).await?;
            Ok(AuthStep::Continued)
        }
        AuthenticationMessage::Unsupported { auth_type } => Err(Error::UnsupportedError(format!(
            "authentication method {auth_type} is not supported"
        ))),
    }
}
