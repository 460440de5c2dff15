//! ErrorResponse and NoticeResponse backend messages.

use std::collections::HashMap;

use crate::error::{Error, ErrorDict, Result};
use crate::protocol::codec::read_cstr;

/// Parse the field-type-byte/cstring pairs shared by ErrorResponse and
/// NoticeResponse into an `ErrorDict`.
fn parse_fields(payload: &[u8]) -> Result<ErrorDict> {
    let mut fields = HashMap::new();
    let mut data = payload;

    while !data.is_empty() && data[0] != 0 {
        let field_type = data[0];
        data = &data[1..];

        let (value, rest) = read_cstr(data)?;
        data = rest;

        fields.insert(field_type, value.to_string());
    }

    Ok(ErrorDict::new(fields))
}

/// ErrorResponse - a failed command, or a fatal error during startup.
#[derive(Debug, Clone)]
pub struct ErrorResponse(pub ErrorDict);

impl ErrorResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self(parse_fields(payload)?))
    }

    pub fn into_error(self) -> Error {
        Error::PgError(self.0)
    }
}

/// NoticeResponse - a non-fatal warning or informational message.
#[derive(Debug, Clone)]
pub struct NoticeResponse(pub ErrorDict);

impl NoticeResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(Self(parse_fields(payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_syntax_error_fields() {
        let mut payload = Vec::new();
        payload.push(b'S');
        payload.extend_from_slice(b"ERROR\0");
        payload.push(b'C');
        payload.extend_from_slice(b"42703\0");
        payload.push(b'M');
        payload.extend_from_slice(b"column \"x\" does not exist\0");
        payload.push(0);

        let err = ErrorResponse::parse(&payload).unwrap().0;
        assert_eq!(err.code(), "42703");
        assert_eq!(err.severity(), "ERROR");
        assert_eq!(err.message(), "column \"x\" does not exist");
    }
}
