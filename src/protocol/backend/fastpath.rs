//! Fast-path function call response.

use crate::error::Result;
use crate::protocol::codec::{read_bytes, read_i32};

/// FunctionCallResponse - the result of a fast-path function call: a single
/// big-endian length-prefixed value, `-1` meaning SQL NULL.
#[derive(Debug, Clone, Copy)]
pub struct FunctionCallResponse<'a> {
    pub value: Option<&'a [u8]>,
}

impl<'a> FunctionCallResponse<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (len, rest) = read_i32(payload)?;
        if len == -1 {
            return Ok(Self { value: None });
        }
        let (bytes, _) = read_bytes(rest, len as usize)?;
        Ok(Self { value: Some(bytes) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_null_result() {
        let payload = (-1i32).to_be_bytes();
        assert!(FunctionCallResponse::parse(&payload).unwrap().value.is_none());
    }

    #[test]
    fn parses_value_result() {
        let mut payload = 3i32.to_be_bytes().to_vec();
        payload.extend_from_slice(b"abc");
        let resp = FunctionCallResponse::parse(&payload).unwrap();
        assert_eq!(resp.value, Some(b"abc".as_slice()));
    }
}
