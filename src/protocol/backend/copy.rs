//! COPY protocol backend messages.

use crate::error::Result;
use crate::protocol::codec::{read_u8, read_u16};
use crate::protocol::types::FormatCode;

fn parse_copy_response(payload: &[u8]) -> Result<(FormatCode, Vec<FormatCode>)> {
    let (format_byte, rest) = read_u8(payload)?;
    let format = FormatCode::from_u16(u16::from(format_byte));

    let (num_columns, mut rest) = read_u16(rest)?;
    let mut column_formats = Vec::with_capacity(num_columns as usize);
    for _ in 0..num_columns {
        let (fmt, remaining) = read_u16(rest)?;
        column_formats.push(FormatCode::from_u16(fmt));
        rest = remaining;
    }

    Ok((format, column_formats))
}

/// CopyInResponse - server is ready to receive COPY data from the client.
#[derive(Debug, Clone)]
pub struct CopyInResponse {
    pub format: FormatCode,
    pub column_formats: Vec<FormatCode>,
}

impl CopyInResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (format, column_formats) = parse_copy_response(payload)?;
        Ok(Self { format, column_formats })
    }
}

/// CopyOutResponse - server is about to stream COPY data to the client.
#[derive(Debug, Clone)]
pub struct CopyOutResponse {
    pub format: FormatCode,
    pub column_formats: Vec<FormatCode>,
}

impl CopyOutResponse {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (format, column_formats) = parse_copy_response(payload)?;
        Ok(Self { format, column_formats })
    }
}

/// CopyData - one chunk of COPY payload, in either direction.
#[derive(Debug, Clone, Copy)]
pub struct CopyData<'a> {
    pub data: &'a [u8],
}

impl<'a> CopyData<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        Ok(Self { data: payload })
    }
}

/// CopyDone - the server has finished sending COPY data (Copy-Out only).
#[derive(Debug, Clone, Copy)]
pub struct CopyDone;

impl CopyDone {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}
