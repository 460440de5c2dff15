//! Simple-query response backend messages.

use std::mem::size_of;

use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::{Error, Result};
use crate::protocol::codec::read_cstr;
use crate::protocol::types::{FormatCode, Oid};

/// RowDescription message header: field count.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct RowDescriptionHead {
    pub num_fields: U16BE,
}

/// The 18-byte fixed tail that follows a field's name in RowDescription.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct FieldDescriptionTail {
    pub table_oid: I32BE,
    pub column_id: I16BE,
    pub type_oid: I32BE,
    pub type_size: I16BE,
    pub type_modifier: I32BE,
    pub format: I16BE,
}

/// One column's metadata within a RowDescription — the wire source of a
/// `RowFieldDescription`.
#[derive(Debug, Clone)]
pub struct FieldDescription {
    pub name: String,
    pub table_oid: Oid,
    pub column_id: i16,
    pub type_oid: Oid,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: FormatCode,
}

/// RowDescription message - describes the columns of the rows that follow.
#[derive(Debug, Clone)]
pub struct RowDescription {
    pub fields: Vec<FieldDescription>,
}

impl RowDescription {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let head = RowDescriptionHead::ref_from_bytes(payload.get(..2).ok_or_else(|| {
            Error::Protocol("RowDescription: payload shorter than header".into())
        })?)
        .map_err(|e| Error::Protocol(format!("RowDescription header: {e:?}")))?;

        let num_fields = head.num_fields.get() as usize;
        let mut fields = Vec::with_capacity(num_fields);
        let mut data = &payload[2..];

        const TAIL_SIZE: usize = size_of::<FieldDescriptionTail>();

        for _ in 0..num_fields {
            let (name, rest) = read_cstr(data)?;
            let tail_bytes = rest
                .get(..TAIL_SIZE)
                .ok_or_else(|| Error::Protocol("FieldDescription: truncated tail".into()))?;
            let tail = FieldDescriptionTail::ref_from_bytes(tail_bytes)
                .map_err(|e| Error::Protocol(format!("FieldDescription tail: {e:?}")))?;

            fields.push(FieldDescription {
                name: name.to_string(),
                table_oid: tail.table_oid.get() as Oid,
                column_id: tail.column_id.get(),
                type_oid: tail.type_oid.get() as Oid,
                type_size: tail.type_size.get(),
                type_modifier: tail.type_modifier.get(),
                format: FormatCode::from_u16(tail.format.get() as u16),
            });

            data = &rest[TAIL_SIZE..];
        }

        Ok(Self { fields })
    }
}

/// DataRow message header: column count.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct DataRowHead {
    pub num_columns: U16BE,
}

/// DataRow message - one row of raw, type-agnostic column bytes.
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    num_columns: u16,
    columns_data: &'a [u8],
}

impl<'a> DataRow<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let head = DataRowHead::ref_from_bytes(payload.get(..2).ok_or_else(|| {
            Error::Protocol("DataRow: payload shorter than header".into())
        })?)
        .map_err(|e| Error::Protocol(format!("DataRow header: {e:?}")))?;

        Ok(Self {
            num_columns: head.num_columns.get(),
            columns_data: &payload[2..],
        })
    }

    pub fn len(&self) -> usize {
        self.num_columns as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_columns == 0
    }

    /// Iterate over column values; `None` represents SQL NULL.
    pub fn iter(&self) -> DataRowIter<'a> {
        DataRowIter { remaining: self.columns_data }
    }
}

/// Iterator over column values in a DataRow.
#[derive(Debug, Clone)]
pub struct DataRowIter<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for DataRowIter<'a> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let len_bytes;
        (len_bytes, self.remaining) = self.remaining.split_at_checked(4)?;
        let len = i32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

        if len == -1 {
            Some(None)
        } else {
            let len = len as usize;
            if self.remaining.len() < len {
                return None;
            }
            let value;
            (value, self.remaining) = self.remaining.split_at_checked(len)?;
            Some(Some(value))
        }
    }
}

/// CommandComplete message - a command finished successfully.
#[derive(Debug, Clone, Copy)]
pub struct CommandComplete<'a> {
    /// Command tag, e.g. `"SELECT 5"`, `"INSERT 0 1"`, `"UPDATE 10"`.
    pub tag: &'a str,
}

impl<'a> CommandComplete<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (tag, _) = read_cstr(payload)?;
        Ok(Self { tag })
    }

    /// Parse `(command, inserted_oid, rows)` out of the tag, per the
    /// `"<CMD>"` / `"<CMD> <rows>"` / `"<CMD> <oid> <rows>"` grammar.
    pub fn parts(&self) -> (&'a str, Option<u32>, Option<u64>) {
        let mut tokens = self.tag.split_whitespace();
        let Some(command) = tokens.next() else {
            return ("", None, None);
        };
        let rest: Vec<&str> = tokens.collect();
        match rest.as_slice() {
            [rows] => (command, None, rows.parse().ok()),
            [oid, rows] => (command, oid.parse().ok(), rows.parse().ok()),
            _ => (command, None, None),
        }
    }
}

/// EmptyQueryResponse message - response to an empty (whitespace-only) query string.
#[derive(Debug, Clone, Copy)]
pub struct EmptyQueryResponse;

impl EmptyQueryResponse {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_complete_parses_insert_three_token_form() {
        let payload = b"INSERT 0 1\0";
        let cc = CommandComplete::parse(payload).unwrap();
        assert_eq!(cc.parts(), ("INSERT", Some(0), Some(1)));
    }

    #[test]
    fn command_complete_parses_select_two_token_form() {
        let payload = b"SELECT 3\0";
        let cc = CommandComplete::parse(payload).unwrap();
        assert_eq!(cc.parts(), ("SELECT", None, Some(3)));
    }

    #[test]
    fn data_row_iter_yields_null_for_minus_one_length() {
        let mut payload = 1u16.to_be_bytes().to_vec();
        payload.extend_from_slice(&(-1i32).to_be_bytes());
        let row = DataRow::parse(&payload).unwrap();
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![None]);
    }
}
