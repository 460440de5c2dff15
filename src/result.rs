//! Result assembly: accumulating backend messages into a `QueryResult`.

use crate::protocol::backend::query::{CommandComplete, FieldDescription, RowDescription};
use crate::protocol::types::{FormatCode, Oid};

/// Outcome of one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    EmptyQuery,
    CommandOk,
    TuplesOk,
    CopyOut,
    CopyIn,
}

/// One column's metadata, as carried by a backend RowDescription.
#[derive(Debug, Clone)]
pub struct RowFieldDescription {
    pub name: String,
    /// OID of the owning table, or 0 if the column is not a table column.
    pub table_oid: Oid,
    /// 1-based attribute number within the owning table, or 0.
    pub column_id: i16,
    pub type_oid: Oid,
    /// Negative for variable-length types.
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: FormatCode,
}

impl From<&FieldDescription> for RowFieldDescription {
    fn from(f: &FieldDescription) -> Self {
        Self {
            name: f.name.clone(),
            table_oid: f.table_oid,
            column_id: f.column_id,
            type_oid: f.type_oid,
            type_size: f.type_size,
            type_modifier: f.type_modifier,
            format: f.format,
        }
    }
}

/// One row: raw column bytes, `None` marking SQL NULL.
pub type Row = Vec<Option<Vec<u8>>>;

/// The accumulated outcome of a simple-query request.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: Status,
    /// The command verb from the last CommandComplete tag (`"SELECT"`, `"INSERT"`, ...).
    pub command_tag: Option<String>,
    pub rows_affected: Option<u64>,
    /// OID of the inserted row, from INSERT's three-token command tag.
    pub inserted_oid: Option<u32>,
    pub fields: Vec<RowFieldDescription>,
    pub rows: Vec<Row>,
    pub binary_tuples: bool,
}

impl QueryResult {
    pub fn new() -> Self {
        Self {
            status: Status::CommandOk,
            command_tag: None,
            rows_affected: None,
            inserted_oid: None,
            fields: Vec::new(),
            rows: Vec::new(),
            binary_tuples: false,
        }
    }

    pub fn set_row_description(&mut self, desc: &RowDescription) {
        self.fields = desc.fields.iter().map(RowFieldDescription::from).collect();
        self.binary_tuples = self
            .fields
            .first()
            .is_some_and(|f| matches!(f.format, FormatCode::Binary));
        self.status = Status::TuplesOk;
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Apply a CommandComplete tag. During an active Copy operation this
    /// updates the existing result's command status instead of replacing it,
    /// mirroring the wire sequence CopyInResponse/CopyOutResponse →
    /// (CopyData...) → CopyDone → CommandComplete.
    pub fn apply_command_complete(&mut self, cc: &CommandComplete<'_>) {
        let (command, oid, rows) = cc.parts();
        self.command_tag = Some(command.to_string());
        self.inserted_oid = oid;
        self.rows_affected = rows;
        if self.status != Status::CopyIn && self.status != Status::CopyOut {
            self.status = Status::CommandOk;
        }
    }

    pub fn set_empty_query(&mut self) {
        self.status = Status::EmptyQuery;
    }
}

impl Default for QueryResult {
    fn default() -> Self {
        Self::new()
    }
}

/// An asynchronous LISTEN/NOTIFY delivery, decoupled from any in-flight request.
#[derive(Debug, Clone)]
pub struct Notification {
    pub pid: u32,
    pub channel: String,
    pub payload: String,
}
