//! Common PostgreSQL wire protocol types.

/// PostgreSQL Object Identifier.
pub type Oid = u32;

/// Data format code used throughout the protocol (RowDescription, Bind, function calls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum FormatCode {
    /// Text format (human-readable).
    #[default]
    Text = 0,
    /// Binary, type-specific packed representation.
    Binary = 1,
}

impl FormatCode {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => FormatCode::Binary,
            _ => FormatCode::Text,
        }
    }
}

impl From<u16> for FormatCode {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

/// Transaction status indicator carried by every ReadyForQuery message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Idle, not inside a transaction block.
    #[default]
    Idle = b'I',
    /// Inside an open transaction block.
    InTransaction = b'T',
    /// Inside a transaction block that has failed; statements are rejected until rollback.
    Failed = b'E',
}

impl TransactionStatus {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'I' => Some(TransactionStatus::Idle),
            b'T' => Some(TransactionStatus::InTransaction),
            b'E' => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    pub fn in_transaction(self) -> bool {
        matches!(self, TransactionStatus::InTransaction | TransactionStatus::Failed)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, TransactionStatus::Failed)
    }
}
