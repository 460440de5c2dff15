//! Fast-path function call frontend message.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::{FormatCode, Oid};

/// Write a FunctionCall message (the legacy fast-path protocol, historically
/// used for large-object access).
///
/// All arguments and the result use the same format code in this
/// implementation: one `arg_format_count = 1` followed by exactly one shared
/// format code, not one per argument. `None` encodes SQL NULL.
pub fn write_function_call(buf: &mut Vec<u8>, function_oid: Oid, args: &[Option<&[u8]>], format: FormatCode) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::FUNCTION_CALL);
    msg.write_i32(function_oid as i32);

    msg.write_i16(1);
    msg.write_i16(format as i16);

    msg.write_i16(args.len() as i16);
    for value in args {
        match value {
            Some(bytes) => {
                msg.write_i32(bytes.len() as i32);
                msg.write_bytes(bytes);
            }
            None => msg.write_i32(-1),
        }
    }

    msg.write_i16(format as i16);
    msg.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_single_text_argument() {
        let mut buf = Vec::new();
        write_function_call(&mut buf, 42, &[Some(b"hi")], FormatCode::Text);
        assert_eq!(buf[0], b'F');
    }

    #[test]
    fn encodes_a_null_argument() {
        let mut buf = Vec::new();
        write_function_call(&mut buf, 42, &[None], FormatCode::Binary);
        assert_eq!(buf[0], b'F');
        assert!(buf.windows(4).any(|w| w == (-1i32).to_be_bytes()));
    }

    #[test]
    fn two_arguments_share_a_single_format_code() {
        let mut buf = Vec::new();
        write_function_call(&mut buf, 42, &[Some(b"hi"), Some(b"yo")], FormatCode::Text);
        // function_oid(4) + arg_format_count(2) + arg_format(2) == offset of arg_count
        let arg_count = i16::from_be_bytes([buf[5 + 4 + 2 + 2], buf[5 + 4 + 2 + 2 + 1]]);
        assert_eq!(arg_count, 2);
        let first_len = i32::from_be_bytes(buf[5 + 4 + 2 + 2 + 2..5 + 4 + 2 + 2 + 2 + 4].try_into().unwrap());
        assert_eq!(first_len, 2);
    }
}
