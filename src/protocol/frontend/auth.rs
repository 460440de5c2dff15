//! Authentication frontend messages.

use crate::protocol::codec::MessageBuilder;

/// Write a PasswordMessage carrying a cleartext or MD5-hashed password.
pub fn write_password(buf: &mut Vec<u8>, password: &str) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
    msg.write_cstr(password);
    msg.finish();
}

/// Compute the PostgreSQL MD5 password response.
///
/// `"md5" + hex(md5(hex(md5(password || user)) || salt))` — note the
/// password-then-user order in the inner hash, which the server's
/// `md5(concat(password, username))` definition depends on.
pub fn md5_password(username: &str, password: &str, salt: &[u8; 4]) -> String {
    use md5::{Digest, Md5};

    let mut inner = Md5::new();
    inner.update(password.as_bytes());
    inner.update(username.as_bytes());
    let inner_hex = format!("{:x}", inner.finalize());

    let mut outer = Md5::new();
    outer.update(inner_hex.as_bytes());
    outer.update(salt);

    format!("md5{:x}", outer.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_password_has_expected_shape() {
        let result = md5_password("postgres", "password", &[0x01, 0x02, 0x03, 0x04]);
        assert!(result.starts_with("md5"));
        assert_eq!(result.len(), 35);
    }

    #[test]
    fn md5_password_is_order_sensitive() {
        let salt = [0u8; 4];
        assert_ne!(
            md5_password("alice", "secret", &salt),
            md5_password("bob", "secret", &salt)
        );
    }

    #[test]
    fn password_message_is_null_terminated() {
        let mut buf = Vec::new();
        write_password(&mut buf, "secret");
        assert_eq!(buf[0], b'p');
        assert!(buf.ends_with(&[0]));
    }
}
