//! One-shot message authentication with HMAC-SHA-256.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::buffer::SecureBuffer;
use crate::error::Result;
use crate::value::{AuthKey, AuthTag};

type HmacSha256 = Hmac<Sha256>;

fn mac_for(key: &AuthKey) -> HmacSha256 {
    key.with_bytes(|k| {
        let Ok(mac) = HmacSha256::new_from_slice(k) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac
    })
}

/// Compute the authentication tag for `message` under `key`.
pub fn authenticate(message: &[u8], key: &AuthKey) -> Result<AuthTag> {
    let mut mac = mac_for(key);
    mac.update(message);
    let result = mac.finalize().into_bytes();

    let mut out = SecureBuffer::acquire(AuthTag::LEN)?;
    out.with_bytes_mut(|b| b.copy_from_slice(&result));
    Ok(AuthTag::from_buffer(out))
}

/// Check `tag` against `message` under `key`.
///
/// The underlying comparison is constant-time (the `hmac` crate's
/// verification), unlike the byte-wise equality on [`AuthTag`] itself.
pub fn verify(message: &[u8], tag: &AuthTag, key: &AuthKey) -> bool {
    let mut mac = mac_for(key);
    mac.update(message);
    tag.with_bytes(|t| mac.verify_slice(t).is_ok())
}
