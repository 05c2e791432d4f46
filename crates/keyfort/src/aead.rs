//! One-shot authenticated encryption with XChaCha20-Poly1305.
//!
//! The single-call primitive the streaming layer composes, exposed
//! directly for whole-message use. Ciphertext length is always plaintext
//! length plus [`AEAD_OVERHEAD`] bytes of MAC.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use crate::error::{Error, Result};
use crate::value::{Nonce, SecretKey};

/// Poly1305 MAC overhead appended to every ciphertext.
pub const AEAD_OVERHEAD: usize = 16;

fn cipher_for(key: &SecretKey) -> XChaCha20Poly1305 {
    key.with_bytes(|k| XChaCha20Poly1305::new(Key::from_slice(k)))
}

/// Encrypt and authenticate `plaintext` under (key, nonce).
///
/// The nonce must never repeat under the same key; prefer
/// [`Nonce::generate`] per message, or use [`seal`] which does so.
pub fn encrypt(
    key: &SecretKey,
    nonce: &Nonce,
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Vec<u8> {
    let cipher = cipher_for(key);
    let result = nonce.with_bytes(|n| {
        cipher.encrypt(
            XNonce::from_slice(n),
            Payload { msg: plaintext, aad: aad.unwrap_or(&[]) },
        )
    });
    let Ok(ciphertext) = result else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };
    ciphertext
}

/// Verify and decrypt a ciphertext produced by [`encrypt`].
///
/// Fails with [`Error::Authentication`] on any mismatch — wrong key,
/// wrong nonce, wrong AAD, or a tampered ciphertext — and produces no
/// plaintext bytes on that path.
pub fn decrypt(
    key: &SecretKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let cipher = cipher_for(key);
    nonce
        .with_bytes(|n| {
            cipher.decrypt(
                XNonce::from_slice(n),
                Payload { msg: ciphertext, aad: aad.unwrap_or(&[]) },
            )
        })
        .map_err(|_| Error::Authentication)
}

/// Encrypt under a fresh random nonce, prefixing it to the output.
///
/// Output framing: `[24-byte nonce][ciphertext + 16-byte MAC]`.
pub fn seal(key: &SecretKey, plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
    let nonce = Nonce::generate()?;
    let ciphertext = encrypt(key, &nonce, plaintext, aad);

    let mut sealed = Vec::with_capacity(Nonce::LEN + ciphertext.len());
    nonce.with_bytes(|n| sealed.extend_from_slice(n));
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt the output of [`seal`].
///
/// Too-short input is reported as [`Error::Authentication`], the same as
/// a tampered ciphertext, so the error does not reveal which check
/// failed.
pub fn open_sealed(key: &SecretKey, sealed: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
    if sealed.len() < Nonce::LEN + AEAD_OVERHEAD {
        return Err(Error::Authentication);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(Nonce::LEN);
    let nonce = Nonce::from_bytes(nonce_bytes)?;
    decrypt(key, &nonce, ciphertext, aad)
}
