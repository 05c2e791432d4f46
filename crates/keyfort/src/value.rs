//! Fixed-length typed values over [`SecureBuffer`].
//!
//! Every kind declares its length once; generation enforces it and every
//! decode or import validates it. All kinds share byte-wise equality and
//! ordering plus a reversible lower-case hex encoding.
//!
//! # Security
//!
//! - Comparison is byte-wise and NOT constant-time (see [`SecureBuffer`]'s
//!   `PartialEq` caveat); this mirrors the original semantics and is an
//!   acknowledged timing caveat rather than an oversight
//! - No implicit copies: duplication goes through an explicit, fallible
//!   `try_clone`
//! - `Debug` output is redacted for every kind

use zeroize::Zeroize;

use crate::buffer::SecureBuffer;
use crate::error::{Error, Result};

macro_rules! secure_value {
    (
        $(#[$meta:meta])*
        $name:ident, $len:expr, $label:literal
    ) => {
        $(#[$meta])*
        pub struct $name {
            buf: SecureBuffer,
        }

        impl $name {
            /// Fixed length of this value kind in bytes.
            pub const LEN: usize = $len;

            /// Build the value from exactly [`Self::LEN`] raw bytes.
            ///
            /// Fails with [`Error::LengthMismatch`] on any other input
            /// size. The source slice is not wiped; that is the caller's
            /// responsibility.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                if bytes.len() != Self::LEN {
                    return Err(Error::LengthMismatch {
                        kind: $label,
                        expected: Self::LEN,
                        actual: bytes.len(),
                    });
                }
                Ok(Self::from_buffer(SecureBuffer::from_slice(bytes)?))
            }

            /// Decode a lower-case hex string produced by [`Self::to_hex`].
            ///
            /// Fails with [`Error::Decode`] on invalid characters or on a
            /// decoded length other than [`Self::LEN`].
            pub fn from_hex(text: &str) -> Result<Self> {
                let mut bytes = hex::decode(text).map_err(|e| {
                    Error::Decode(format!("invalid hex for {}: {e}", $label))
                })?;
                let value = if bytes.len() == Self::LEN {
                    Self::from_bytes(&bytes)
                } else {
                    Err(Error::Decode(format!(
                        "wrong decoded length for {}: expected {} bytes, got {}",
                        $label,
                        Self::LEN,
                        bytes.len(),
                    )))
                };
                bytes.zeroize();
                value
            }

            /// Hex encoding: two lower-case digits per byte, byte order
            /// preserved. The returned string is plain memory.
            pub fn to_hex(&self) -> String {
                hex::encode(self.as_slice())
            }

            /// Run `f` over the raw bytes without copying them out.
            pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
                self.buf.with_bytes(f)
            }

            /// Explicit duplication into an independently wiped buffer.
            pub fn try_clone(&self) -> Result<Self> {
                Ok(Self::from_buffer(self.buf.try_clone()?))
            }

            pub(crate) fn as_slice(&self) -> &[u8] {
                self.buf.as_slice()
            }

            pub(crate) fn from_buffer(buf: SecureBuffer) -> Self {
                Self { buf }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.buf == other.buf
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.buf.cmp(&other.buf)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &"[REDACTED]")
                    .finish()
            }
        }
    };
}

// Adds `generate()` for kinds that are legitimately produced by the OS
// random source. Digest and tag kinds are only produced by operations.
macro_rules! random_value {
    ($name:ident) => {
        impl $name {
            /// Fill a fresh value of [`Self::LEN`] bytes from the OS
            /// random source.
            pub fn generate() -> Result<Self> {
                let mut buf = SecureBuffer::acquire(Self::LEN)?;
                buf.fill_random();
                Ok(Self { buf })
            }
        }
    };
}

secure_value!(
    /// 256-bit key for one-shot and streaming AEAD.
    SecretKey,
    32,
    "secret key"
);
random_value!(SecretKey);

secure_value!(
    /// 192-bit XChaCha20-Poly1305 nonce. Must never repeat under the
    /// same key.
    Nonce,
    24,
    "nonce"
);
random_value!(Nonce);

secure_value!(
    /// 256-bit key for the keyed generic hash.
    GenericHashKey,
    32,
    "generic hash key"
);
random_value!(GenericHashKey);

secure_value!(
    /// 256-bit generic (BLAKE3) hash output.
    GenericDigest,
    32,
    "generic digest"
);

secure_value!(
    /// SHA-256 hash output.
    Sha256Digest,
    32,
    "sha-256 digest"
);

secure_value!(
    /// SHA-512 hash output.
    Sha512Digest,
    64,
    "sha-512 digest"
);

secure_value!(
    /// 256-bit key for one-shot message authentication.
    AuthKey,
    32,
    "authentication key"
);
random_value!(AuthKey);

secure_value!(
    /// HMAC-SHA-256 authentication tag.
    AuthTag,
    32,
    "authentication tag"
);

secure_value!(
    /// 128-bit salt for password-based key derivation. Not secret, but
    /// handled under the same wipe discipline as the keys it produces.
    Salt,
    16,
    "salt"
);
random_value!(Salt);

secure_value!(
    /// 256-bit key derived from a passphrase.
    PasswordDigest,
    32,
    "password digest"
);
