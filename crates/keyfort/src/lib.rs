//! Keyfort Secure Value and Streaming Encryption Layer
//!
//! Stateful, lifecycle-safe abstractions over trusted cryptographic
//! primitives: a wipe-on-drop memory model for secret material, and the
//! incremental state machines built on top of it — multipart hashing and
//! chunked authenticated streaming encryption.
//!
//! # Layering
//!
//! ```text
//! SecureBuffer (owned, wiped-on-drop byte region)
//!        │
//!        ▼
//! Secure values (SecretKey, Nonce, digests, tags, salts — fixed length,
//!                hex-codable, byte-wise comparable)
//!        │
//!        ├──▶ Multipart hashing (BLAKE3 / SHA-256 / SHA-512)
//!        ├──▶ One-shot AEAD (XChaCha20-Poly1305)
//!        ├──▶ One-shot authentication (HMAC-SHA-256)
//!        ├──▶ Password key derivation (Argon2id)
//!        └──▶ Streaming AEAD (tagged chunks over a forward ratchet)
//! ```
//!
//! # Security
//!
//! Memory discipline:
//! - Every secret lives in a [`SecureBuffer`] that zeroes itself on drop,
//!   on every exit path including error propagation and unwinding
//! - No implicit copies: duplication and plain-memory export are explicit
//!   calls
//! - Debug formatting of secret-bearing types is redacted
//!
//! Lifecycle discipline:
//! - Hash contexts and stream sessions are Created → used → Finalized
//!   state machines; use past the terminal state fails with
//!   [`Error::InvalidState`] instead of corrupting state
//! - Failed authentication never yields partial plaintext
//!
//! Known caveat:
//! - Equality and ordering on secure values are byte-wise and NOT
//!   constant-time. This mirrors the original semantics; use
//!   [`auth::verify`] where constant-time comparison matters.
//!
//! # Concurrency
//!
//! Everything is synchronous, CPU-only work. The state machines take
//! `&mut self` and hold no internal lock; exclusive access during
//! update/push/pull is the caller's responsibility. Fully-constructed
//! values are immutable and freely shareable across threads.
//!
//! This layer never logs; every outcome is a typed result visible to the
//! caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod auth;
pub mod buffer;
pub mod error;
pub mod multipart;
pub mod pwhash;
pub mod stream;
pub mod value;

pub use buffer::SecureBuffer;
pub use error::{Error, Result};
pub use multipart::{Digest, Multipart};
pub use stream::{DecryptStream, EncryptStream, HEADER_BYTES, Header, STREAM_OVERHEAD, Tag};
pub use value::{
    AuthKey, AuthTag, GenericDigest, GenericHashKey, Nonce, PasswordDigest, Salt, SecretKey,
    Sha256Digest, Sha512Digest,
};
