//! Wipe-on-drop byte buffers for secret material.
//!
//! [`SecureBuffer`] is the exclusive owner of one fixed-size heap region.
//! The contents are zeroed before the memory is released on every exit
//! path — normal scope end, early return, or unwinding — because the wipe
//! lives in `Drop`, never in caller code.
//!
//! # Security
//!
//! - No `Clone`: duplicating a buffer is an explicit, fallible
//!   [`try_clone`](SecureBuffer::try_clone) call
//! - No `Debug` exposure: formatting redacts the contents
//! - Access is scoped: callers pass a bounded closure instead of holding
//!   long-lived references

use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Exclusive owner of a fixed-size byte region, zeroed on drop.
pub struct SecureBuffer {
    bytes: Box<[u8]>,
}

impl SecureBuffer {
    /// Allocate a zero-filled buffer of exactly `len` bytes.
    ///
    /// Fails with [`Error::Allocation`] if the allocator refuses the
    /// request. Allocation failure aborts only this operation; no other
    /// live buffer or session is affected.
    pub fn acquire(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { requested: len })?;
        bytes.resize(len, 0);
        Ok(Self { bytes: bytes.into_boxed_slice() })
    }

    /// Allocate a buffer and copy `data` into it.
    ///
    /// The source slice is caller-owned plain memory; wiping it is the
    /// caller's responsibility.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut buf = Self::acquire(data.len())?;
        buf.bytes.copy_from_slice(data);
        Ok(buf)
    }

    /// Length of the owned region in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the region is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Run `f` over the contents without copying them out.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.bytes)
    }

    /// Run `f` over the contents mutably.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.bytes)
    }

    /// Overwrite the contents from the OS random source.
    pub fn fill_random(&mut self) {
        rand::thread_rng().fill_bytes(&mut self.bytes);
    }

    /// Explicit copy into plain, unwiped memory.
    ///
    /// The returned `Vec` is outside the wipe-on-drop regime; the caller
    /// takes over responsibility for its lifetime.
    pub fn to_plain_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Explicit duplication into a second wiped buffer.
    pub fn try_clone(&self) -> Result<Self> {
        Self::from_slice(&self.bytes)
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Byte-wise equality over the full region.
///
/// NOT constant-time: the comparison may exit early on the first
/// differing byte. Do not use it to compare attacker-supplied values
/// against secrets in timing-sensitive positions.
impl PartialEq for SecureBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SecureBuffer {}

impl PartialOrd for SecureBuffer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic byte-wise ordering. Same timing caveat as equality.
impl Ord for SecureBuffer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl std::fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
