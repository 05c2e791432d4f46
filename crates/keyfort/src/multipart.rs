//! Incremental hashing over a closed set of algorithms.
//!
//! A [`Multipart`] context is Created, absorbs zero or more `update`
//! calls, and is Finalized exactly once. The algorithm is chosen at
//! construction from a closed set: generic (BLAKE3, optionally keyed),
//! SHA-256, and SHA-512. Feeding a message in chunks yields the same
//! digest as hashing it in one call, for every split.
//!
//! After `finalize` the inner state is dropped synchronously; any further
//! `update` or `finalize` fails with [`Error::InvalidState`].

use sha2::{Digest as _, Sha256, Sha512};
use zeroize::Zeroize;

use crate::buffer::SecureBuffer;
use crate::error::{Error, Result};
use crate::value::{GenericDigest, GenericHashKey, Sha256Digest, Sha512Digest};

/// A finalized digest, tagged with the algorithm that produced it.
#[derive(Debug, PartialEq, Eq)]
pub enum Digest {
    /// BLAKE3 output, 32 bytes.
    Generic(GenericDigest),
    /// SHA-256 output, 32 bytes.
    Sha256(Sha256Digest),
    /// SHA-512 output, 64 bytes.
    Sha512(Sha512Digest),
}

impl Digest {
    /// Hex encoding of the digest bytes.
    pub fn to_hex(&self) -> String {
        match self {
            Self::Generic(d) => d.to_hex(),
            Self::Sha256(d) => d.to_hex(),
            Self::Sha512(d) => d.to_hex(),
        }
    }
}

// Box the BLAKE3 state: it is an order of magnitude larger than the
// SHA-2 states and would bloat every Multipart otherwise.
enum State {
    Generic(Box<blake3::Hasher>),
    Sha256(Sha256),
    Sha512(Sha512),
}

/// Incremental hashing context. Created → updated zero or more times →
/// finalized exactly once.
pub struct Multipart {
    state: Option<State>,
}

impl Multipart {
    /// Begin an unkeyed generic (BLAKE3) hash.
    pub fn generic() -> Self {
        Self { state: Some(State::Generic(Box::new(blake3::Hasher::new()))) }
    }

    /// Begin a keyed generic (BLAKE3) hash.
    pub fn generic_keyed(key: &GenericHashKey) -> Self {
        let mut key_bytes = [0u8; 32];
        key.with_bytes(|b| key_bytes.copy_from_slice(b));
        let hasher = Box::new(blake3::Hasher::new_keyed(&key_bytes));
        key_bytes.zeroize();
        Self { state: Some(State::Generic(hasher)) }
    }

    /// Begin a SHA-256 hash.
    pub fn sha256() -> Self {
        Self { state: Some(State::Sha256(Sha256::new())) }
    }

    /// Begin a SHA-512 hash.
    pub fn sha512() -> Self {
        Self { state: Some(State::Sha512(Sha512::new())) }
    }

    /// True once [`finalize`](Self::finalize) has run.
    pub fn is_finalized(&self) -> bool {
        self.state.is_none()
    }

    /// Append a chunk to the running digest.
    ///
    /// Fails with [`Error::InvalidState`] after finalization.
    pub fn update(&mut self, chunk: &[u8]) -> Result<()> {
        let state = self.state.as_mut().ok_or(Error::InvalidState {
            operation: "update",
            state: "finalized hash context",
        })?;
        match state {
            State::Generic(hasher) => {
                hasher.update(chunk);
            },
            State::Sha256(hasher) => hasher.update(chunk),
            State::Sha512(hasher) => hasher.update(chunk),
        }
        Ok(())
    }

    /// Produce the digest and retire the context.
    ///
    /// Valid exactly once; the inner state is dropped synchronously
    /// whether or not the digest allocation succeeds. Zero updates
    /// followed by finalize yields the algorithm's empty-message digest.
    pub fn finalize(&mut self) -> Result<Digest> {
        let state = self.state.take().ok_or(Error::InvalidState {
            operation: "finalize",
            state: "finalized hash context",
        })?;
        match state {
            State::Generic(hasher) => {
                let mut out = SecureBuffer::acquire(GenericDigest::LEN)?;
                out.with_bytes_mut(|b| b.copy_from_slice(hasher.finalize().as_bytes()));
                Ok(Digest::Generic(GenericDigest::from_buffer(out)))
            },
            State::Sha256(hasher) => {
                let mut out = SecureBuffer::acquire(Sha256Digest::LEN)?;
                out.with_bytes_mut(|b| b.copy_from_slice(&hasher.finalize()));
                Ok(Digest::Sha256(Sha256Digest::from_buffer(out)))
            },
            State::Sha512(hasher) => {
                let mut out = SecureBuffer::acquire(Sha512Digest::LEN)?;
                out.with_bytes_mut(|b| b.copy_from_slice(&hasher.finalize()));
                Ok(Digest::Sha512(Sha512Digest::from_buffer(out)))
            },
        }
    }
}

/// One-shot generic (BLAKE3) hash.
pub fn hash_generic(data: &[u8]) -> Result<GenericDigest> {
    GenericDigest::from_bytes(blake3::hash(data).as_bytes())
}

/// One-shot keyed generic (BLAKE3) hash.
pub fn hash_generic_keyed(data: &[u8], key: &GenericHashKey) -> Result<GenericDigest> {
    let mut key_bytes = [0u8; 32];
    key.with_bytes(|b| key_bytes.copy_from_slice(b));
    let digest = blake3::keyed_hash(&key_bytes, data);
    key_bytes.zeroize();
    GenericDigest::from_bytes(digest.as_bytes())
}

/// One-shot SHA-256.
pub fn hash_sha256(data: &[u8]) -> Result<Sha256Digest> {
    Sha256Digest::from_bytes(&Sha256::digest(data))
}

/// One-shot SHA-512.
pub fn hash_sha512(data: &[u8]) -> Result<Sha512Digest> {
    Sha512Digest::from_bytes(&Sha512::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn zero_updates_yields_empty_message_digest() {
        let mut ctx = Multipart::sha256();
        let digest = ctx.finalize().unwrap();
        assert_eq!(digest.to_hex(), SHA256_EMPTY);

        let mut ctx = Multipart::sha512();
        assert_eq!(ctx.finalize().unwrap(), Digest::Sha512(hash_sha512(b"").unwrap()));

        let mut ctx = Multipart::generic();
        assert_eq!(ctx.finalize().unwrap(), Digest::Generic(hash_generic(b"").unwrap()));
    }

    #[test]
    fn two_updates_equal_one_shot_of_concatenation() {
        let a = b"King of Kings ";
        let b = b"am I, Osymandias.";
        let mut joined = Vec::new();
        joined.extend_from_slice(a);
        joined.extend_from_slice(b);

        let mut ctx = Multipart::sha256();
        ctx.update(a).unwrap();
        ctx.update(b).unwrap();
        assert_eq!(ctx.finalize().unwrap(), Digest::Sha256(hash_sha256(&joined).unwrap()));

        let mut ctx = Multipart::generic();
        ctx.update(a).unwrap();
        ctx.update(b).unwrap();
        assert_eq!(ctx.finalize().unwrap(), Digest::Generic(hash_generic(&joined).unwrap()));
    }

    #[test]
    fn arbitrary_splits_agree() {
        let data: Vec<u8> = (0u16..700).map(|i| (i % 251) as u8).collect();
        let expected = Digest::Sha512(hash_sha512(&data).unwrap());

        for split in [0, 1, 17, 350, 699, 700] {
            let mut ctx = Multipart::sha512();
            ctx.update(&data[..split]).unwrap();
            ctx.update(&data[split..]).unwrap();
            assert_eq!(ctx.finalize().unwrap(), expected, "split at {split}");
        }
    }

    #[test]
    fn keyed_generic_differs_from_unkeyed() {
        let key = GenericHashKey::from_bytes(&[0x11; 32]).unwrap();

        let mut keyed = Multipart::generic_keyed(&key);
        keyed.update(b"payload").unwrap();
        let keyed_digest = keyed.finalize().unwrap();

        let mut plain = Multipart::generic();
        plain.update(b"payload").unwrap();
        let plain_digest = plain.finalize().unwrap();

        assert_ne!(keyed_digest, plain_digest);
        assert_eq!(
            keyed_digest,
            Digest::Generic(hash_generic_keyed(b"payload", &key).unwrap())
        );
    }

    #[test]
    fn update_after_finalize_fails() {
        let mut ctx = Multipart::sha256();
        ctx.update(b"data").unwrap();
        ctx.finalize().unwrap();
        assert!(ctx.is_finalized());

        let result = ctx.update(b"more");
        assert!(matches!(result, Err(Error::InvalidState { operation: "update", .. })));
    }

    #[test]
    fn finalize_twice_fails() {
        let mut ctx = Multipart::generic();
        ctx.finalize().unwrap();

        let result = ctx.finalize();
        assert!(matches!(result, Err(Error::InvalidState { operation: "finalize", .. })));
    }

    #[test]
    fn sha256_and_sha512_disagree_on_same_input() {
        let mut a = Multipart::sha256();
        a.update(b"input").unwrap();
        let mut b = Multipart::sha512();
        b.update(b"input").unwrap();
        // Different variants produce differently-typed digests
        assert_ne!(
            a.finalize().unwrap().to_hex(),
            b.finalize().unwrap().to_hex()
        );
    }
}
