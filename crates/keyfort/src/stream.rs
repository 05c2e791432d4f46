//! Chunked authenticated encryption with a ratcheting sub-key.
//!
//! Two independent, protocol-compatible state machines: an encrypting
//! side producing an ordered sequence of tagged chunks, and a decrypting
//! side consuming them in exactly that order. Each chunk is bound to the
//! current ratchet position, so any reordering, duplication, or drop
//! desynchronizes the ratchet and fails authentication on that chunk and,
//! in general, every later one. That is unrecoverable within the session;
//! restart with a fresh [`EncryptStream::open`].
//!
//! # Chunk format
//!
//! ```text
//! chunk = XChaCha20-Poly1305(message_key, nonce, tag_byte || plaintext, aad)
//! nonce = chunk counter (8 bytes BE) || 16 zero bytes
//! ```
//!
//! The message key for each chunk is derived from a chain key that
//! ratchets forward after every chunk (old key wiped), giving forward
//! secrecy within the stream. A [`Tag::Rekey`] chunk performs one extra
//! derivation step on both sides; a [`Tag::Final`] chunk retires the
//! state. Overhead per chunk is [`STREAM_OVERHEAD`] bytes.
//!
//! # Caller obligations
//!
//! The API validates only per-call state, not the global tag sequence:
//! exactly one Final chunk must terminate a stream, and the encrypting
//! side is responsible for emitting it. A stream that simply stops
//! without a Final chunk is indistinguishable from a truncated one
//! except via an external length or EOF signal.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::value::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Length of a stream header in bytes.
pub const HEADER_BYTES: usize = 24;

/// XChaCha20-Poly1305 nonce length.
const NONCE_LEN: usize = 24;

/// Per-chunk ciphertext overhead: one tag byte plus the 16-byte MAC.
pub const STREAM_OVERHEAD: usize = 1 + 16;

/// Domain label for deriving the initial chain key from (key, header).
const INIT_LABEL: &[u8] = b"keyfort stream v1";

/// Label for deriving a chunk's message key
const MESSAGE_LABEL: &[u8] = b"message";

/// Label for ratcheting the chain key forward
const CHAIN_LABEL: &[u8] = b"chain";

/// Label for the extra derivation step on rekey
const REKEY_LABEL: &[u8] = b"rekey";

/// Per-chunk tag carried inside the authenticated envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Ordinary chunk; the stream continues.
    Message,
    /// Marks a logical boundary (explicit flush) without ending the
    /// stream.
    Push,
    /// Derive a fresh sub-key after this chunk, on both sides.
    Rekey,
    /// Terminates the stream; the state becomes unusable afterwards.
    Final,
}

impl Tag {
    /// Wire value of the tag.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Message => 0x00,
            Self::Push => 0x01,
            Self::Rekey => 0x02,
            Self::Final => 0x03,
        }
    }

    /// Parse a wire value back into a tag.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Message),
            0x01 => Some(Self::Push),
            0x02 => Some(Self::Rekey),
            0x03 => Some(Self::Final),
            _ => None,
        }
    }
}

/// Per-stream public value establishing the initial ratchet state.
///
/// Generated once by the encrypting side and required verbatim by the
/// decrypting side. Not secret: transmit it alongside the ciphertext or
/// as a stream prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    bytes: [u8; HEADER_BYTES],
}

impl Header {
    /// Rebuild a header from bytes received out-of-band.
    ///
    /// Fails with [`Error::InvalidHeader`] on any length other than
    /// [`HEADER_BYTES`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; HEADER_BYTES] =
            bytes.try_into().map_err(|_| Error::InvalidHeader)?;
        Ok(Self { bytes })
    }

    /// Decode a header from lower-case hex.
    ///
    /// Fails with [`Error::InvalidHeader`] on invalid characters or
    /// wrong decoded length.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text).map_err(|_| Error::InvalidHeader)?;
        Self::from_bytes(&bytes)
    }

    /// Raw header bytes for transmission.
    pub fn as_bytes(&self) -> &[u8; HEADER_BYTES] {
        &self.bytes
    }

    /// Hex encoding of the header.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    fn generate() -> Self {
        let mut bytes = [0u8; HEADER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }
}

// Headers are public values, so Debug shows them.
impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Header({})", self.to_hex())
    }
}

/// Forward-ratcheting chain shared by both stream sides.
///
/// Both sides derive the same key sequence from (key, header), so a
/// chunk encrypted at position N only authenticates at position N.
struct ChunkRatchet {
    chain_key: [u8; 32],
    counter: u64,
}

impl ChunkRatchet {
    fn init(key: &SecretKey, header: &Header) -> Self {
        let mut chain_key = [0u8; 32];
        key.with_bytes(|ikm| {
            let hkdf = Hkdf::<Sha256>::new(Some(header.as_bytes().as_slice()), ikm);
            let Ok(()) = hkdf.expand(INIT_LABEL, &mut chain_key) else {
                unreachable!("32 bytes is a valid HKDF-SHA256 output length");
            };
        });
        Self { chain_key, counter: 0 }
    }

    /// Message key for the current position. Wipe after use.
    fn message_key(&self) -> [u8; 32] {
        self.derive(MESSAGE_LABEL)
    }

    /// Nonce for the current position: counter || zeros. Unique per
    /// position, and each position already has a unique message key.
    fn nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        nonce[0..8].copy_from_slice(&self.counter.to_be_bytes());
        nonce
    }

    /// Ratchet forward one position, wiping the old chain key.
    fn advance(&mut self) {
        let next = self.derive(CHAIN_LABEL);
        self.chain_key.zeroize();
        self.chain_key = next;
        self.counter = self.counter.wrapping_add(1);
    }

    /// Extra derivation step used by Rekey chunks and explicit rekeys.
    fn rekey(&mut self) {
        let next = self.derive(REKEY_LABEL);
        self.chain_key.zeroize();
        self.chain_key = next;
    }

    fn derive(&self, label: &[u8]) -> [u8; 32] {
        let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(&self.chain_key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(label);
        let result = mac.finalize().into_bytes();

        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }
}

impl Drop for ChunkRatchet {
    fn drop(&mut self) {
        self.chain_key.zeroize();
    }
}

fn seal_chunk(
    ratchet: &ChunkRatchet,
    plaintext: &[u8],
    aad: Option<&[u8]>,
    tag: Tag,
) -> Vec<u8> {
    let mut key = ratchet.message_key();
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let mut envelope = Vec::with_capacity(1 + plaintext.len());
    envelope.push(tag.to_byte());
    envelope.extend_from_slice(plaintext);

    let nonce = ratchet.nonce();
    let result = cipher.encrypt(
        XNonce::from_slice(&nonce),
        Payload { msg: &envelope, aad: aad.unwrap_or(&[]) },
    );
    envelope.zeroize();

    let Ok(ciphertext) = result else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };
    ciphertext
}

/// Encrypting side of a chunked stream.
pub struct EncryptStream {
    ratchet: Option<ChunkRatchet>,
}

impl EncryptStream {
    /// Start a new stream under `key`.
    ///
    /// Returns the fresh public [`Header`] together with the stream
    /// state. The header must reach the decrypting side unmodified.
    pub fn open(key: &SecretKey) -> (Header, Self) {
        let header = Header::generate();
        let ratchet = ChunkRatchet::init(key, &header);
        (header, Self { ratchet: Some(ratchet) })
    }

    /// True once a [`Tag::Final`] chunk has been pushed.
    pub fn is_finalized(&self) -> bool {
        self.ratchet.is_none()
    }

    /// Encrypt the next chunk.
    ///
    /// Binds `plaintext` to `aad` and to the current ratchet position,
    /// then advances the ratchet. [`Tag::Rekey`] derives a fresh sub-key
    /// after the chunk; [`Tag::Final`] retires the state, and any later
    /// push fails with [`Error::InvalidState`]. The returned ciphertext
    /// is `plaintext.len() + STREAM_OVERHEAD` bytes.
    pub fn push(&mut self, plaintext: &[u8], aad: Option<&[u8]>, tag: Tag) -> Result<Vec<u8>> {
        let ratchet = self.ratchet.as_mut().ok_or(Error::InvalidState {
            operation: "push",
            state: "finalized stream",
        })?;

        let ciphertext = seal_chunk(ratchet, plaintext, aad, tag);

        ratchet.advance();
        match tag {
            Tag::Rekey => ratchet.rekey(),
            Tag::Final => {
                // Drop wipes the chain key
                self.ratchet = None;
            },
            Tag::Message | Tag::Push => {},
        }
        Ok(ciphertext)
    }

    /// Manually derive a fresh sub-key, outside the tag protocol.
    ///
    /// The decrypting side must call [`DecryptStream::rekey`] at exactly
    /// the same position, or every later chunk fails authentication.
    pub fn rekey(&mut self) -> Result<()> {
        let ratchet = self.ratchet.as_mut().ok_or(Error::InvalidState {
            operation: "rekey",
            state: "finalized stream",
        })?;
        ratchet.rekey();
        Ok(())
    }
}

/// Decrypting side of a chunked stream.
pub struct DecryptStream {
    ratchet: Option<ChunkRatchet>,
}

impl DecryptStream {
    /// Open the decrypting side from header bytes received alongside
    /// the ciphertext.
    ///
    /// Fails with [`Error::InvalidHeader`] on a malformed header; no
    /// partial state is created on failure.
    pub fn open(header: &[u8], key: &SecretKey) -> Result<Self> {
        let header = Header::from_bytes(header)?;
        Ok(Self { ratchet: Some(ChunkRatchet::init(key, &header)) })
    }

    /// True once a [`Tag::Final`] chunk has been pulled.
    pub fn is_finalized(&self) -> bool {
        self.ratchet.is_none()
    }

    /// Authenticate and decrypt the next chunk, in push order.
    ///
    /// Fails with [`Error::Authentication`] on any MAC mismatch — a
    /// tampered chunk, wrong AAD, or a chunk pulled out of order — and
    /// produces no plaintext on that path. On success, advances the
    /// ratchet, mirrors a [`Tag::Rekey`] derivation, and retires the
    /// state when the pulled tag is [`Tag::Final`].
    pub fn pull(&mut self, chunk: &[u8], aad: Option<&[u8]>) -> Result<(Vec<u8>, Tag)> {
        let ratchet = self.ratchet.as_mut().ok_or(Error::InvalidState {
            operation: "pull",
            state: "finalized stream",
        })?;

        let mut key = ratchet.message_key();
        let cipher = XChaCha20Poly1305::new((&key).into());
        key.zeroize();

        let nonce = ratchet.nonce();
        let mut envelope = cipher
            .decrypt(
                XNonce::from_slice(&nonce),
                Payload { msg: chunk, aad: aad.unwrap_or(&[]) },
            )
            .map_err(|_| Error::Authentication)?;

        let tag = match envelope.split_first() {
            Some((&tag_byte, _)) => Tag::from_byte(tag_byte),
            None => None,
        };
        let Some(tag) = tag else {
            envelope.zeroize();
            return Err(Error::Decode("unknown stream chunk tag".to_string()));
        };

        let plaintext = envelope[1..].to_vec();
        envelope.zeroize();

        ratchet.advance();
        match tag {
            Tag::Rekey => ratchet.rekey(),
            Tag::Final => {
                self.ratchet = None;
            },
            Tag::Message | Tag::Push => {},
        }
        Ok((plaintext, tag))
    }

    /// Counterpart of [`EncryptStream::rekey`]; must be called at the
    /// same stream position as the encrypting side's call.
    pub fn rekey(&mut self) -> Result<()> {
        let ratchet = self.ratchet.as_mut().ok_or(Error::InvalidState {
            operation: "rekey",
            state: "finalized stream",
        })?;
        ratchet.rekey();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::from_bytes(&[0x24; 32]).unwrap()
    }

    #[test]
    fn single_chunk_roundtrip() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let chunk = tx.push(b"hello stream", None, Tag::Final).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        let (plaintext, tag) = rx.pull(&chunk, None).unwrap();

        assert_eq!(plaintext, b"hello stream");
        assert_eq!(tag, Tag::Final);
        assert!(rx.is_finalized());
    }

    #[test]
    fn chunk_overhead_is_constant() {
        let key = test_key();
        let (_, mut tx) = EncryptStream::open(&key);
        for len in [0usize, 1, 64, 4096] {
            let plaintext = vec![0u8; len];
            let chunk = tx.push(&plaintext, None, Tag::Message).unwrap();
            assert_eq!(chunk.len(), len + STREAM_OVERHEAD);
        }
    }

    #[test]
    fn empty_chunk_roundtrip() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let chunk = tx.push(b"", None, Tag::Push).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        let (plaintext, tag) = rx.pull(&chunk, None).unwrap();
        assert!(plaintext.is_empty());
        assert_eq!(tag, Tag::Push);
    }

    #[test]
    fn aad_binds_chunks() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let chunk = tx.push(b"payload", Some(b"context"), Tag::Message).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        assert_eq!(rx.pull(&chunk, Some(b"other")), Err(Error::Authentication));
    }

    #[test]
    fn push_after_final_fails() {
        let key = test_key();
        let (_, mut tx) = EncryptStream::open(&key);
        tx.push(b"end", None, Tag::Final).unwrap();
        assert!(tx.is_finalized());

        let result = tx.push(b"more", None, Tag::Message);
        assert!(matches!(result, Err(Error::InvalidState { operation: "push", .. })));
    }

    #[test]
    fn pull_after_final_fails() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let first = tx.push(b"end", None, Tag::Final).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        rx.pull(&first, None).unwrap();

        let result = rx.pull(&first, None);
        assert!(matches!(result, Err(Error::InvalidState { operation: "pull", .. })));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let chunk = tx.push(b"secret", None, Tag::Message).unwrap();

        let other = SecretKey::from_bytes(&[0x25; 32]).unwrap();
        let mut rx = DecryptStream::open(header.as_bytes(), &other).unwrap();
        assert_eq!(rx.pull(&chunk, None), Err(Error::Authentication));
    }

    #[test]
    fn wrong_header_fails_authentication() {
        let key = test_key();
        let (_, mut tx) = EncryptStream::open(&key);
        let chunk = tx.push(b"secret", None, Tag::Message).unwrap();

        let mut rx = DecryptStream::open(&[0u8; HEADER_BYTES], &key).unwrap();
        assert_eq!(rx.pull(&chunk, None), Err(Error::Authentication));
    }

    #[test]
    fn malformed_header_rejected_at_open() {
        let key = test_key();
        assert_eq!(
            DecryptStream::open(&[0u8; HEADER_BYTES - 1], &key).err(),
            Some(Error::InvalidHeader)
        );
        assert_eq!(DecryptStream::open(&[], &key).err(), Some(Error::InvalidHeader));
    }

    #[test]
    fn rekey_tag_keeps_sides_in_step() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let c1 = tx.push(b"before", None, Tag::Rekey).unwrap();
        let c2 = tx.push(b"after", None, Tag::Final).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        assert_eq!(rx.pull(&c1, None).unwrap(), (b"before".to_vec(), Tag::Rekey));
        assert_eq!(rx.pull(&c2, None).unwrap(), (b"after".to_vec(), Tag::Final));
    }

    #[test]
    fn explicit_rekey_must_be_mirrored() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let c1 = tx.push(b"one", None, Tag::Message).unwrap();
        tx.rekey().unwrap();
        let c2 = tx.push(b"two", None, Tag::Final).unwrap();

        // Mirrored: succeeds
        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        rx.pull(&c1, None).unwrap();
        rx.rekey().unwrap();
        assert_eq!(rx.pull(&c2, None).unwrap().0, b"two");

        // Not mirrored: the post-rekey chunk fails
        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        rx.pull(&c1, None).unwrap();
        assert_eq!(rx.pull(&c2, None), Err(Error::Authentication));
    }

    #[test]
    fn reordered_chunks_fail_authentication() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let c1 = tx.push(b"first", None, Tag::Message).unwrap();
        let _c2 = tx.push(b"second", None, Tag::Message).unwrap();
        let c3 = tx.push(b"third", None, Tag::Final).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        rx.pull(&c1, None).unwrap();
        // Dropping c2 desynchronizes the ratchet for good
        assert_eq!(rx.pull(&c3, None), Err(Error::Authentication));
        assert_eq!(rx.pull(&c3, None), Err(Error::Authentication));
    }

    #[test]
    fn duplicated_chunk_fails_authentication() {
        let key = test_key();
        let (header, mut tx) = EncryptStream::open(&key);
        let c1 = tx.push(b"once", None, Tag::Message).unwrap();

        let mut rx = DecryptStream::open(header.as_bytes(), &key).unwrap();
        rx.pull(&c1, None).unwrap();
        assert_eq!(rx.pull(&c1, None), Err(Error::Authentication));
    }

    #[test]
    fn headers_are_fresh_per_stream() {
        let key = test_key();
        let (h1, _) = EncryptStream::open(&key);
        let (h2, _) = EncryptStream::open(&key);
        assert_ne!(h1, h2);
    }

    #[test]
    fn header_hex_roundtrip() {
        let key = test_key();
        let (header, _) = EncryptStream::open(&key);
        let decoded = Header::from_hex(&header.to_hex()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_rejects_bad_hex() {
        assert_eq!(Header::from_hex("not hex").err(), Some(Error::InvalidHeader));
        assert_eq!(Header::from_hex(&"ab".repeat(12)).err(), Some(Error::InvalidHeader));
    }

    #[test]
    fn tag_byte_roundtrip() {
        for tag in [Tag::Message, Tag::Push, Tag::Rekey, Tag::Final] {
            assert_eq!(Tag::from_byte(tag.to_byte()), Some(tag));
        }
        assert_eq!(Tag::from_byte(0x04), None);
        assert_eq!(Tag::from_byte(0xFF), None);
    }
}
