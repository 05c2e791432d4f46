//! Fuzz target for text and byte decoding of fixed-length values
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary text or bytes
//! - Accepted inputs round-trip exactly
//! - Wrong-length inputs are always rejected

#![no_main]

use keyfort::{Header, Nonce, SecretKey, Sha512Digest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = SecretKey::from_bytes(data) {
        assert_eq!(data.len(), SecretKey::LEN);
        let decoded = SecretKey::from_hex(&key.to_hex()).expect("round trip");
        assert_eq!(key, decoded);
    } else {
        assert_ne!(data.len(), SecretKey::LEN);
    }

    let _ = Nonce::from_bytes(data);
    let _ = Sha512Digest::from_bytes(data);
    let _ = Header::from_bytes(data);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = SecretKey::from_hex(text);
        let _ = Header::from_hex(text);
    }
});
