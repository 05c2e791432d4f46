//! Fuzz target for the decrypting stream state machine
//!
//! # Strategy
//!
//! - Open a decrypt session with attacker-controlled header bytes
//! - Feed arbitrary chunk bytes and AAD through `pull`
//! - Interleave pulls with explicit rekeys
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary input
//! - Arbitrary bytes never authenticate: `pull` must not return plaintext
//!   unless the chunk was produced by the matching encrypt session
//! - A session stays usable (or cleanly terminal) after failed pulls

#![no_main]

use arbitrary::Arbitrary;
use keyfort::{DecryptStream, SecretKey};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct PullSession {
    header: Vec<u8>,
    chunks: Vec<(Vec<u8>, Option<Vec<u8>>, bool)>,
}

fuzz_target!(|session: PullSession| {
    let key = SecretKey::from_bytes(&[0x42; 32]).expect("fixed-length key");

    let Ok(mut stream) = DecryptStream::open(&session.header, &key) else {
        // Malformed header must be rejected without creating state
        assert_ne!(session.header.len(), keyfort::HEADER_BYTES);
        return;
    };

    for (chunk, aad, do_rekey) in &session.chunks {
        if *do_rekey {
            let _ = stream.rekey();
        }
        // Forging a Poly1305 tag is out of reach for the fuzzer, so any
        // successful pull here is a soundness bug.
        let result = stream.pull(chunk, aad.as_deref());
        assert!(result.is_err(), "arbitrary bytes must never authenticate");
    }
});
