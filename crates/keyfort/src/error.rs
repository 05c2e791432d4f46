//! Error types for the keyfort library.
//!
//! One closed taxonomy for every fallible operation. Nothing is logged or
//! swallowed inside the library; every failure surfaces to the caller as a
//! typed result. Errors never carry secret bytes.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by secure values, multipart hashing, and stream sessions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Secure buffer allocation was refused by the allocator.
    ///
    /// Propagates to the caller as-is; no internal retry. Other live
    /// sessions and contexts are unaffected.
    #[error("secure buffer allocation of {requested} bytes failed")]
    Allocation {
        /// Number of bytes that could not be allocated
        requested: usize,
    },

    /// Input has the wrong size for its fixed-length value kind.
    #[error("wrong length for {kind}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Human-readable name of the value kind
        kind: &'static str,
        /// The kind's declared length
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// Text or framing input could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// AEAD tag verification failed.
    ///
    /// No plaintext is produced or retained on this path.
    #[error("authentication failed")]
    Authentication,

    /// Operation invoked past a valid lifecycle transition.
    #[error("invalid state: cannot {operation} on a {state}")]
    InvalidState {
        /// Operation that was attempted
        operation: &'static str,
        /// State the handle was in
        state: &'static str,
    },

    /// Stream header rejected when opening a decrypt session.
    #[error("invalid stream header")]
    InvalidHeader,

    /// A tunable parameter was outside the range the primitive accepts.
    #[error("invalid parameter: {0}")]
    Parameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_message_names_kind() {
        let err = Error::LengthMismatch { kind: "secret key", expected: 32, actual: 16 };
        let message = err.to_string();
        assert!(message.contains("secret key"));
        assert!(message.contains("32"));
        assert!(message.contains("16"));
    }

    #[test]
    fn authentication_error_carries_no_detail() {
        // The message must not distinguish tamper from truncation or wrong key.
        assert_eq!(Error::Authentication.to_string(), "authentication failed");
    }
}
