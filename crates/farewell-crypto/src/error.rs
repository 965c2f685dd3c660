//! Error types for Farewell cryptographic primitives.
//!
//! Variants carry lengths and counts only. Textual input to the codec may be
//! a key share, so it is never echoed back in an error.

use thiserror::Error;

/// Errors from the 128-bit codec, the cipher and key handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Text contained a character outside the accepted hex alphabet, or a
    /// packed value was not in canonical `0x`-prefixed lowercase form.
    #[error("invalid hex format")]
    InvalidHexFormat,

    /// More hex digits than fit in 128 bits.
    #[error("too many hex digits: {digits} (maximum 32)")]
    TooManyDigits {
        /// Number of digits supplied after the prefix
        digits: usize,
    },

    /// Raw key material was not exactly 16 bytes.
    #[error("invalid key length: expected 16 bytes, got {actual}")]
    InvalidKeyLength {
        /// Length that was supplied
        actual: usize,
    },

    /// Exported key material did not have the expected 16-byte length.
    #[error("exported key length mismatch: expected 16 bytes, got {actual}")]
    ExportLengthMismatch {
        /// Length that was produced
        actual: usize,
    },

    /// Packed ciphertext shorter than IV plus tag.
    #[error("ciphertext too short: expected at least 28 bytes, got {actual}")]
    CiphertextTooShort {
        /// Decoded length
        actual: usize,
    },

    /// Tag did not verify. Covers wrong key, wrong IV, tampered ciphertext
    /// and mismatched associated data alike.
    #[error("authentication failed")]
    AuthenticationFailed,
}

impl CryptoError {
    /// Returns true for malformed textual input the user can correct and
    /// resubmit.
    ///
    /// Integrity failures (`CiphertextTooShort`, `AuthenticationFailed`) are
    /// never recoverable: retrying with altered parameters would turn the
    /// decrypt path into an oracle.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidHexFormat | Self::TooManyDigits { .. })
    }

    /// Returns true if this error means a packed value could not be opened.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::CiphertextTooShort { .. } | Self::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_recoverable() {
        assert!(CryptoError::InvalidHexFormat.is_input_error());
        assert!(CryptoError::TooManyDigits { digits: 33 }.is_input_error());
        assert!(!CryptoError::AuthenticationFailed.is_input_error());
        assert!(!CryptoError::InvalidKeyLength { actual: 15 }.is_input_error());
    }

    #[test]
    fn integrity_errors_are_classified() {
        assert!(CryptoError::AuthenticationFailed.is_integrity_error());
        assert!(CryptoError::CiphertextTooShort { actual: 3 }.is_integrity_error());
        assert!(!CryptoError::ExportLengthMismatch { actual: 32 }.is_integrity_error());
    }

    #[test]
    fn authentication_message_is_generic() {
        assert_eq!(CryptoError::AuthenticationFailed.to_string(), "authentication failed");
    }
}
