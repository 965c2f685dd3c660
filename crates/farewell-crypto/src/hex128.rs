//! 128-bit values as canonical hex text.
//!
//! Canonical form is `0x` followed by exactly 32 lowercase hex digits,
//! big-endian and zero-padded on the left. Shares and raw keys cross the UI
//! boundary in this form. The all-zero value is valid and means "share
//! intentionally unset".

use std::{fmt, str::FromStr};

use crate::{entropy::Entropy, error::CryptoError};

/// Maximum number of hex digits in a 128-bit value.
const MAX_DIGITS: usize = 32;

/// Parse hex text into a 128-bit integer.
///
/// Accepts an optional `0x`/`0X` prefix and digits in either case. Empty
/// input (with or without the prefix) is zero. Whitespace is not a hex
/// digit and is rejected like any other character.
///
/// # Errors
///
/// - `InvalidHexFormat`: a character outside `[0-9a-fA-F]`
/// - `TooManyDigits`: more than 32 digits after the prefix
pub fn parse_hex128(text: &str) -> Result<u128, CryptoError> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);

    if digits.is_empty() {
        return Ok(0);
    }

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::InvalidHexFormat);
    }

    if digits.len() > MAX_DIGITS {
        return Err(CryptoError::TooManyDigits { digits: digits.len() });
    }

    u128::from_str_radix(digits, 16).map_err(|_| CryptoError::InvalidHexFormat)
}

/// Render a 128-bit integer in canonical form.
///
/// `parse_hex128(&format_hex128(x)) == Ok(x)` for every `x`.
pub fn format_hex128(value: u128) -> String {
    format!("0x{value:032x}")
}

/// Draw 16 bytes from `entropy` and render them in canonical form.
pub fn random_hex128(entropy: &impl Entropy) -> String {
    format_hex128(u128::from_be_bytes(entropy.random_128()))
}

/// Fit big-endian bytes of any width into `N` bytes.
///
/// Wider inputs keep their low `N` bytes; narrower inputs are zero-extended
/// on the left.
pub fn fit_be_bytes<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let tail = &bytes[bytes.len().saturating_sub(N)..];
    let mut buf = [0u8; N];
    buf[N - tail.len()..].copy_from_slice(tail);
    buf
}

/// Interpret big-endian bytes of any width as an integer modulo 2^128.
///
/// Never fails on overflow.
pub fn mask_be_bytes(bytes: &[u8]) -> u128 {
    u128::from_be_bytes(fit_be_bytes(bytes))
}

/// A 128-bit value that displays in canonical hex form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hex128(u128);

impl Hex128 {
    /// The zero value ("share intentionally unset").
    pub const ZERO: Self = Self(0);

    /// Wrap an integer.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Underlying integer.
    pub const fn value(self) -> u128 {
        self.0
    }

    /// True for the all-zero value.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Big-endian bytes.
    pub const fn to_be_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl From<u128> for Hex128 {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<Hex128> for u128 {
    fn from(value: Hex128) -> Self {
        value.0
    }
}

impl fmt::Display for Hex128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex128(self.0))
    }
}

impl FromStr for Hex128 {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex128(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEntropy(u8);

    impl Entropy for FixedEntropy {
        fn fill_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(self.0);
        }
    }

    #[test]
    fn parse_accepts_prefix_and_mixed_case() {
        assert_eq!(parse_hex128("0xFF").unwrap(), 0xff);
        assert_eq!(parse_hex128("0Xff").unwrap(), 0xff);
        assert_eq!(parse_hex128("aBcD").unwrap(), 0xabcd);
    }

    #[test]
    fn parse_empty_is_zero() {
        assert_eq!(parse_hex128("").unwrap(), 0);
        assert_eq!(parse_hex128("0x").unwrap(), 0);
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert_eq!(parse_hex128("   "), Err(CryptoError::InvalidHexFormat));
        assert_eq!(parse_hex128(" 0x12\n"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(parse_hex128("0x10 "), Err(CryptoError::InvalidHexFormat));
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert_eq!(parse_hex128("0x12g4"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(parse_hex128("+1"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(parse_hex128("0x 12"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(parse_hex128("0x0x1"), Err(CryptoError::InvalidHexFormat));
    }

    #[test]
    fn parse_accepts_exactly_32_digits() {
        let max = format!("0x{}", "f".repeat(32));
        assert_eq!(parse_hex128(&max).unwrap(), u128::MAX);
    }

    #[test]
    fn parse_rejects_33_digits() {
        let too_long = "0".repeat(33);
        assert_eq!(parse_hex128(&too_long), Err(CryptoError::TooManyDigits { digits: 33 }));
    }

    #[test]
    fn format_is_fixed_width_lowercase() {
        assert_eq!(format_hex128(0), format!("0x{}", "0".repeat(32)));
        assert_eq!(format_hex128(0xAB), "0x000000000000000000000000000000ab");
        assert_eq!(format_hex128(u128::MAX), format!("0x{}", "f".repeat(32)));
    }

    #[test]
    fn random_hex_uses_entropy() {
        let hex = random_hex128(&FixedEntropy(0x5a));
        assert_eq!(hex, format!("0x{}", "5a".repeat(16)));
    }

    #[test]
    fn mask_keeps_low_128_bits() {
        let mut wide = vec![0xEEu8; 16];
        wide.extend_from_slice(&7u128.to_be_bytes());
        assert_eq!(mask_be_bytes(&wide), 7);
    }

    #[test]
    fn mask_zero_extends_short_input() {
        assert_eq!(mask_be_bytes(&[0x01, 0x00]), 0x100);
        assert_eq!(mask_be_bytes(&[]), 0);
    }

    #[test]
    fn fit_pads_and_truncates_at_any_width() {
        assert_eq!(fit_be_bytes::<4>(&[0x01, 0x02]), [0, 0, 0x01, 0x02]);
        assert_eq!(fit_be_bytes::<2>(&[0xAA, 0xBB, 0x01, 0x02]), [0x01, 0x02]);
        assert_eq!(fit_be_bytes::<3>(&[]), [0; 3]);
    }

    #[test]
    fn hex128_display_and_parse() {
        let value: Hex128 = "0x2a".parse().unwrap();
        assert_eq!(value.value(), 42);
        assert_eq!(value.to_string(), "0x0000000000000000000000000000002a");
        assert!(Hex128::ZERO.is_zero());
    }
}
