//! Chain-facing value types.

use std::{fmt, str::FromStr};

use farewell_crypto::{fit_be_bytes, mask_be_bytes};

use crate::error::AddressParseError;

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parses `0x`-prefixed hex. Checksummed (mixed-case) input is accepted;
    /// the checksum itself is not verified.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressParseError { reason: "missing 0x prefix".to_string() })?;

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|err| AddressParseError { reason: err.to_string() })?;
        Ok(Self(bytes))
    }
}

/// Opaque 32-byte reference to an encrypted value held by the
/// confidential-compute domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CiphertextHandle(pub [u8; 32]);

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A value returned in the clear by an authorized decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearValue {
    /// Unsigned integer, big-endian, any width
    Uint(Vec<u8>),
    /// Decrypted address
    Address(Address),
    /// Decrypted boolean
    Bool(bool),
}

impl ClearValue {
    /// Integer value reduced modulo 2^128. `None` for non-integers.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::Uint(bytes) => Some(mask_be_bytes(bytes)),
            Self::Address(_) | Self::Bool(_) => None,
        }
    }

    /// Integer as a 32-byte big-endian word, left-padded or truncated to the
    /// low 32 bytes. `None` for non-integers.
    pub fn as_word(&self) -> Option<[u8; 32]> {
        match self {
            Self::Uint(bytes) => Some(fit_be_bytes(bytes)),
            Self::Address(_) | Self::Bool(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip() {
        let text = "0x00000000000000000000000000000000000000ff";
        let address: Address = text.parse().unwrap();

        assert_eq!(address.0[19], 0xff);
        assert_eq!(address.to_string(), text);
    }

    #[test]
    fn address_accepts_checksum_case() {
        let address: Address = "0xAbCdEf0000000000000000000000000000000001".parse().unwrap();
        assert_eq!(address.0[0], 0xab);
    }

    #[test]
    fn address_rejects_bad_input() {
        let missing_prefix = "ff".parse::<Address>().unwrap_err();
        assert_eq!(missing_prefix.reason, "missing 0x prefix");

        assert!("0x1234".parse::<Address>().is_err());
        assert!(format!("0x{}", "g".repeat(40)).parse::<Address>().is_err());
        assert!(format!(" 0x{}", "0".repeat(40)).parse::<Address>().is_err());
    }

    #[test]
    fn handle_displays_as_prefixed_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xCE;
        bytes[31] = 0x01;

        let text = CiphertextHandle(bytes).to_string();
        assert_eq!(text.len(), 66);
        assert!(text.starts_with("0xce00"));
        assert!(text.ends_with("0001"));
    }

    #[test]
    fn clear_uint_masks_to_128_bits() {
        let mut wide = vec![0xFFu8; 16];
        wide.extend_from_slice(&5u128.to_be_bytes());
        assert_eq!(ClearValue::Uint(wide).as_u128(), Some(5));
        assert_eq!(ClearValue::Bool(true).as_u128(), None);
    }

    #[test]
    fn clear_word_is_left_padded() {
        let word = ClearValue::Uint(vec![0x01, 0x02]).as_word().unwrap();
        assert_eq!(&word[30..], &[0x01, 0x02]);
        assert!(word[..30].iter().all(|&b| b == 0));
        assert_eq!(ClearValue::Bool(false).as_word(), None);
    }

    #[test]
    fn clear_word_keeps_low_32_bytes() {
        let mut wide = vec![0xFFu8; 4];
        wide.extend_from_slice(&[0x11; 32]);
        assert_eq!(ClearValue::Uint(wide).as_word(), Some([0x11; 32]));
    }
}
