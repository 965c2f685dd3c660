//! Authenticated encryption using AES-128-GCM
//!
//! # Packed Format
//!
//! ```text
//! [IV (12 bytes) | ciphertext (variable) | tag (16 bytes)]
//! ```
//!
//! This is the layout Web Crypto's `AES-GCM` produces when the IV is
//! prepended, and it is stored verbatim as the contract's `bytes payload`.
//! Textual form is `0x` followed by lowercase hex, two digits per byte.

use aes_gcm::{
    Aes128Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::Zeroize;

use crate::{entropy::Entropy, error::CryptoError};

/// AES-128 key size (16 bytes)
pub const KEY_SIZE: usize = 16;

/// GCM IV size (12 bytes)
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Smallest well-formed packed value: IV plus tag over an empty plaintext.
pub const MIN_PACKED_SIZE: usize = IV_SIZE + TAG_SIZE;

/// A 128-bit AES-GCM key.
///
/// Always exactly 16 bytes. Zeroized on drop and redacted in `Debug` output;
/// the only ways to observe the material are [`export_key`] and
/// [`key_to_integer`].
#[derive(Clone)]
pub struct SymmetricKey {
    material: Key<Aes128Gcm>,
}

impl SymmetricKey {
    fn from_array(raw: &[u8; KEY_SIZE]) -> Self {
        Self { material: Key::<Aes128Gcm>::clone_from_slice(raw) }
    }

    fn cipher(&self) -> Aes128Gcm {
        Aes128Gcm::new(&self.material)
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.material.as_mut_slice().zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Generate a fresh random key.
pub fn generate_key(entropy: &impl Entropy) -> SymmetricKey {
    let mut raw = entropy.random_128();
    let key = SymmetricKey::from_array(&raw);
    raw.zeroize();
    key
}

/// Import raw key bytes.
///
/// # Errors
///
/// - `InvalidKeyLength`: `raw` is not exactly 16 bytes
pub fn import_key(raw: &[u8]) -> Result<SymmetricKey, CryptoError> {
    if raw.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength { actual: raw.len() });
    }
    Ok(SymmetricKey { material: Key::<Aes128Gcm>::clone_from_slice(raw) })
}

/// Export raw key bytes. Inverse of [`import_key`].
///
/// # Errors
///
/// - `ExportLengthMismatch`: the underlying material is not 16 bytes
pub fn export_key(key: &SymmetricKey) -> Result<[u8; KEY_SIZE], CryptoError> {
    <[u8; KEY_SIZE]>::try_from(key.material.as_slice())
        .map_err(|_| CryptoError::ExportLengthMismatch { actual: key.material.len() })
}

/// Raw key bytes as a big-endian 128-bit integer.
///
/// This is the representation the on-chain share takes inside the
/// confidential-compute domain (`euint128`).
pub fn key_to_integer(key: &SymmetricKey) -> u128 {
    let mut raw = [0u8; KEY_SIZE];
    raw.copy_from_slice(key.material.as_slice());
    let value = u128::from_be_bytes(raw);
    raw.zeroize();
    value
}

/// Big-endian 128-bit integer as a key. Inverse of [`key_to_integer`].
pub fn integer_to_key(value: u128) -> SymmetricKey {
    let mut raw = value.to_be_bytes();
    let key = SymmetricKey::from_array(&raw);
    raw.zeroize();
    key
}

/// Packed `IV || ciphertext || tag` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedCiphertext {
    bytes: Vec<u8>,
}

impl PackedCiphertext {
    /// Wrap bytes as read from the contract. Length is checked on decrypt.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode canonical hex text.
    ///
    /// Only `0x`-prefixed, lowercase, even-length text is accepted. Any other
    /// casing or prefix convention is rejected so that values round-trip
    /// byte-for-byte through the UI.
    ///
    /// # Errors
    ///
    /// - `InvalidHexFormat`: missing prefix, uppercase, odd length or a
    ///   non-hex character
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let digits = text.strip_prefix("0x").ok_or(CryptoError::InvalidHexFormat)?;

        if !digits.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(CryptoError::InvalidHexFormat);
        }

        let bytes = hex::decode(digits).map_err(|_| CryptoError::InvalidHexFormat)?;
        Ok(Self { bytes })
    }

    /// Canonical `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }

    /// All packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into packed bytes (the on-chain payload).
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total packed length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Leading 12-byte IV. `None` if the value is too short to hold one.
    pub fn iv(&self) -> Option<&[u8]> {
        self.bytes.get(..IV_SIZE)
    }

    /// Ciphertext with trailing tag. `None` if the value is too short.
    pub fn sealed(&self) -> Option<&[u8]> {
        if self.bytes.len() < MIN_PACKED_SIZE {
            return None;
        }
        self.bytes.get(IV_SIZE..)
    }

    /// Plaintext length implied by the packed length.
    pub fn plaintext_len(&self) -> usize {
        self.bytes.len().saturating_sub(MIN_PACKED_SIZE)
    }
}

/// Decrypted payload.
///
/// Zeroized on drop. Text access is either strict ([`Plaintext::text`]) or
/// best-effort ([`Plaintext::text_lossy`]); neither can fail the decrypt.
#[derive(Clone, PartialEq, Eq)]
pub struct Plaintext {
    bytes: Vec<u8>,
}

impl Plaintext {
    /// Raw decrypted bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Move the bytes out. The caller takes over responsibility for them.
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Bytes as UTF-8, or `None` if they are not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Bytes as UTF-8 with invalid sequences replaced by U+FFFD.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl Drop for Plaintext {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plaintext").field("len", &self.bytes.len()).finish()
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey, entropy: &impl Entropy) -> PackedCiphertext {
    encrypt_with_aad(plaintext, key, None, entropy)
}

/// Encrypt a UTF-8 string. Same as [`encrypt`] over its bytes.
pub fn encrypt_str(
    plaintext: &str,
    key: &SymmetricKey,
    entropy: &impl Entropy,
) -> PackedCiphertext {
    encrypt(plaintext.as_bytes(), key, entropy)
}

/// Encrypt with optional associated data bound into the tag.
///
/// # Security
///
/// - A new IV is drawn from `entropy` on every call; IVs are never reused
///   for the same key as long as `entropy` is cryptographically secure
/// - `key` is not modified
pub fn encrypt_with_aad(
    plaintext: &[u8],
    key: &SymmetricKey,
    aad: Option<&[u8]>,
    entropy: &impl Entropy,
) -> PackedCiphertext {
    let mut iv = [0u8; IV_SIZE];
    entropy.fill_bytes(&mut iv);

    let payload = Payload { msg: plaintext, aad: aad.unwrap_or_default() };
    let Ok(sealed) = key.cipher().encrypt(Nonce::from_slice(&iv), payload) else {
        unreachable!("AES-GCM encryption cannot fail below the 64 GiB plaintext limit");
    };

    let mut bytes = Vec::with_capacity(IV_SIZE + sealed.len());
    bytes.extend_from_slice(&iv);
    bytes.extend_from_slice(&sealed);

    PackedCiphertext { bytes }
}

/// Decrypt a packed value.
///
/// # Errors
///
/// - `CiphertextTooShort`: fewer than 28 bytes
/// - `AuthenticationFailed`: tag did not verify (wrong key, altered IV,
///   altered ciphertext or mismatched `aad`)
pub fn decrypt(
    packed: &PackedCiphertext,
    key: &SymmetricKey,
    aad: Option<&[u8]>,
) -> Result<Plaintext, CryptoError> {
    if packed.bytes.len() < MIN_PACKED_SIZE {
        return Err(CryptoError::CiphertextTooShort { actual: packed.bytes.len() });
    }

    let (iv, sealed) = packed.bytes.split_at(IV_SIZE);
    let payload = Payload { msg: sealed, aad: aad.unwrap_or_default() };

    key.cipher()
        .decrypt(Nonce::from_slice(iv), payload)
        .map(|bytes| Plaintext { bytes })
        .map_err(|_| CryptoError::AuthenticationFailed)
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

    fn test_key(seed: u8) -> SymmetricKey {
        let mut raw = [0u8; KEY_SIZE];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8);
        }
        import_key(&raw).unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key(1);
        let packed = encrypt(b"Hello, World!", &key, &FixedEntropy(0xAB));
        let plaintext = decrypt(&packed, &key, None).unwrap();

        assert_eq!(plaintext.as_bytes(), b"Hello, World!");
        assert_eq!(plaintext.text(), Some("Hello, World!"));
    }

    #[test]
    fn encrypt_decrypt_empty_message() {
        let key = test_key(2);
        let packed = encrypt(b"", &key, &FixedEntropy(0));

        assert_eq!(packed.len(), MIN_PACKED_SIZE);
        assert!(decrypt(&packed, &key, None).unwrap().as_bytes().is_empty());
    }

    #[test]
    fn encrypt_decrypt_large_message() {
        let key = test_key(3);
        let plaintext = vec![0x42u8; 64 * 1024];
        let packed = encrypt(&plaintext, &key, &FixedEntropy(0xFF));

        assert_eq!(decrypt(&packed, &key, None).unwrap().as_bytes(), plaintext.as_slice());
    }

    // AES-GCM test case 2 (zero key, zero IV, one zero block)
    #[test]
    fn matches_known_answer_vector() {
        let key = import_key(&[0u8; KEY_SIZE]).unwrap();
        let packed = encrypt(&[0u8; 16], &key, &FixedEntropy(0));

        let expected = concat!(
            "0x",
            "000000000000000000000000",
            "0388dace60b6a392f328c2b971b2fe78",
            "ab6e47d42cec13bdf53a67b21257bddf",
        );
        assert_eq!(packed.to_hex(), expected);
    }

    #[test]
    fn packed_layout_is_iv_then_sealed() {
        let key = test_key(4);
        let packed = encrypt(b"layout", &key, &FixedEntropy(0x11));

        assert_eq!(packed.iv(), Some(&[0x11u8; IV_SIZE][..]));
        assert_eq!(packed.sealed().map(<[u8]>::len), Some(b"layout".len() + TAG_SIZE));
        assert_eq!(packed.plaintext_len(), b"layout".len());
    }

    #[test]
    fn different_iv_produces_different_ciphertext() {
        let key = test_key(5);
        let a = encrypt(b"same", &key, &FixedEntropy(0x00));
        let b = encrypt(b"same", &key, &FixedEntropy(0x01));

        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let packed = encrypt(b"secret message", &test_key(6), &FixedEntropy(0));
        let result = decrypt(&packed, &test_key(7), None);

        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = test_key(8);
        let mut bytes = encrypt(b"original message", &key, &FixedEntropy(0)).into_bytes();
        bytes[IV_SIZE] ^= 0x01;

        let result = decrypt(&PackedCiphertext::from_bytes(bytes), &key, None);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_iv_fails_authentication() {
        let key = test_key(9);
        let mut bytes = encrypt(b"original message", &key, &FixedEntropy(0)).into_bytes();
        bytes[0] ^= 0x80;

        let result = decrypt(&PackedCiphertext::from_bytes(bytes), &key, None);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_tag_fails_authentication() {
        let key = test_key(10);
        let mut bytes = encrypt(b"original message", &key, &FixedEntropy(0)).into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let result = decrypt(&PackedCiphertext::from_bytes(bytes), &key, None);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn associated_data_must_match() {
        let key = test_key(11);
        let packed = encrypt_with_aad(b"bound", &key, Some(b"owner:1"), &FixedEntropy(3));

        assert!(decrypt(&packed, &key, Some(b"owner:1")).is_ok());
        assert_eq!(decrypt(&packed, &key, Some(b"owner:2")), Err(CryptoError::AuthenticationFailed));
        assert_eq!(decrypt(&packed, &key, None), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn short_packed_value_is_rejected() {
        let key = test_key(12);
        let packed = PackedCiphertext::from_bytes(vec![0u8; MIN_PACKED_SIZE - 1]);

        assert_eq!(
            decrypt(&packed, &key, None),
            Err(CryptoError::CiphertextTooShort { actual: MIN_PACKED_SIZE - 1 })
        );
    }

    #[test]
    fn import_rejects_wrong_length() {
        assert_eq!(import_key(&[0u8; 15]).unwrap_err(), CryptoError::InvalidKeyLength { actual: 15 });
        assert_eq!(import_key(&[0u8; 32]).unwrap_err(), CryptoError::InvalidKeyLength { actual: 32 });
    }

    #[test]
    fn export_returns_imported_bytes() {
        let raw = *b"0123456789abcdef";
        let key = import_key(&raw).unwrap();
        assert_eq!(export_key(&key).unwrap(), raw);
    }

    #[test]
    fn key_integer_bridge_is_big_endian() {
        let key = import_key(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x02]).unwrap();
        assert_eq!(key_to_integer(&key), 0x0102);
        assert_eq!(export_key(&integer_to_key(0x0102)).unwrap(), export_key(&key).unwrap());
    }

    #[test]
    fn generated_key_uses_entropy() {
        let key = generate_key(&FixedEntropy(0x77));
        assert_eq!(export_key(&key).unwrap(), [0x77; KEY_SIZE]);
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = import_key(&[0xAA; KEY_SIZE]).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("170"));
        assert!(!rendered.to_lowercase().contains("aa"));
    }

    #[test]
    fn hex_roundtrip_is_canonical() {
        let packed = encrypt(b"hex", &test_key(13), &FixedEntropy(0x0F));
        let hex = packed.to_hex();

        assert!(hex.starts_with("0x"));
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(PackedCiphertext::from_hex(&hex).unwrap(), packed);
    }

    #[test]
    fn from_hex_is_strict() {
        assert_eq!(PackedCiphertext::from_hex("abcd"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(PackedCiphertext::from_hex("0XABCD"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(PackedCiphertext::from_hex("0xABCD"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(PackedCiphertext::from_hex("0xabc"), Err(CryptoError::InvalidHexFormat));
        assert_eq!(PackedCiphertext::from_hex("0xzz"), Err(CryptoError::InvalidHexFormat));
        assert!(PackedCiphertext::from_hex("0x").unwrap().is_empty());
    }

    #[test]
    fn lossy_text_never_fails() {
        let key = test_key(14);
        let packed = encrypt(&[0xFF, 0xFE, b'o', b'k'], &key, &FixedEntropy(0));
        let plaintext = decrypt(&packed, &key, None).unwrap();

        assert_eq!(plaintext.text(), None);
        assert!(plaintext.text_lossy().ends_with("ok"));
    }
}
