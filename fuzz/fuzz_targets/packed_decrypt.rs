//! Fuzz target for packed ciphertext decoding and decryption
//!
//! # Strategy
//!
//! - Arbitrary bytes as a packed value, with and without a valid seal
//! - Arbitrary text through the strict hex decoder
//! - Single-bit corruption of a genuine packed value
//!
//! # Invariants
//!
//! - Never panics
//! - Values shorter than IV + tag are rejected as too short
//! - A corrupted seal never authenticates

#![no_main]

use arbitrary::Arbitrary;
use farewell_crypto::{
    CryptoError, Entropy, MIN_PACKED_SIZE, PackedCiphertext, decrypt, encrypt, integer_to_key,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    key: u128,
    iv_seed: u8,
    plaintext: Vec<u8>,
    raw: Vec<u8>,
    text: String,
    flip_bit: u16,
}

/// Deterministic IV source so crashes reproduce.
struct Seeded(u8);

impl Entropy for Seeded {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(self.0);
    }
}

fuzz_target!(|input: Input| {
    let key = integer_to_key(input.key);

    let raw = PackedCiphertext::from_bytes(input.raw);
    match decrypt(&raw, &key, None) {
        Err(CryptoError::CiphertextTooShort { actual }) => assert!(actual < MIN_PACKED_SIZE),
        Err(CryptoError::AuthenticationFailed) => assert!(raw.len() >= MIN_PACKED_SIZE),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => {},
    }

    if let Ok(packed) = PackedCiphertext::from_hex(&input.text) {
        assert_eq!(packed.to_hex(), input.text);
        let _ = decrypt(&packed, &key, None);
    }

    let sealed = encrypt(&input.plaintext, &key, &Seeded(input.iv_seed));
    let opened = decrypt(&sealed, &key, None).map(|p| p.into_bytes());
    assert_eq!(opened.as_deref(), Ok(input.plaintext.as_slice()));

    let mut corrupted = sealed.into_bytes();
    let bit = usize::from(input.flip_bit) % (corrupted.len() * 8);
    corrupted[bit / 8] ^= 1 << (bit % 8);
    let corrupted = PackedCiphertext::from_bytes(corrupted);
    assert_eq!(decrypt(&corrupted, &key, None).map(|_| ()), Err(CryptoError::AuthenticationFailed));
});
