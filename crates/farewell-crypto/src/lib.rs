//! Farewell Cryptographic Primitives
//!
//! Client-side building blocks for the Farewell message-release protocol.
//! Everything here is synchronous and free of I/O. Randomness is drawn
//! through the [`Entropy`] trait so tests can substitute a deterministic
//! source while production uses the OS RNG.
//!
//! # Key Lifecycle
//!
//! A fresh AES-128 key protects exactly one message. The key never leaves the
//! client whole: it is split into two XOR shares, one of which is stored in
//! the confidential-compute domain and released only to an authorized
//! claimer, while the other is handed to the recipient out of band.
//!
//! ```text
//! SymmetricKey sk (16 random bytes)
//!        │
//!        ├──► AES-128-GCM(iv, plaintext) ──► IV || ciphertext || tag  (on chain)
//!        │
//!        ▼
//! s′ = random 128 bits      (off chain, delivered to recipient)
//! s  = sk XOR s′            (confidential-compute domain, claim-gated)
//!
//! recovery: sk = s XOR s′ ──► AES-128-GCM open ──► plaintext
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - Either share alone is uniformly random and reveals nothing about `sk`,
//!   provided the off-chain share is freshly random and used once
//! - A zero share degrades protection to the other share alone; this is
//!   permitted but reported through [`KeyShares::is_degenerate`]
//!
//! Authenticity:
//! - AES-GCM tag covers the ciphertext (and optional associated data)
//! - Every failure to open a packed value is reported as the single
//!   [`CryptoError::AuthenticationFailed`], regardless of cause
//!
//! Nonce discipline:
//! - A fresh random 12-byte IV is drawn for every encryption

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod entropy;
pub mod error;
pub mod hex128;
pub mod shares;

pub use cipher::{
    IV_SIZE, KEY_SIZE, MIN_PACKED_SIZE, PackedCiphertext, Plaintext, SymmetricKey, TAG_SIZE,
    decrypt, encrypt, encrypt_str, encrypt_with_aad, export_key, generate_key, import_key,
    integer_to_key, key_to_integer,
};
pub use entropy::{Entropy, OsEntropy};
pub use error::CryptoError;
pub use hex128::{
    Hex128, fit_be_bytes, format_hex128, mask_be_bytes, parse_hex128, random_hex128,
};
pub use shares::{
    KeyShares, SealedMessage, combine_shares, recover_key, seal_message, seal_message_with_share,
    split_key, split_key_with,
};
