//! XOR secret splitting of message keys.
//!
//! `sk = s XOR s′`. The on-chain share `s` is stored in the
//! confidential-compute domain as a 128-bit integer; the off-chain share `s′`
//! stays with the user until it is delivered to the recipient.

use crate::{
    cipher::{
        PackedCiphertext, SymmetricKey, encrypt_with_aad, generate_key, integer_to_key,
        key_to_integer,
    },
    entropy::Entropy,
    hex128::Hex128,
};

/// The two halves of a message key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShares {
    /// Share `s`, entrusted to the confidential-compute domain.
    pub onchain: Hex128,
    /// Share `s′`, delivered to the recipient out of band.
    pub offchain: Hex128,
}

impl KeyShares {
    /// Recombine the shares into the key.
    pub fn recover(&self) -> SymmetricKey {
        recover_key(self.onchain, self.offchain)
    }

    /// True if either share is zero.
    ///
    /// A zero share adds no protection: the key equals the other share.
    /// Accepted as a user choice, never as a silent default.
    pub fn is_degenerate(&self) -> bool {
        self.onchain.is_zero() || self.offchain.is_zero()
    }
}

/// XOR two shares.
pub fn combine_shares(a: Hex128, b: Hex128) -> Hex128 {
    Hex128::new(a.value() ^ b.value())
}

/// Split `key` using a fresh uniformly random off-chain share.
pub fn split_key(key: &SymmetricKey, entropy: &impl Entropy) -> KeyShares {
    let offchain = Hex128::new(u128::from_be_bytes(entropy.random_128()));
    split_key_with(key, offchain)
}

/// Split `key` around a caller-chosen off-chain share.
///
/// A zero `offchain` puts the whole key on chain (see
/// [`KeyShares::is_degenerate`]).
pub fn split_key_with(key: &SymmetricKey, offchain: Hex128) -> KeyShares {
    let sk = Hex128::new(key_to_integer(key));
    KeyShares { onchain: combine_shares(sk, offchain), offchain }
}

/// Rebuild the key from both shares.
pub fn recover_key(onchain: Hex128, offchain: Hex128) -> SymmetricKey {
    integer_to_key(combine_shares(onchain, offchain).value())
}

/// Output of [`seal_message`]: what goes on chain and what goes to the
/// recipient.
#[derive(Debug, Clone)]
pub struct SealedMessage {
    /// Packed ciphertext, submitted as the contract payload.
    pub payload: PackedCiphertext,
    /// Key shares. `onchain` is encrypted into the confidential-compute
    /// domain by the caller, `offchain` is handed to the recipient.
    pub shares: KeyShares,
}

/// Encrypt a message under a fresh key and split that key.
///
/// The key itself is dropped (and zeroized) before returning; only the
/// shares survive.
pub fn seal_message(plaintext: &[u8], entropy: &impl Entropy) -> SealedMessage {
    let key = generate_key(entropy);
    let payload = encrypt_with_aad(plaintext, &key, None, entropy);
    let shares = split_key(&key, entropy);
    SealedMessage { payload, shares }
}

/// Like [`seal_message`] but with a user-supplied off-chain share.
pub fn seal_message_with_share(
    plaintext: &[u8],
    offchain: Hex128,
    entropy: &impl Entropy,
) -> SealedMessage {
    let key = generate_key(entropy);
    let payload = encrypt_with_aad(plaintext, &key, None, entropy);
    let shares = split_key_with(&key, offchain);
    SealedMessage { payload, shares }
}
