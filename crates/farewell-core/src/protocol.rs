//! Retrieve and key-recovery protocol.
//!
//! Order matters and each step is an interlock for the next:
//!
//! 1. A ready confidential-compute instance and a prior on-chain claim
//! 2. `retrieve(owner, index)` returns handles for the encrypted share and
//!    recipient, plus the packed payload
//! 3. The instance decrypts the share (and recipient) for the claimer
//! 4. `sk = s XOR s′` with the caller's off-chain share
//! 5. The payload is opened with `sk`
//!
//! A failed tag check is reported as `AuthenticationFailed` and never
//! retried with another key guess.

use std::rc::Rc;

use async_trait::async_trait;
use farewell_crypto::{Hex128, PackedCiphertext, Plaintext, decrypt, recover_key};

use crate::{
    error::{ContractError, ProtocolError},
    sdk::ConfidentialCompute,
    types::{Address, CiphertextHandle, ClearValue},
};

/// Bytes carried per recipient limb (`euint256`).
const LIMB_SIZE: usize = 32;

/// One stored message as returned by the contract's `retrieve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedMessage {
    /// Encrypted on-chain key share (`euint128`)
    pub sk_share: CiphertextHandle,
    /// Encrypted recipient identity, 32 bytes per limb
    pub recipient_limbs: Vec<CiphertextHandle>,
    /// Recipient identity length in bytes
    pub recipient_len: u32,
    /// Packed ciphertext bytes
    pub payload: Vec<u8>,
    /// Optional unencrypted note stored with the message
    pub public_message: Option<String>,
}

/// The Farewell contract, as far as recovery needs it.
#[async_trait(?Send)]
pub trait FarewellContract {
    /// Contract address (decryption requests are scoped to it).
    fn address(&self) -> Address;

    /// Read message `index` of `owner`. Access-gated fields come back as
    /// handles.
    async fn retrieve(
        &self,
        owner: &Address,
        index: u64,
    ) -> Result<RetrievedMessage, ContractError>;
}

/// A successfully opened message.
#[derive(Debug)]
pub struct RecoveredMessage {
    /// Message owner
    pub owner: Address,
    /// Message index
    pub index: u64,
    /// Decrypted payload
    pub plaintext: Plaintext,
    /// Recipient identity, best-effort UTF-8
    pub recipient: String,
    /// Unencrypted note, if any
    pub public_message: Option<String>,
    /// True if one of the shares was zero
    pub degenerate_share: bool,
}

impl RecoveredMessage {
    /// Payload bytes.
    pub fn bytes(&self) -> &[u8] {
        self.plaintext.as_bytes()
    }

    /// Payload as text. Invalid UTF-8 degrades to replacement characters.
    pub fn text(&self) -> String {
        self.plaintext.text_lossy()
    }
}

/// Encode a recipient identity into 32-byte limbs plus its length.
///
/// The last limb is zero-padded on the right.
pub fn encode_recipient(recipient: &str) -> (Vec<[u8; LIMB_SIZE]>, u32) {
    let bytes = recipient.as_bytes();
    let limbs = bytes
        .chunks(LIMB_SIZE)
        .map(|chunk| {
            let mut limb = [0u8; LIMB_SIZE];
            limb[..chunk.len()].copy_from_slice(chunk);
            limb
        })
        .collect();
    (limbs, bytes.len() as u32)
}

/// Decode decrypted recipient limbs, truncated to `len` bytes.
///
/// Best effort: non-integer limbs are skipped and invalid UTF-8 is
/// replaced, so this never fails.
pub fn decode_recipient(limbs: &[ClearValue], len: u32) -> String {
    let mut bytes: Vec<u8> = limbs.iter().filter_map(ClearValue::as_word).flatten().collect();
    bytes.truncate(len as usize);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Runs the recovery protocol against a contract with a ready instance.
pub struct Retriever<C> {
    instance: Rc<dyn ConfidentialCompute>,
    contract: C,
}

impl<C: FarewellContract> Retriever<C> {
    /// Retriever over `contract` using a ready `instance`.
    pub fn new(instance: Rc<dyn ConfidentialCompute>, contract: C) -> Self {
        Self { instance, contract }
    }

    /// The contract binding.
    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Retrieve message `index` of `owner` and open it with `offchain`.
    ///
    /// # Errors
    ///
    /// - `Contract`: retrieve failed
    /// - `Sdk`: decryption refused (typically no claim)
    /// - `MalformedClearValues`: the instance answered with the wrong shape
    /// - `Crypto(AuthenticationFailed)`: wrong off-chain share or tampered
    ///   payload
    pub async fn recover(
        &self,
        owner: &Address,
        index: u64,
        offchain: Hex128,
    ) -> Result<RecoveredMessage, ProtocolError> {
        let retrieved = self.contract.retrieve(owner, index).await?;

        let mut handles = Vec::with_capacity(1 + retrieved.recipient_limbs.len());
        handles.push(retrieved.sk_share);
        handles.extend_from_slice(&retrieved.recipient_limbs);

        let clear = self.instance.user_decrypt(&self.contract.address(), &handles).await?;
        if clear.len() != handles.len() {
            return Err(ProtocolError::MalformedClearValues {
                reason: format!("requested {} values, got {}", handles.len(), clear.len()),
            });
        }

        let Some((share, recipient_limbs)) = clear.split_first() else {
            return Err(ProtocolError::MalformedClearValues {
                reason: "empty decryption result".to_string(),
            });
        };
        let onchain = share.as_u128().map(Hex128::new).ok_or_else(|| {
            ProtocolError::MalformedClearValues { reason: "key share is not an integer".to_string() }
        })?;

        let degenerate_share = onchain.is_zero() || offchain.is_zero();
        if degenerate_share {
            tracing::warn!(%owner, index, "zero key share: message protected by one share only");
        }

        let key = recover_key(onchain, offchain);
        let packed = PackedCiphertext::from_bytes(retrieved.payload);
        let plaintext = decrypt(&packed, &key, None)?;

        tracing::debug!(%owner, index, len = plaintext.as_bytes().len(), "message recovered");

        Ok(RecoveredMessage {
            owner: *owner,
            index,
            plaintext,
            recipient: decode_recipient(recipient_limbs, retrieved.recipient_len),
            public_message: retrieved.public_message,
            degenerate_share,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_roundtrip_through_limbs() {
        let email = "recipient-with-a-long-address@example.org";
        let (limbs, len) = encode_recipient(email);

        assert_eq!(limbs.len(), 2);
        assert_eq!(len as usize, email.len());

        let clear: Vec<ClearValue> = limbs.iter().map(|l| ClearValue::Uint(l.to_vec())).collect();
        assert_eq!(decode_recipient(&clear, len), email);
    }

    #[test]
    fn empty_recipient_has_no_limbs() {
        let (limbs, len) = encode_recipient("");
        assert!(limbs.is_empty());
        assert_eq!(len, 0);
        assert_eq!(decode_recipient(&[], 0), "");
    }

    #[test]
    fn decode_tolerates_short_and_invalid_input() {
        let clear = vec![ClearValue::Uint(vec![0xFF, 0xFE]), ClearValue::Bool(true)];
        let decoded = decode_recipient(&clear, 64);

        assert_eq!(decoded.chars().count(), 32);
    }

    #[test]
    fn decode_handles_trimmed_leading_zeros() {
        // A limb whose leading bytes were zero comes back as a shorter integer
        let clear = vec![ClearValue::Uint(b"abc".to_vec())];
        let decoded = decode_recipient(&clear, 32);

        assert!(decoded.ends_with("abc"));
    }
}
