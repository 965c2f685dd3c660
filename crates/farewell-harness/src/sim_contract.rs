//! Simulated Farewell contract.
//!
//! Stores messages per owner. Encrypted fields live in the shared
//! [`SimInstance`] vault; a successful [`SimContract::claim`] grants the user
//! decryption rights on exactly the handles of that message.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use async_trait::async_trait;
use farewell_core::{Address, ContractError, FarewellContract, RetrievedMessage, encode_recipient};
use farewell_crypto::SealedMessage;

use crate::sim_sdk::SimInstance;

struct StoredMessage {
    message: RetrievedMessage,
    claimed: bool,
}

struct ContractState {
    address: Address,
    instance: Rc<SimInstance>,
    messages: RefCell<HashMap<Address, Vec<StoredMessage>>>,
    retrievals: RefCell<Vec<(Address, u64)>>,
}

/// In-memory contract. Clones share storage.
#[derive(Clone)]
pub struct SimContract {
    state: Rc<ContractState>,
}

impl SimContract {
    /// Contract at `address` whose encrypted fields live in `instance`.
    pub fn new(address: Address, instance: Rc<SimInstance>) -> Self {
        Self {
            state: Rc::new(ContractState {
                address,
                instance,
                messages: RefCell::new(HashMap::new()),
                retrievals: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Store a raw message for `owner` and return its index.
    pub fn store(&self, owner: Address, message: RetrievedMessage) -> u64 {
        let mut messages = self.state.messages.borrow_mut();
        let list = messages.entry(owner).or_default();
        list.push(StoredMessage { message, claimed: false });
        (list.len() - 1) as u64
    }

    /// Store a sealed message the way the sender's client does: on-chain
    /// share and recipient encrypted, payload in the clear.
    pub fn deposit(
        &self,
        owner: Address,
        sealed: &SealedMessage,
        recipient: &str,
        public_message: Option<&str>,
    ) -> u64 {
        let instance = &self.state.instance;
        let (limbs, recipient_len) = encode_recipient(recipient);

        let message = RetrievedMessage {
            sk_share: instance.encrypt_u128(sealed.shares.onchain.value()),
            recipient_limbs: limbs.into_iter().map(|limb| instance.encrypt_word(limb)).collect(),
            recipient_len,
            payload: sealed.payload.as_bytes().to_vec(),
            public_message: public_message.map(str::to_string),
        };
        self.store(owner, message)
    }

    /// Claim message `index` of `owner`, granting the user decryption of its
    /// share and recipient.
    pub fn claim(&self, owner: &Address, index: u64) -> Result<(), ContractError> {
        let mut messages = self.state.messages.borrow_mut();
        let stored = messages
            .get_mut(owner)
            .and_then(|list| list.get_mut(index as usize))
            .ok_or_else(|| ContractError(format!("no message {index} for {owner}")))?;

        stored.claimed = true;
        let message = &stored.message;
        self.state.instance.allow(self.state.address, message.sk_share);
        for limb in &message.recipient_limbs {
            self.state.instance.allow(self.state.address, *limb);
        }
        Ok(())
    }

    /// True once message `index` of `owner` has been claimed.
    pub fn is_claimed(&self, owner: &Address, index: u64) -> bool {
        self.state
            .messages
            .borrow()
            .get(owner)
            .and_then(|list| list.get(index as usize))
            .is_some_and(|stored| stored.claimed)
    }

    /// Every `retrieve` call, in order.
    pub fn retrievals(&self) -> Vec<(Address, u64)> {
        self.state.retrievals.borrow().clone()
    }
}

#[async_trait(?Send)]
impl FarewellContract for SimContract {
    fn address(&self) -> Address {
        self.state.address
    }

    async fn retrieve(
        &self,
        owner: &Address,
        index: u64,
    ) -> Result<RetrievedMessage, ContractError> {
        self.state.retrievals.borrow_mut().push((*owner, index));

        self.state
            .messages
            .borrow()
            .get(owner)
            .and_then(|list| list.get(index as usize))
            .map(|stored| stored.message.clone())
            .ok_or_else(|| ContractError(format!("no message {index} for {owner}")))
    }
}
