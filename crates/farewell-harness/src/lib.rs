//! Deterministic simulation harness for Farewell client testing.
//!
//! In-memory implementations of every external collaborator the client core
//! talks to, so loader, relocation and recovery behavior can be exercised
//! end to end without a browser, a chain or a relayer.
//!
//! # Components
//!
//! - [`SimHost`]: page location, globals and `<script>` elements with
//!   scripted load behavior
//! - [`SimNetwork`] / [`SimInstantiator`]: the platform's `fetch` and
//!   `instantiateStreaming`, recording every call
//! - [`SimSdk`] / [`SimInstance`]: an SDK entry object whose initializer
//!   loads WASM through the platform, and a claim-gated decryption service
//! - [`SimContract`]: stores messages and grants decryption on claim

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_contract;
pub mod sim_host;
pub mod sim_network;
pub mod sim_sdk;

pub use sim_contract::SimContract;
pub use sim_host::{ScriptBehavior, SimHost};
pub use sim_network::{SimInstantiator, SimNetwork, WASM_MAGIC};
pub use sim_sdk::{SDK_WASM_PATHS, SimInstance, SimSdk, sepolia_preset};
