//! Farewell Core
//!
//! Sans-IO client core for the Farewell message-release protocol. Everything
//! the browser provides (the global object, script elements, `fetch`,
//! `WebAssembly.instantiateStreaming`) is reached through the [`Host`] trait,
//! so the same loader and protocol code runs against a real page binding or
//! against the in-memory host in `farewell-harness`.
//!
//! # Components
//!
//! - [`SdkLoader`]: brings the confidential-compute SDK into the page once,
//!   validates its shape and creates the session instance
//! - [`relocate`]: interceptors that move WASM requests under the deployment
//!   base path
//! - [`Retriever`]: retrieve, decrypt share, recombine, open payload
//!
//! # Loader State Machine
//!
//! ```text
//! ┌───────────┐  load()  ┌─────────┐  valid handle   ┌───────┐
//! │ NotLoaded │─────────>│ Loading │────────────────>│ Ready │
//! └───────────┘          └─────────┘                 └───────┘
//!                          │     ^
//!          script error /  │     │ load() (caller retry)
//!          invalid shape   ↓     │
//!                        ┌────────┐
//!                        │ Failed │
//!                        └────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod protocol;
pub mod relocate;
pub mod sdk;
pub mod types;

pub use config::{BASE_PATH_ENV, BasePath, LoaderConfig};
pub use error::{
    AddressParseError, ContractError, ErrorKind, FarewellError, LoaderError, ProtocolError,
    SdkError,
};
pub use host::{
    Fetch, FetchRequest, FetchResponse, Host, Platform, PlatformError, WasmImports,
    WasmInstantiator, WasmModule, WasmSource,
};
pub use loader::{LoadState, SdkLoader};
pub use protocol::{
    FarewellContract, RecoveredMessage, RetrievedMessage, Retriever, decode_recipient,
    encode_recipient,
};
pub use sdk::{
    ConfidentialCompute, GlobalValue, InstanceConfig, MemberKind, NetworkPreset, RelayerSdk,
    SdkHandle, is_valid_sdk_handle,
};
pub use types::{Address, CiphertextHandle, ClearValue};
