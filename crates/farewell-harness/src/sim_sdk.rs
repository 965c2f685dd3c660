//! Simulated relayer SDK and confidential-compute instance.
//!
//! [`SimSdk`] behaves like the real bundle where it matters for the loader:
//! its initializer fetches its WASM modules from hard-coded root paths
//! through whatever `fetch` and `instantiateStreaming` the platform currently
//! holds. Under a sub-path deployment that only works if relocation is
//! installed.
//!
//! [`SimInstance`] is a vault of encrypted values. Decryption succeeds only
//! for handles the owning contract has granted to the user.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use async_trait::async_trait;
use farewell_core::{
    Address, CiphertextHandle, ClearValue, ConfidentialCompute, FetchRequest, GlobalValue,
    InstanceConfig, MemberKind, NetworkPreset, Platform, RelayerSdk, SdkError, WasmImports,
    WasmSource,
    sdk::{CREATE_INSTANCE_MEMBER, DEFAULT_NETWORK_PRESET, INIT_MEMBER, INITIALIZED_FLAG},
};
use futures::FutureExt;
use url::Url;

/// Root-relative WASM paths the SDK initializer loads.
pub const SDK_WASM_PATHS: [&str; 2] = ["/tfhe_bg.wasm", "/kms_lib_bg.wasm"];

/// Sepolia-like preset served by default.
pub fn sepolia_preset() -> NetworkPreset {
    NetworkPreset {
        name: DEFAULT_NETWORK_PRESET.to_string(),
        chain_id: 11_155_111,
        relayer_url: "https://relayer.testnet.example".to_string(),
        acl_contract: Address([0xAC; 20]),
    }
}

/// Simulated SDK entry object.
pub struct SimSdk {
    platform: Rc<Platform>,
    page: Url,
    instance: Rc<SimInstance>,
    overrides: RefCell<HashMap<String, MemberKind>>,
    presets: RefCell<HashMap<String, NetworkPreset>>,
    reports_initialized: Cell<bool>,
    initialized: Cell<bool>,
    init_calls: Cell<u32>,
    instance_configs: RefCell<Vec<InstanceConfig>>,
}

impl SimSdk {
    /// SDK bound to a page's platform, handing out `instance`.
    pub fn new(platform: Rc<Platform>, page: Url, instance: Rc<SimInstance>) -> Self {
        let presets = HashMap::from([(DEFAULT_NETWORK_PRESET.to_string(), sepolia_preset())]);
        Self {
            platform,
            page,
            instance,
            overrides: RefCell::new(HashMap::new()),
            presets: RefCell::new(presets),
            reports_initialized: Cell::new(false),
            initialized: Cell::new(false),
            init_calls: Cell::new(0),
            instance_configs: RefCell::new(Vec::new()),
        }
    }

    /// This SDK as a global value.
    pub fn global(self: &Rc<Self>) -> GlobalValue {
        GlobalValue::Object(Rc::clone(self) as Rc<dyn RelayerSdk>)
    }

    /// Force the runtime type of a member, e.g. to break the shape.
    pub fn set_member(&self, name: &str, kind: MemberKind) {
        self.overrides.borrow_mut().insert(name.to_string(), kind);
    }

    /// Export an additional preset.
    pub fn add_preset(&self, preset: NetworkPreset) {
        self.presets.borrow_mut().insert(preset.name.clone(), preset);
    }

    /// Expose the boolean "already initialized" flag.
    pub fn report_initialized_flag(&self, enabled: bool) {
        self.reports_initialized.set(enabled);
    }

    /// Times `initSDK` was called.
    pub fn init_calls(&self) -> u32 {
        self.init_calls.get()
    }

    /// True once `initSDK` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Configs passed to `createInstance`, in order.
    pub fn instance_configs(&self) -> Vec<InstanceConfig> {
        self.instance_configs.borrow().clone()
    }

    async fn load_module(&self, path: &str) -> Result<(), SdkError> {
        let url = self.page.join(path).map_err(|err| SdkError(err.to_string()))?;

        let platform = Rc::clone(&self.platform);
        let pending = async move { platform.fetch(FetchRequest::get(url)).await }.boxed_local();

        let imports = WasmImports { namespaces: vec!["wbg".to_string()] };
        self.platform
            .instantiate_streaming(WasmSource::Pending(pending), &imports)
            .await
            .map_err(|err| SdkError(format!("failed to load {path}: {err}")))?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl RelayerSdk for SimSdk {
    fn member(&self, name: &str) -> MemberKind {
        if let Some(kind) = self.overrides.borrow().get(name) {
            return *kind;
        }
        if name == INIT_MEMBER || name == CREATE_INSTANCE_MEMBER {
            return MemberKind::Function;
        }
        if name == INITIALIZED_FLAG && self.reports_initialized.get() {
            return MemberKind::Boolean(self.initialized.get());
        }
        if self.presets.borrow().contains_key(name) {
            return MemberKind::Object;
        }
        MemberKind::Missing
    }

    async fn init_sdk(&self) -> Result<(), SdkError> {
        self.init_calls.set(self.init_calls.get() + 1);
        for path in SDK_WASM_PATHS {
            self.load_module(path).await?;
        }
        self.initialized.set(true);
        Ok(())
    }

    fn network_preset(&self, name: &str) -> Option<NetworkPreset> {
        self.presets.borrow().get(name).cloned()
    }

    async fn create_instance(
        &self,
        config: InstanceConfig,
    ) -> Result<Rc<dyn ConfidentialCompute>, SdkError> {
        if !self.initialized.get() {
            return Err(SdkError("initSDK must complete before createInstance".to_string()));
        }
        if !self.presets.borrow().contains_key(&config.preset) {
            return Err(SdkError(format!("unknown preset {}", config.preset)));
        }

        self.instance_configs.borrow_mut().push(config);
        Ok(Rc::clone(&self.instance) as Rc<dyn ConfidentialCompute>)
    }
}

/// Claim-gated decryption service for a single user.
#[derive(Debug, Default)]
pub struct SimInstance {
    vault: RefCell<HashMap<CiphertextHandle, ClearValue>>,
    grants: RefCell<HashSet<(Address, CiphertextHandle)>>,
    next_handle: Cell<u64>,
    decrypt_calls: Cell<u32>,
}

impl SimInstance {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return a fresh handle to it.
    pub fn encrypt(&self, value: ClearValue) -> CiphertextHandle {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);

        let mut handle = [0u8; 32];
        handle[0] = 0xCE;
        handle[24..].copy_from_slice(&id.to_be_bytes());
        let handle = CiphertextHandle(handle);

        self.vault.borrow_mut().insert(handle, value);
        handle
    }

    /// Store a 128-bit integer (`euint128`).
    pub fn encrypt_u128(&self, value: u128) -> CiphertextHandle {
        self.encrypt(ClearValue::Uint(value.to_be_bytes().to_vec()))
    }

    /// Store a 256-bit word (`euint256`).
    pub fn encrypt_word(&self, word: [u8; 32]) -> CiphertextHandle {
        self.encrypt(ClearValue::Uint(word.to_vec()))
    }

    /// Let the user decrypt `handle` in the scope of `contract`.
    pub fn allow(&self, contract: Address, handle: CiphertextHandle) {
        self.grants.borrow_mut().insert((contract, handle));
    }

    /// Times `user_decrypt` was called.
    pub fn decrypt_calls(&self) -> u32 {
        self.decrypt_calls.get()
    }
}

#[async_trait(?Send)]
impl ConfidentialCompute for SimInstance {
    async fn user_decrypt(
        &self,
        contract: &Address,
        handles: &[CiphertextHandle],
    ) -> Result<Vec<ClearValue>, SdkError> {
        self.decrypt_calls.set(self.decrypt_calls.get() + 1);

        let grants = self.grants.borrow();
        let vault = self.vault.borrow();
        handles
            .iter()
            .map(|handle| {
                if !grants.contains(&(*contract, *handle)) {
                    return Err(SdkError(format!(
                        "user is not authorized to decrypt {handle} on {contract}"
                    )));
                }
                vault
                    .get(handle)
                    .cloned()
                    .ok_or_else(|| SdkError(format!("unknown handle {handle}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimHost;

    fn contract() -> Address {
        Address([0x11; 20])
    }

    #[tokio::test]
    async fn decrypt_requires_grant() {
        let instance = SimInstance::new();
        let handle = instance.encrypt_u128(42);

        assert!(instance.user_decrypt(&contract(), &[handle]).await.is_err());

        instance.allow(contract(), handle);
        let clear = instance.user_decrypt(&contract(), &[handle]).await.unwrap();
        assert_eq!(clear[0].as_u128(), Some(42));
    }

    #[tokio::test]
    async fn grant_is_scoped_to_contract() {
        let instance = SimInstance::new();
        let handle = instance.encrypt_u128(7);
        instance.allow(Address([0x22; 20]), handle);

        assert!(instance.user_decrypt(&contract(), &[handle]).await.is_err());
    }

    #[tokio::test]
    async fn init_loads_wasm_at_root_paths() {
        let host = SimHost::new(Url::parse("https://example.org/").unwrap());
        for path in SDK_WASM_PATHS {
            host.network().serve_wasm(path);
        }
        let sdk = SimSdk::new(
            host.platform_rc(),
            Url::parse("https://example.org/").unwrap(),
            Rc::new(SimInstance::new()),
        );

        sdk.init_sdk().await.unwrap();
        assert!(sdk.is_initialized());
        assert_eq!(host.instantiator().compiled_urls().len(), SDK_WASM_PATHS.len());
    }

    #[tokio::test]
    async fn create_instance_requires_init() {
        let host = SimHost::new(Url::parse("https://example.org/").unwrap());
        let sdk = SimSdk::new(
            host.platform_rc(),
            Url::parse("https://example.org/").unwrap(),
            Rc::new(SimInstance::new()),
        );

        let result = sdk.create_instance(InstanceConfig::new("http://localhost:8545")).await;
        assert!(result.is_err());
    }

    #[test]
    fn flag_reported_only_when_enabled() {
        let host = SimHost::new(Url::parse("https://example.org/").unwrap());
        let sdk = SimSdk::new(
            host.platform_rc(),
            Url::parse("https://example.org/").unwrap(),
            Rc::new(SimInstance::new()),
        );

        assert_eq!(sdk.member(INITIALIZED_FLAG), MemberKind::Missing);
        sdk.report_initialized_flag(true);
        assert_eq!(sdk.member(INITIALIZED_FLAG), MemberKind::Boolean(false));
    }
}
