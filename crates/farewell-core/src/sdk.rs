//! Confidential-compute SDK contract.
//!
//! The SDK is a third-party bundle that assigns an entry object to a global.
//! Nothing about it is trusted until [`is_valid_sdk_handle`] has checked its
//! shape: an initializer, an instance factory and a named network preset,
//! plus an optional boolean "already initialized" flag.

use std::rc::Rc;

use async_trait::async_trait;

use crate::{
    error::SdkError,
    types::{Address, CiphertextHandle, ClearValue},
};

/// Initializer member.
pub const INIT_MEMBER: &str = "initSDK";

/// Instance factory member.
pub const CREATE_INSTANCE_MEMBER: &str = "createInstance";

/// Default network-configuration preset member.
pub const DEFAULT_NETWORK_PRESET: &str = "SepoliaConfig";

/// Optional flag set once the SDK has been initialized.
pub const INITIALIZED_FLAG: &str = "__initialized__";

/// Runtime type of a member of the SDK entry object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Property absent (`undefined`)
    Missing,
    /// Callable
    Function,
    /// Non-null object
    Object,
    /// Boolean with its value
    Boolean(bool),
    /// Anything else (number, string, null, ...)
    Other,
}

/// Value of a property of the global object.
#[derive(Clone)]
pub enum GlobalValue {
    /// Property absent
    Undefined,
    /// `null`
    Null,
    /// Non-object value (number, string, boolean, function)
    Primitive,
    /// An object, possibly the SDK entry
    Object(Rc<dyn RelayerSdk>),
}

impl std::fmt::Debug for GlobalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Primitive => f.write_str("Primitive"),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// A network-configuration preset exported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPreset {
    /// Export name (`SepoliaConfig`)
    pub name: String,
    /// Host chain id
    pub chain_id: u64,
    /// Relayer endpoint
    pub relayer_url: String,
    /// Access-control contract
    pub acl_contract: Address,
}

/// Configuration passed to the instance factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    /// JSON-RPC endpoint of the host chain
    pub network_url: String,
    /// Public key material of the confidential-compute network, if cached
    pub public_key: Option<Vec<u8>>,
    /// Preset name to build on
    pub preset: String,
}

impl InstanceConfig {
    /// Config on `network_url` using the default preset.
    pub fn new(network_url: impl Into<String>) -> Self {
        Self {
            network_url: network_url.into(),
            public_key: None,
            preset: DEFAULT_NETWORK_PRESET.to_string(),
        }
    }
}

/// The SDK entry object.
#[async_trait(?Send)]
pub trait RelayerSdk {
    /// Runtime type of a member, for shape validation.
    fn member(&self, name: &str) -> MemberKind;

    /// Load the SDK's WASM modules. Must precede `create_instance`.
    async fn init_sdk(&self) -> Result<(), SdkError>;

    /// Look up an exported network preset.
    fn network_preset(&self, name: &str) -> Option<NetworkPreset>;

    /// Create a confidential-compute instance.
    async fn create_instance(
        &self,
        config: InstanceConfig,
    ) -> Result<Rc<dyn ConfidentialCompute>, SdkError>;
}

/// A ready confidential-compute instance.
#[async_trait(?Send)]
pub trait ConfidentialCompute {
    /// Decrypt access-gated values for the connected user.
    ///
    /// Succeeds only if the contract has granted the user permission on
    /// every handle (the "claim"). Results are in handle order.
    async fn user_decrypt(
        &self,
        contract: &Address,
        handles: &[CiphertextHandle],
    ) -> Result<Vec<ClearValue>, SdkError>;
}

/// True if `value` is a structurally valid SDK entry object exporting
/// `preset`.
pub fn is_valid_sdk_handle(value: &GlobalValue, preset: &str) -> bool {
    let GlobalValue::Object(sdk) = value else {
        return false;
    };

    let required = sdk.member(INIT_MEMBER) == MemberKind::Function
        && sdk.member(CREATE_INSTANCE_MEMBER) == MemberKind::Function
        && sdk.member(preset) == MemberKind::Object;

    let flag_ok =
        matches!(sdk.member(INITIALIZED_FLAG), MemberKind::Missing | MemberKind::Boolean(_));

    required && flag_ok
}

/// A validated SDK entry object.
#[derive(Clone)]
pub struct SdkHandle {
    sdk: Rc<dyn RelayerSdk>,
}

impl SdkHandle {
    /// Validate `value` and wrap it.
    pub fn from_global(value: &GlobalValue, preset: &str) -> Option<Self> {
        if !is_valid_sdk_handle(value, preset) {
            return None;
        }
        match value {
            GlobalValue::Object(sdk) => Some(Self { sdk: Rc::clone(sdk) }),
            GlobalValue::Undefined | GlobalValue::Null | GlobalValue::Primitive => None,
        }
    }

    /// The entry object.
    pub fn sdk(&self) -> &dyn RelayerSdk {
        self.sdk.as_ref()
    }

    /// True if the SDK reports it has already been initialized.
    pub fn is_initialized(&self) -> bool {
        self.sdk.member(INITIALIZED_FLAG) == MemberKind::Boolean(true)
    }

    /// True if both handles refer to the same entry object.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.sdk, &other.sdk)
    }
}

impl std::fmt::Debug for SdkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkHandle").field("initialized", &self.is_initialized()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct ShapeOnly(HashMap<&'static str, MemberKind>);

    impl ShapeOnly {
        fn valid() -> Self {
            Self(HashMap::from([
                (INIT_MEMBER, MemberKind::Function),
                (CREATE_INSTANCE_MEMBER, MemberKind::Function),
                (DEFAULT_NETWORK_PRESET, MemberKind::Object),
            ]))
        }

        fn with(mut self, name: &'static str, kind: MemberKind) -> Self {
            self.0.insert(name, kind);
            self
        }

        fn into_global(self) -> GlobalValue {
            GlobalValue::Object(Rc::new(self))
        }
    }

    #[async_trait(?Send)]
    impl RelayerSdk for ShapeOnly {
        fn member(&self, name: &str) -> MemberKind {
            self.0.get(name).copied().unwrap_or(MemberKind::Missing)
        }

        async fn init_sdk(&self) -> Result<(), SdkError> {
            Ok(())
        }

        fn network_preset(&self, _name: &str) -> Option<NetworkPreset> {
            None
        }

        async fn create_instance(
            &self,
            _config: InstanceConfig,
        ) -> Result<Rc<dyn ConfidentialCompute>, SdkError> {
            Err(SdkError("shape only".to_string()))
        }
    }

    #[test]
    fn accepts_complete_shape() {
        assert!(is_valid_sdk_handle(&ShapeOnly::valid().into_global(), DEFAULT_NETWORK_PRESET));
    }

    #[test]
    fn rejects_non_objects() {
        for value in [GlobalValue::Undefined, GlobalValue::Null, GlobalValue::Primitive] {
            assert!(!is_valid_sdk_handle(&value, DEFAULT_NETWORK_PRESET));
        }
    }

    #[test]
    fn rejects_missing_members() {
        for name in [INIT_MEMBER, CREATE_INSTANCE_MEMBER, DEFAULT_NETWORK_PRESET] {
            let sdk = ShapeOnly::valid().with(name, MemberKind::Missing);
            assert!(!is_valid_sdk_handle(&sdk.into_global(), DEFAULT_NETWORK_PRESET), "{name}");
        }
    }

    #[test]
    fn rejects_wrong_member_types() {
        let init_object = ShapeOnly::valid().with(INIT_MEMBER, MemberKind::Object);
        assert!(!is_valid_sdk_handle(&init_object.into_global(), DEFAULT_NETWORK_PRESET));

        let preset_function = ShapeOnly::valid().with(DEFAULT_NETWORK_PRESET, MemberKind::Function);
        assert!(!is_valid_sdk_handle(&preset_function.into_global(), DEFAULT_NETWORK_PRESET));
    }

    #[test]
    fn initialized_flag_must_be_boolean_when_present() {
        let flagged = ShapeOnly::valid().with(INITIALIZED_FLAG, MemberKind::Boolean(false));
        assert!(is_valid_sdk_handle(&flagged.into_global(), DEFAULT_NETWORK_PRESET));

        let bogus = ShapeOnly::valid().with(INITIALIZED_FLAG, MemberKind::Other);
        assert!(!is_valid_sdk_handle(&bogus.into_global(), DEFAULT_NETWORK_PRESET));
    }

    #[test]
    fn handle_reports_initialized_flag() {
        let sdk = ShapeOnly::valid().with(INITIALIZED_FLAG, MemberKind::Boolean(true));
        let handle = SdkHandle::from_global(&sdk.into_global(), DEFAULT_NETWORK_PRESET).unwrap();
        assert!(handle.is_initialized());
    }

    #[test]
    fn preset_name_is_configurable() {
        let sdk = ShapeOnly::valid().with("MainnetConfig", MemberKind::Object);
        let global = sdk.into_global();

        assert!(is_valid_sdk_handle(&global, "MainnetConfig"));
        assert!(!is_valid_sdk_handle(&global, "DevnetConfig"));
    }
}
