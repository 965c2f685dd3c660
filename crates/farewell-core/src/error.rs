//! Error types for the Farewell client core.
//!
//! Each layer has its own strongly-typed error (loader, protocol), and all of
//! them fold into [`FarewellError`] for callers that only want to branch on
//! [`ErrorKind`]. Branching on message text is never required.

use farewell_crypto::CryptoError;
use thiserror::Error;

/// Failure reported by the confidential-compute SDK.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sdk error: {0}")]
pub struct SdkError(pub String);

/// Failure reported by the Farewell contract binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("contract call failed: {0}")]
pub struct ContractError(pub String);

/// Text is not a `0x`-prefixed 20-byte hex address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid address: {reason}")]
pub struct AddressParseError {
    /// Why the text was rejected
    pub reason: String,
}

/// Errors from the SDK loader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// No browser-like context (no global window), e.g. server-side
    /// rendering
    #[error("no browser environment available")]
    EnvironmentError,

    /// The global SDK object is missing or lacks a required member
    #[error("global `{global}` is not a valid SDK handle")]
    InvalidSdkShape {
        /// Name of the global that was inspected
        global: String,
    },

    /// The SDK script could not be fetched or executed
    #[error("failed to load SDK script from {url}: {reason}")]
    ScriptLoadFailed {
        /// URL that was attempted
        url: String,
        /// Platform-reported cause
        reason: String,
    },

    /// SDK initialization or instance creation failed
    #[error(transparent)]
    Sdk(#[from] SdkError),
}

impl LoaderError {
    /// Returns true if a later `load()` may succeed (after network recovery
    /// or a page reload). A missing browser context never recovers.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::EnvironmentError)
    }
}

/// Errors from the retrieve-and-recover protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Contract read failed
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Confidential-compute decryption failed (e.g. no claim granted)
    #[error(transparent)]
    Sdk(#[from] SdkError),

    /// The decrypted values did not match the requested handles
    #[error("malformed decryption result: {reason}")]
    MalformedClearValues {
        /// What was wrong
        reason: String,
    },

    /// Key recovery or payload decryption failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Closed set of failure kinds callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Non-hex character in textual input
    InvalidHexFormat,
    /// More than 32 hex digits
    TooManyDigits,
    /// Raw key not 16 bytes
    InvalidKeyLength,
    /// Exported key not 16 bytes
    ExportLengthMismatch,
    /// Packed value shorter than IV plus tag
    CiphertextTooShort,
    /// Tag did not verify
    AuthenticationFailed,
    /// Loader used outside a browser context
    EnvironmentError,
    /// SDK global has the wrong shape
    InvalidSdkShape,
    /// SDK script failed to load
    ScriptLoadFailed,
    /// Contract collaborator failed
    Contract,
    /// SDK collaborator failed
    Sdk,
}

impl From<&CryptoError> for ErrorKind {
    fn from(err: &CryptoError) -> Self {
        match err {
            CryptoError::InvalidHexFormat => Self::InvalidHexFormat,
            CryptoError::TooManyDigits { .. } => Self::TooManyDigits,
            CryptoError::InvalidKeyLength { .. } => Self::InvalidKeyLength,
            CryptoError::ExportLengthMismatch { .. } => Self::ExportLengthMismatch,
            CryptoError::CiphertextTooShort { .. } => Self::CiphertextTooShort,
            CryptoError::AuthenticationFailed => Self::AuthenticationFailed,
        }
    }
}

/// Any error the client core can raise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarewellError {
    /// Codec, key or cipher failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// SDK loader failure
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Retrieve/recover failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl FarewellError {
    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(err) | Self::Protocol(ProtocolError::Crypto(err)) => err.into(),
            Self::Loader(LoaderError::EnvironmentError) => ErrorKind::EnvironmentError,
            Self::Loader(LoaderError::InvalidSdkShape { .. }) => ErrorKind::InvalidSdkShape,
            Self::Loader(LoaderError::ScriptLoadFailed { .. }) => ErrorKind::ScriptLoadFailed,
            Self::Loader(LoaderError::Sdk(_))
            | Self::Protocol(ProtocolError::Sdk(_) | ProtocolError::MalformedClearValues { .. }) => {
                ErrorKind::Sdk
            },
            Self::Protocol(ProtocolError::Contract(_)) => ErrorKind::Contract,
        }
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// Malformed input needs correction first, programmer errors are fatal
    /// and integrity failures must never be retried with altered parameters.
    /// Only external-dependency failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidSdkShape
                | ErrorKind::ScriptLoadFailed
                | ErrorKind::Contract
                | ErrorKind::Sdk
        )
    }

    /// Text safe to show to the user.
    ///
    /// All integrity failures share one message so the UI cannot tell a
    /// wrong key from a tampered ciphertext.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidHexFormat => "invalid hex value",
            ErrorKind::TooManyDigits => "value is longer than 128 bits",
            ErrorKind::InvalidKeyLength
            | ErrorKind::ExportLengthMismatch
            | ErrorKind::CiphertextTooShort
            | ErrorKind::AuthenticationFailed => "decryption failed",
            ErrorKind::EnvironmentError => "not available outside the browser",
            ErrorKind::InvalidSdkShape | ErrorKind::ScriptLoadFailed => {
                "could not load the encryption SDK"
            },
            ErrorKind::Contract => "contract call failed",
            ErrorKind::Sdk => "confidential decryption failed",
        }
    }
}
