//! Loader configuration and deployment base path.
//!
//! The application may be served under a sub-path (`/farewell`) instead of
//! the domain root. The server side learns the base path at build time from
//! [`BASE_PATH_ENV`]; the page derives it at runtime from its own location
//! with [`BasePath::detect`]. Both must agree or WASM resolution breaks.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

/// Environment variable holding the build-time base path.
pub const BASE_PATH_ENV: &str = "FAREWELL_BASE_PATH";

/// File name of the SDK bundle, served next to the application.
pub const DEFAULT_SCRIPT_NAME: &str = "relayer-sdk-js.umd.cjs";

/// Name of the global the SDK bundle assigns itself to.
pub const DEFAULT_GLOBAL_NAME: &str = "relayerSDK";

/// Characters a URL parser escapes in a path. `%` is left alone so an
/// already-encoded path is not encoded twice.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Normalized deployment sub-path.
///
/// Either empty (root deployment) or a path with a leading `/` and no
/// trailing `/`. Stored percent-encoded, in the form [`Url::path`] returns,
/// so it compares directly against request paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl BasePath {
    /// Root deployment.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Normalize a raw base path. `""`, `"/"` and whitespace mean root.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Self::root();
        }
        Self(format!("/{}", utf8_percent_encode(trimmed, PATH_ENCODE_SET)))
    }

    /// Base path from [`BASE_PATH_ENV`], root if unset.
    pub fn from_env() -> Self {
        std::env::var(BASE_PATH_ENV).map(|raw| Self::new(&raw)).unwrap_or_default()
    }

    /// Runtime detection: `candidate` if `pathname` lies under it, otherwise
    /// root. `pathname` is percent-encoded, as from [`Url::path`].
    pub fn detect(pathname: &str, candidate: &Self) -> Self {
        if !candidate.is_root() && candidate.contains_path(pathname) {
            candidate.clone()
        } else {
            Self::root()
        }
    }

    /// True for root deployment.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized, percent-encoded path (empty for root).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `path` is the base path itself or a path beneath it.
    ///
    /// Segment-aware: `/farewell2/x` is not under `/farewell`. `path` is
    /// percent-encoded, as from [`Url::path`].
    pub fn contains_path(&self, path: &str) -> bool {
        if self.is_root() {
            return true;
        }
        path.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Prefix an origin-relative path with the base path.
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.0)
        } else {
            format!("{}/{path}", self.0)
        }
    }
}

impl std::fmt::Display for BasePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// SDK loader configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Deployment base path
    pub base_path: BasePath,
    /// SDK bundle file name, resolved under the base path
    pub script_name: String,
    /// Global the bundle defines
    pub global_name: String,
    /// Name of the network-configuration preset the SDK must export
    pub network_preset: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_path: BasePath::root(),
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            global_name: DEFAULT_GLOBAL_NAME.to_string(),
            network_preset: crate::sdk::DEFAULT_NETWORK_PRESET.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Default configuration under `base_path`.
    pub fn with_base_path(base_path: BasePath) -> Self {
        Self { base_path, ..Self::default() }
    }

    /// Absolute script URL for a page at `location`.
    pub fn script_url(&self, location: &Url) -> Result<Url, url::ParseError> {
        location.join(&self.base_path.join(&self.script_name))
    }
}
