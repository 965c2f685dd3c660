//! Host environment abstraction.
//!
//! Decouples the loader from the browser. A [`Host`] exposes the page
//! location, named globals, script elements and the two platform primitives
//! the loader patches. Production binds these to `window`; tests use the
//! simulated host in `farewell-harness`.
//!
//! All traits are `?Send`: the page runs a single-threaded cooperative event
//! loop and primitives are shared through `Rc`.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use thiserror::Error;
use url::Url;

use crate::sdk::GlobalValue;

/// Failure of a platform primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Network-level failure (DNS, connection, CORS)
    #[error("network error: {0}")]
    Network(String),

    /// Script element fired its `error` event
    #[error("script error: {0}")]
    Script(String),

    /// WASM compilation or instantiation failed
    #[error("instantiation failed: {0}")]
    Instantiate(String),
}

/// An outgoing `fetch` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute target URL
    pub url: Url,
    /// HTTP method
    pub method: String,
    /// Request headers, in order
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    /// Plain `GET` with no headers.
    pub fn get(url: Url) -> Self {
        Self { url, method: "GET".to_string(), headers: Vec::new(), body: None }
    }

    /// Same request aimed at a different URL.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }
}

/// A `fetch` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final response URL
    pub url: Url,
    /// HTTP status
    pub status: u16,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The platform's `fetch` primitive.
#[async_trait(?Send)]
pub trait Fetch {
    /// Perform a request.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError>;
}

/// What `instantiateStreaming` is handed: a response, or a promise of one.
pub enum WasmSource {
    /// Already-resolved response
    Response(FetchResponse),
    /// Response still in flight
    Pending(LocalBoxFuture<'static, Result<FetchResponse, PlatformError>>),
}

impl WasmSource {
    /// Await the underlying response.
    pub async fn resolve(self) -> Result<FetchResponse, PlatformError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Pending(future) => future.await,
        }
    }
}

impl std::fmt::Debug for WasmSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(response) => f.debug_tuple("Response").field(&response.url).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Import namespaces handed to the module. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasmImports {
    /// Namespace names (`wbg`, `env`, ...)
    pub namespaces: Vec<String>,
}

/// An instantiated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmModule {
    /// URL of the response the module was compiled from
    pub source_url: Url,
    /// Size of the compiled binary
    pub byte_len: usize,
}

/// The platform's `WebAssembly.instantiateStreaming` primitive.
#[async_trait(?Send)]
pub trait WasmInstantiator {
    /// Compile and instantiate a module from a (possibly pending) response.
    async fn instantiate_streaming(
        &self,
        source: WasmSource,
        imports: &WasmImports,
    ) -> Result<WasmModule, PlatformError>;
}

/// Replaceable slots holding the current platform primitives.
///
/// Mirrors the mutable `window.fetch` / `WebAssembly.instantiateStreaming`
/// properties: whoever reads the slot gets whatever was installed last.
/// Also carries the page-lifetime "WASM relocation installed" flag, so every
/// loader on the page sees the same one.
pub struct Platform {
    fetch: RefCell<Rc<dyn Fetch>>,
    instantiator: RefCell<Rc<dyn WasmInstantiator>>,
    relocation_installed: Cell<bool>,
}

impl Platform {
    /// Platform with the given original primitives.
    pub fn new(fetch: Rc<dyn Fetch>, instantiator: Rc<dyn WasmInstantiator>) -> Self {
        Self {
            fetch: RefCell::new(fetch),
            instantiator: RefCell::new(instantiator),
            relocation_installed: Cell::new(false),
        }
    }

    /// True once WASM relocation wraps the primitives.
    pub fn relocation_installed(&self) -> bool {
        self.relocation_installed.get()
    }

    /// Record that WASM relocation is installed. Returns false if it already
    /// was.
    pub fn mark_relocation_installed(&self) -> bool {
        !self.relocation_installed.replace(true)
    }

    /// Currently installed `fetch`.
    pub fn fetch_primitive(&self) -> Rc<dyn Fetch> {
        Rc::clone(&self.fetch.borrow())
    }

    /// Currently installed `instantiateStreaming`.
    pub fn instantiator_primitive(&self) -> Rc<dyn WasmInstantiator> {
        Rc::clone(&self.instantiator.borrow())
    }

    /// Install a new `fetch`, returning the previous one.
    pub fn replace_fetch(&self, fetch: Rc<dyn Fetch>) -> Rc<dyn Fetch> {
        self.fetch.replace(fetch)
    }

    /// Install a new `instantiateStreaming`, returning the previous one.
    pub fn replace_instantiator(
        &self,
        instantiator: Rc<dyn WasmInstantiator>,
    ) -> Rc<dyn WasmInstantiator> {
        self.instantiator.replace(instantiator)
    }

    /// Call the currently installed `fetch`.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError> {
        let fetch = self.fetch_primitive();
        fetch.fetch(request).await
    }

    /// Call the currently installed `instantiateStreaming`.
    pub async fn instantiate_streaming(
        &self,
        source: WasmSource,
        imports: &WasmImports,
    ) -> Result<WasmModule, PlatformError> {
        let instantiator = self.instantiator_primitive();
        instantiator.instantiate_streaming(source, imports).await
    }
}

/// A browser-like execution context.
#[async_trait(?Send)]
pub trait Host {
    /// Current document URL (`window.location.href`).
    fn location(&self) -> Url;

    /// Platform primitive slots.
    fn platform(&self) -> &Platform;

    /// Read a property of the global object.
    fn global(&self, name: &str) -> GlobalValue;

    /// True if a `<script>` element with exactly this `src` is in the
    /// document.
    fn has_script(&self, src: &Url) -> bool;

    /// Append a `<script>` element and resolve on its `load` or `error`
    /// event.
    async fn inject_script(&self, src: &Url) -> Result<(), PlatformError>;

    /// Wait until an existing `<script>` element has loaded. Resolves
    /// immediately if it already has.
    async fn script_settled(&self, src: &Url) -> Result<(), PlatformError>;

    /// Remove the `<script>` element with this `src`, if present.
    fn remove_script(&self, src: &Url);
}
