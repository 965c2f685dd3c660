//! WASM request relocation under the deployment base path.
//!
//! The SDK bundle hard-codes its binary module at the page root
//! (`/tfhe_bg.wasm`). Under a sub-path deployment the file actually lives at
//! `/farewell/tfhe_bg.wasm`. Two interceptors wrap the platform primitives
//! and rewrite only that case:
//!
//! - [`RelocatingFetch`] rewrites same-origin `*.wasm` requests whose path is
//!   outside the base path, preserving query and fragment
//! - [`RelocatingInstantiator`] re-fetches a WASM response that was served
//!   from outside the base path before compiling it
//!
//! Every other request and response passes through untouched. Both wrappers
//! keep the original primitive and delegate to it.

use std::rc::Rc;

use async_trait::async_trait;
use url::Url;

use crate::{
    config::BasePath,
    host::{
        Fetch, FetchRequest, FetchResponse, Platform, PlatformError, WasmImports,
        WasmInstantiator, WasmModule, WasmSource,
    },
};

/// WASM media type.
const WASM_CONTENT_TYPE: &str = "application/wasm";

/// True if `path` names a WASM binary.
pub fn is_wasm_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".wasm")
}

/// True if `response` carries a WASM binary, judged by URL or media type.
pub fn is_wasm_response(response: &FetchResponse) -> bool {
    is_wasm_path(response.url.path())
        || response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with(WASM_CONTENT_TYPE))
}

/// Rewrite `url` under `base` if it is a same-origin WASM resource outside
/// the base path. `None` means "leave the request alone".
pub fn relocate_wasm_url(url: &Url, page: &Url, base: &BasePath) -> Option<Url> {
    if !is_wasm_path(url.path()) {
        return None;
    }
    relocate_under_base(url, page, base)
}

/// Prefix a same-origin URL with `base` unless it already lies beneath it.
fn relocate_under_base(url: &Url, page: &Url, base: &BasePath) -> Option<Url> {
    if base.is_root() || url.origin() != page.origin() || base.contains_path(url.path()) {
        return None;
    }

    let mut relocated = url.clone();
    relocated.set_path(&base.join(url.path()));
    Some(relocated)
}

/// `fetch` wrapper that relocates WASM requests.
pub struct RelocatingFetch {
    inner: Rc<dyn Fetch>,
    page: Url,
    base: BasePath,
}

impl RelocatingFetch {
    /// Wrap `inner` for a page at `page` deployed under `base`.
    pub fn new(inner: Rc<dyn Fetch>, page: Url, base: BasePath) -> Self {
        Self { inner, page, base }
    }
}

#[async_trait(?Send)]
impl Fetch for RelocatingFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError> {
        match relocate_wasm_url(&request.url, &self.page, &self.base) {
            Some(url) => {
                tracing::debug!(from = %request.url, to = %url, "relocating wasm fetch");
                self.inner.fetch(request.with_url(url)).await
            },
            None => self.inner.fetch(request).await,
        }
    }
}

/// `instantiateStreaming` wrapper that re-fetches mislocated WASM.
pub struct RelocatingInstantiator {
    inner: Rc<dyn WasmInstantiator>,
    fetch: Rc<dyn Fetch>,
    page: Url,
    base: BasePath,
}

impl RelocatingInstantiator {
    /// Wrap `inner`; relocated binaries are fetched through `fetch` (the
    /// original, unwrapped primitive).
    pub fn new(
        inner: Rc<dyn WasmInstantiator>,
        fetch: Rc<dyn Fetch>,
        page: Url,
        base: BasePath,
    ) -> Self {
        Self { inner, fetch, page, base }
    }
}

#[async_trait(?Send)]
impl WasmInstantiator for RelocatingInstantiator {
    async fn instantiate_streaming(
        &self,
        source: WasmSource,
        imports: &WasmImports,
    ) -> Result<WasmModule, PlatformError> {
        let response = source.resolve().await?;

        let relocated = if is_wasm_response(&response) {
            relocate_under_base(&response.url, &self.page, &self.base)
        } else {
            None
        };

        let Some(url) = relocated else {
            return self.inner.instantiate_streaming(WasmSource::Response(response), imports).await;
        };

        tracing::debug!(from = %response.url, to = %url, "re-fetching wasm under base path");
        let refetched = self.fetch.fetch(FetchRequest::get(url)).await?;
        self.inner.instantiate_streaming(WasmSource::Response(refetched), imports).await
    }
}

/// Wrap the platform's `fetch` and `instantiateStreaming`.
///
/// Installs at most once per platform. Returns false without touching the
/// platform when `base` is root or relocation is already in place.
pub fn install(platform: &Platform, page: &Url, base: &BasePath) -> bool {
    if base.is_root() || !platform.mark_relocation_installed() {
        return false;
    }

    let original_fetch = platform.fetch_primitive();
    let original_instantiator = platform.instantiator_primitive();

    platform.replace_fetch(Rc::new(RelocatingFetch::new(
        Rc::clone(&original_fetch),
        page.clone(),
        base.clone(),
    )));
    platform.replace_instantiator(Rc::new(RelocatingInstantiator::new(
        original_instantiator,
        original_fetch,
        page.clone(),
        base.clone(),
    )));

    tracing::debug!(base_path = %base, "wasm relocation installed");
    true
}
