//! Simulated `fetch` and `instantiateStreaming`.
//!
//! Routes are keyed by URL path. Unknown paths answer like a static host
//! with an SPA fallback: `404` with an HTML body, which a real
//! `instantiateStreaming` refuses to compile.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use async_trait::async_trait;
use farewell_core::{
    Fetch, FetchRequest, FetchResponse, PlatformError, WasmImports, WasmInstantiator, WasmModule,
    WasmSource,
};
use url::Url;

/// First four bytes of every WASM binary.
pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// In-memory static file server.
#[derive(Debug, Default)]
pub struct SimNetwork {
    routes: RefCell<HashMap<String, Route>>,
    unreachable: RefCell<HashSet<String>>,
    requests: RefCell<Vec<FetchRequest>>,
}

impl SimNetwork {
    /// Empty network; every path is a 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `path` with status 200.
    pub fn serve(&self, path: &str, content_type: &str, body: Vec<u8>) {
        self.routes.borrow_mut().insert(
            path.to_string(),
            Route { status: 200, content_type: Some(content_type.to_string()), body },
        );
    }

    /// Serve a minimal valid WASM binary at `path`.
    pub fn serve_wasm(&self, path: &str) {
        let mut body = WASM_MAGIC.to_vec();
        body.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        self.serve(path, "application/wasm", body);
    }

    /// Fail every request to `path` at the network level.
    pub fn make_unreachable(&self, path: &str) {
        self.unreachable.borrow_mut().insert(path.to_string());
    }

    /// Every request seen, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.borrow().clone()
    }

    /// Every requested URL, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.to_string()).collect()
    }

    fn respond(&self, url: &Url) -> Result<FetchResponse, PlatformError> {
        if self.unreachable.borrow().contains(url.path()) {
            return Err(PlatformError::Network(format!("connection refused: {url}")));
        }

        let route = self.routes.borrow().get(url.path()).cloned().unwrap_or_else(|| Route {
            status: 404,
            content_type: Some("text/html".to_string()),
            body: b"<!doctype html><title>Not Found</title>".to_vec(),
        });

        Ok(FetchResponse {
            url: url.clone(),
            status: route.status,
            content_type: route.content_type,
            body: route.body,
        })
    }
}

#[async_trait(?Send)]
impl Fetch for SimNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, PlatformError> {
        self.requests.borrow_mut().push(request.clone());
        self.respond(&request.url)
    }
}

/// Records every instantiation and compiles only genuine WASM.
#[derive(Debug, Default)]
pub struct SimInstantiator {
    compiled: RefCell<Vec<(WasmModule, WasmImports)>>,
}

impl SimInstantiator {
    /// No modules compiled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source URLs of successfully compiled modules.
    pub fn compiled_urls(&self) -> Vec<String> {
        self.compiled.borrow().iter().map(|(m, _)| m.source_url.to_string()).collect()
    }

    /// Imports handed to each successful instantiation.
    pub fn imports(&self) -> Vec<WasmImports> {
        self.compiled.borrow().iter().map(|(_, i)| i.clone()).collect()
    }
}

#[async_trait(?Send)]
impl WasmInstantiator for SimInstantiator {
    async fn instantiate_streaming(
        &self,
        source: WasmSource,
        imports: &WasmImports,
    ) -> Result<WasmModule, PlatformError> {
        let response = source.resolve().await?;

        if !response.is_ok() {
            return Err(PlatformError::Instantiate(format!(
                "HTTP status {} for {}",
                response.status, response.url
            )));
        }
        if !response.body.starts_with(&WASM_MAGIC) {
            return Err(PlatformError::Instantiate(format!(
                "expected magic word 00 61 73 6d in {}",
                response.url
            )));
        }

        let module = WasmModule { source_url: response.url, byte_len: response.body.len() };
        self.compiled.borrow_mut().push((module.clone(), imports.clone()));
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn unknown_path_is_html_404() {
        let network = SimNetwork::new();
        let response =
            network.fetch(FetchRequest::get(url("https://example.org/missing.wasm"))).await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn instantiator_rejects_html() {
        let network = SimNetwork::new();
        let response =
            network.fetch(FetchRequest::get(url("https://example.org/tfhe_bg.wasm"))).await.unwrap();

        let result = SimInstantiator::new()
            .instantiate_streaming(WasmSource::Response(response), &WasmImports::default())
            .await;
        assert!(matches!(result, Err(PlatformError::Instantiate(_))));
    }

    #[tokio::test]
    async fn instantiator_compiles_served_wasm() {
        let network = SimNetwork::new();
        network.serve_wasm("/tfhe_bg.wasm");
        let response =
            network.fetch(FetchRequest::get(url("https://example.org/tfhe_bg.wasm"))).await.unwrap();

        let instantiator = SimInstantiator::new();
        instantiator
            .instantiate_streaming(WasmSource::Response(response), &WasmImports::default())
            .await
            .unwrap();
        assert_eq!(instantiator.compiled_urls(), vec!["https://example.org/tfhe_bg.wasm"]);
    }

    #[tokio::test]
    async fn unreachable_path_is_network_error() {
        let network = SimNetwork::new();
        network.make_unreachable("/sdk.js");

        let result = network.fetch(FetchRequest::get(url("https://example.org/sdk.js"))).await;
        assert!(matches!(result, Err(PlatformError::Network(_))));
    }
}
