//! SDK loader.
//!
//! Guarantees a validated SDK handle exists before any confidential-compute
//! call. One loader is created per page and shared by reference; it owns
//! the handle and the session instance. The "relocation installed" flag
//! lives on the page's [`Platform`](crate::host::Platform).
//!
//! Loads are serialized: a `load()` issued while another is in flight waits
//! for it and reports the same outcome instead of injecting a second script.
//! A failed load stays failed until a caller explicitly calls `load()` again.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use tokio::sync::Mutex;
use url::Url;

use crate::{
    config::LoaderConfig,
    error::LoaderError,
    host::{Host, PlatformError},
    relocate,
    sdk::{ConfidentialCompute, InstanceConfig, SdkHandle, is_valid_sdk_handle},
};

/// Loader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load attempted
    NotLoaded,
    /// Script injection or validation in progress
    Loading,
    /// Valid handle available (terminal)
    Ready,
    /// Last attempt failed; `load()` may be called again
    Failed,
}

/// Loads and validates the confidential-compute SDK.
pub struct SdkLoader<H: Host> {
    host: Option<H>,
    config: LoaderConfig,
    state: Cell<LoadState>,
    handle: RefCell<Option<SdkHandle>>,
    last_error: RefCell<Option<LoaderError>>,
    /// Completed load attempts, used to hand queued callers the outcome of
    /// the attempt they waited on.
    attempts: Cell<u64>,
    sdk_initialized: Cell<bool>,
    instance: RefCell<Option<Rc<dyn ConfidentialCompute>>>,
    gate: Mutex<()>,
}

impl<H: Host> SdkLoader<H> {
    /// Loader bound to a browser-like host.
    pub fn new(host: H, config: LoaderConfig) -> Self {
        Self::with_host(Some(host), config)
    }

    /// Loader with no browser context (server-side rendering). Every
    /// operation fails with [`LoaderError::EnvironmentError`].
    pub fn without_host(config: LoaderConfig) -> Self {
        Self::with_host(None, config)
    }

    fn with_host(host: Option<H>, config: LoaderConfig) -> Self {
        Self {
            host,
            config,
            state: Cell::new(LoadState::NotLoaded),
            handle: RefCell::new(None),
            last_error: RefCell::new(None),
            attempts: Cell::new(0),
            sdk_initialized: Cell::new(false),
            instance: RefCell::new(None),
            gate: Mutex::new(()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The host, or `EnvironmentError` outside the browser.
    pub fn host(&self) -> Result<&H, LoaderError> {
        self.host.as_ref().ok_or(LoaderError::EnvironmentError)
    }

    /// True if a valid SDK handle is present on the global object.
    pub fn is_loaded(&self) -> Result<bool, LoaderError> {
        let host = self.host()?;
        let global = host.global(&self.config.global_name);
        Ok(is_valid_sdk_handle(&global, &self.config.network_preset))
    }

    /// The validated handle, once `Ready`.
    pub fn handle(&self) -> Option<SdkHandle> {
        self.handle.borrow().clone()
    }

    /// Ensure the SDK is loaded and return its handle.
    ///
    /// 1. Fails with `EnvironmentError` without a host
    /// 2. Installs WASM relocation (once per page)
    /// 3. Returns immediately if a valid handle is already global
    /// 4. Waits for an existing script element for the SDK URL, or
    /// 5. Injects one, then validates the global
    ///
    /// # Errors
    ///
    /// - `EnvironmentError`: no browser context
    /// - `ScriptLoadFailed`: the script errored; the element is removed so a
    ///   retry injects a fresh one
    /// - `InvalidSdkShape`: the script ran but the global is not a valid SDK
    pub async fn load(&self) -> Result<SdkHandle, LoaderError> {
        let host = self.host()?;
        self.ensure_relocation(host);

        if let Some(handle) = self.ready_handle(host) {
            return Ok(handle);
        }

        let observed = self.attempts.get();
        let _guard = self.gate.lock().await;

        if let Some(handle) = self.ready_handle(host) {
            return Ok(handle);
        }

        // Someone else's attempt finished while we waited: report it.
        if self.attempts.get() != observed {
            let previous = self.last_error.borrow().clone();
            if let Some(err) = previous {
                return Err(err);
            }
        }

        self.transition(LoadState::Loading);
        let outcome = self.load_script(host).await;
        self.attempts.set(self.attempts.get() + 1);

        match &outcome {
            Ok(handle) => {
                *self.handle.borrow_mut() = Some(handle.clone());
                *self.last_error.borrow_mut() = None;
                self.transition(LoadState::Ready);
            },
            Err(err) => {
                tracing::warn!(error = %err, "sdk load failed");
                *self.last_error.borrow_mut() = Some(err.clone());
                self.transition(LoadState::Failed);
            },
        }

        outcome
    }

    /// Load the SDK, initialize it once and create the session's
    /// confidential-compute instance.
    ///
    /// The instance is cached: later calls return it regardless of `config`.
    pub async fn instance(
        &self,
        config: InstanceConfig,
    ) -> Result<Rc<dyn ConfidentialCompute>, LoaderError> {
        let handle = self.load().await?;
        let _guard = self.gate.lock().await;

        let cached = self.instance.borrow().clone();
        if let Some(instance) = cached {
            return Ok(instance);
        }

        let Some(preset) = handle.sdk().network_preset(&config.preset) else {
            return Err(LoaderError::InvalidSdkShape {
                global: format!("{}.{}", self.config.global_name, config.preset),
            });
        };

        if !self.sdk_initialized.get() && !handle.is_initialized() {
            tracing::debug!("initializing sdk");
            handle.sdk().init_sdk().await?;
        }
        self.sdk_initialized.set(true);

        let instance = handle.sdk().create_instance(config).await?;
        tracing::info!(
            preset = %preset.name,
            chain_id = preset.chain_id,
            "confidential-compute instance ready"
        );

        *self.instance.borrow_mut() = Some(Rc::clone(&instance));
        Ok(instance)
    }

    fn ensure_relocation(&self, host: &H) {
        let platform = host.platform();
        if platform.relocation_installed() {
            return;
        }
        if self.config.base_path.is_root() {
            tracing::trace!("root deployment, wasm relocation not needed");
            return;
        }
        relocate::install(platform, &host.location(), &self.config.base_path);
    }

    /// Cached handle, or a valid one discovered on the global object.
    fn ready_handle(&self, host: &H) -> Option<SdkHandle> {
        let cached = self.handle.borrow().clone();
        if cached.is_some() {
            return cached;
        }

        let handle = SdkHandle::from_global(
            &host.global(&self.config.global_name),
            &self.config.network_preset,
        )?;
        *self.handle.borrow_mut() = Some(handle.clone());
        self.transition(LoadState::Ready);
        Some(handle)
    }

    async fn load_script(&self, host: &H) -> Result<SdkHandle, LoaderError> {
        let url = self.config.script_url(&host.location()).map_err(|err| {
            LoaderError::ScriptLoadFailed {
                url: self.config.base_path.join(&self.config.script_name),
                reason: err.to_string(),
            }
        })?;

        if host.has_script(&url) {
            tracing::debug!(%url, "sdk script already present");
            host.script_settled(&url).await.map_err(|err| Self::script_failed(host, &url, &err))?;
        } else {
            tracing::info!(%url, "injecting sdk script");
            host.inject_script(&url).await.map_err(|err| Self::script_failed(host, &url, &err))?;
        }

        SdkHandle::from_global(&host.global(&self.config.global_name), &self.config.network_preset)
            .ok_or_else(|| LoaderError::InvalidSdkShape { global: self.config.global_name.clone() })
    }

    fn script_failed(host: &H, url: &Url, err: &PlatformError) -> LoaderError {
        host.remove_script(url);
        LoaderError::ScriptLoadFailed { url: url.to_string(), reason: err.to_string() }
    }

    fn transition(&self, next: LoadState) {
        let previous = self.state.replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "sdk loader state");
        }
    }
}
