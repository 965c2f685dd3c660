//! Simulated browser page.
//!
//! Holds the page location, the global object, `<script>` elements and the
//! platform primitive slots. What a script does when it runs is scripted per
//! URL with [`ScriptBehavior`]; a URL with no behavior behaves like a 404 and
//! fires `error`.
//!
//! Script execution yields to the executor once before completing, so two
//! concurrent loads genuinely interleave on a single-threaded runtime.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use async_trait::async_trait;
use farewell_core::{Fetch, GlobalValue, Host, Platform, PlatformError, WasmInstantiator};
use url::Url;

use crate::sim_network::{SimInstantiator, SimNetwork};

/// What happens when a script with a given `src` runs.
#[derive(Debug, Clone)]
pub enum ScriptBehavior {
    /// Loads and assigns `value` to the global `global`
    Define {
        /// Global property name
        global: String,
        /// Assigned value
        value: GlobalValue,
    },
    /// Fires `error` with this reason
    Fail(String),
    /// Loads but defines nothing
    Noop,
}

#[derive(Debug, Clone)]
enum ScriptStatus {
    Pending(ScriptBehavior),
    Loaded,
    Errored(String),
}

#[derive(Debug)]
struct ScriptElement {
    src: Url,
    status: ScriptStatus,
}

struct HostState {
    location: Url,
    platform: Rc<Platform>,
    network: Rc<SimNetwork>,
    instantiator: Rc<SimInstantiator>,
    globals: RefCell<HashMap<String, GlobalValue>>,
    scripts: RefCell<Vec<ScriptElement>>,
    behaviors: RefCell<HashMap<Url, ScriptBehavior>>,
    injections: RefCell<Vec<Url>>,
}

/// In-memory page. Cheap to clone; clones share the same page.
#[derive(Clone)]
pub struct SimHost {
    state: Rc<HostState>,
}

impl SimHost {
    /// Page at `location` with an empty document and an empty network.
    pub fn new(location: Url) -> Self {
        let network = Rc::new(SimNetwork::new());
        let instantiator = Rc::new(SimInstantiator::new());
        let platform = Rc::new(Platform::new(
            Rc::clone(&network) as Rc<dyn Fetch>,
            Rc::clone(&instantiator) as Rc<dyn WasmInstantiator>,
        ));

        Self {
            state: Rc::new(HostState {
                location,
                platform,
                network,
                instantiator,
                globals: RefCell::new(HashMap::new()),
                scripts: RefCell::new(Vec::new()),
                behaviors: RefCell::new(HashMap::new()),
                injections: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Shared handle to the platform slots.
    pub fn platform_rc(&self) -> Rc<Platform> {
        Rc::clone(&self.state.platform)
    }

    /// The original (unwrapped) network.
    pub fn network(&self) -> &SimNetwork {
        &self.state.network
    }

    /// The original (unwrapped) instantiator.
    pub fn instantiator(&self) -> &SimInstantiator {
        &self.state.instantiator
    }

    /// Resolve `path` against the page location.
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.state.location.join(path)
    }

    /// Assign a global property.
    pub fn set_global(&self, name: &str, value: GlobalValue) {
        self.state.globals.borrow_mut().insert(name.to_string(), value);
    }

    /// Delete a global property.
    pub fn remove_global(&self, name: &str) {
        self.state.globals.borrow_mut().remove(name);
    }

    /// Decide what a script injected with `src` does from now on.
    pub fn on_script(&self, src: &Url, behavior: ScriptBehavior) {
        self.state.behaviors.borrow_mut().insert(src.clone(), behavior);
    }

    /// Put a script element in the document as if page markup had declared
    /// it. It runs `behavior` the first time someone waits on it.
    pub fn insert_script(&self, src: &Url, behavior: ScriptBehavior) {
        self.state
            .scripts
            .borrow_mut()
            .push(ScriptElement { src: src.clone(), status: ScriptStatus::Pending(behavior) });
    }

    /// Every URL passed to `inject_script`, in order.
    pub fn injections(&self) -> Vec<Url> {
        self.state.injections.borrow().clone()
    }

    /// Number of script elements currently in the document with `src`.
    pub fn script_count(&self, src: &Url) -> usize {
        self.state.scripts.borrow().iter().filter(|s| &s.src == src).count()
    }

    /// Run the pending behavior of the element for `src`, if any, and report
    /// its final status.
    fn execute(&self, src: &Url) -> Result<(), PlatformError> {
        let pending = {
            let mut scripts = self.state.scripts.borrow_mut();
            let Some(element) = scripts.iter_mut().rev().find(|s| &s.src == src) else {
                return Err(PlatformError::Script(format!("no script element for {src}")));
            };

            match element.status.clone() {
                ScriptStatus::Loaded => return Ok(()),
                ScriptStatus::Errored(reason) => return Err(PlatformError::Script(reason)),
                ScriptStatus::Pending(behavior) => {
                    element.status = match &behavior {
                        ScriptBehavior::Fail(reason) => ScriptStatus::Errored(reason.clone()),
                        ScriptBehavior::Define { .. } | ScriptBehavior::Noop => {
                            ScriptStatus::Loaded
                        },
                    };
                    behavior
                },
            }
        };

        match pending {
            ScriptBehavior::Define { global, value } => {
                tracing::trace!(%src, %global, "script defined global");
                self.set_global(&global, value);
                Ok(())
            },
            ScriptBehavior::Noop => Ok(()),
            ScriptBehavior::Fail(reason) => Err(PlatformError::Script(reason)),
        }
    }
}

#[async_trait(?Send)]
impl Host for SimHost {
    fn location(&self) -> Url {
        self.state.location.clone()
    }

    fn platform(&self) -> &Platform {
        &self.state.platform
    }

    fn global(&self, name: &str) -> GlobalValue {
        self.state.globals.borrow().get(name).cloned().unwrap_or(GlobalValue::Undefined)
    }

    fn has_script(&self, src: &Url) -> bool {
        self.script_count(src) > 0
    }

    async fn inject_script(&self, src: &Url) -> Result<(), PlatformError> {
        let behavior = self
            .state
            .behaviors
            .borrow()
            .get(src)
            .cloned()
            .unwrap_or_else(|| ScriptBehavior::Fail(format!("404 Not Found: {src}")));

        self.state.injections.borrow_mut().push(src.clone());
        self.insert_script(src, behavior);

        tokio::task::yield_now().await;
        self.execute(src)
    }

    async fn script_settled(&self, src: &Url) -> Result<(), PlatformError> {
        tokio::task::yield_now().await;
        self.execute(src)
    }

    fn remove_script(&self, src: &Url) {
        self.state.scripts.borrow_mut().retain(|s| &s.src != src);
    }
}
