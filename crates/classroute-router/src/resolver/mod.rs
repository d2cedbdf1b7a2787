//! Component resolution: manual registry first, conventions second
//!
//! Every successful resolution is memoized in the resolver's own
//! [`ComponentCache`]. When nothing can be found the caller gets a
//! [`ResolutionFailure`] listing every attempted module and why it failed,
//! never a panic.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::component::Module;
use crate::config::RouterConfig;
use crate::error::{LoadError, PatternError};
use crate::loader::ModuleLoader;
use crate::route::{match_route, PatternKind, RouteMatch, RouteParams, RoutePattern};

pub mod cache;
pub mod discovery;

pub use cache::{CacheKey, ComponentCache, ResolvedComponent};
pub use discovery::Candidate;

/// What a route registration points at
#[derive(Debug, Clone)]
pub enum ComponentRef {
    /// Logical module path handed to the loader on first use
    Lazy(String),
    /// An already available module
    Inline(Arc<Module>),
}

impl ComponentRef {
    /// Structural identity used in cache keys and diagnostics
    pub fn module_path(&self) -> String {
        match self {
            ComponentRef::Lazy(path) => path.clone(),
            ComponentRef::Inline(module) => format!("inline:{}", module.mount_tag()),
        }
    }
}

impl From<&str> for ComponentRef {
    fn from(path: &str) -> Self {
        ComponentRef::Lazy(path.to_string())
    }
}

impl From<String> for ComponentRef {
    fn from(path: String) -> Self {
        ComponentRef::Lazy(path)
    }
}

impl From<Module> for ComponentRef {
    fn from(module: Module) -> Self {
        ComponentRef::Inline(Arc::new(module))
    }
}

impl From<Arc<Module>> for ComponentRef {
    fn from(module: Arc<Module>) -> Self {
        ComponentRef::Inline(module)
    }
}

/// One failed candidate
#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub module_path: String,
    pub error: LoadError,
}

/// Every candidate for a path failed
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub path: String,
    /// Attempts in the order they were made, one per candidate
    pub attempts: Vec<FailedAttempt>,
}

impl ResolutionFailure {
    pub fn attempted_paths(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.module_path.as_str()).collect()
    }

    pub fn errors(&self) -> Vec<&LoadError> {
        self.attempts.iter().map(|a| &a.error).collect()
    }
}

/// Why a path could not be turned into a page unit
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    /// Nothing registered and auto-discovery disabled
    #[error("No route matches '{path}'")]
    NotFound { path: String },

    #[error("Could not resolve a component for '{}' ({} candidates tried)", .0.path, .0.attempts.len())]
    Unresolved(ResolutionFailure),
}

/// Maps request paths to page modules
pub struct ComponentResolver {
    config: Arc<RouterConfig>,
    loader: Arc<dyn ModuleLoader>,
    static_routes: IndexMap<String, ComponentRef>,
    dynamic_routes: Vec<(RoutePattern, ComponentRef)>,
    cache: ComponentCache,
    failures: HashMap<String, ResolutionFailure>,
}

impl ComponentResolver {
    pub fn new(config: Arc<RouterConfig>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            config,
            loader,
            static_routes: IndexMap::new(),
            dynamic_routes: Vec::new(),
            cache: ComponentCache::new(),
            failures: HashMap::new(),
        }
    }

    /// Registers a route into the static or dynamic table
    ///
    /// Dynamic patterns are matched in registration order, first match wins:
    /// register specific patterns before general ones.
    pub fn register(
        &mut self,
        pattern: &str,
        component: impl Into<ComponentRef>,
    ) -> Result<PatternKind, PatternError> {
        let compiled = RoutePattern::compile(pattern)?;
        let kind = compiled.kind();
        let component = component.into();

        if kind.is_dynamic() {
            self.dynamic_routes.push((compiled, component));
        } else {
            if self
                .static_routes
                .insert(pattern.to_string(), component)
                .is_some()
            {
                warn!(pattern, "Static route registered twice, keeping the latest");
            }
            // A page cached for this path came from an older registration or discovery
            self.cache.remove(&CacheKey::Static(pattern.to_string()));
        }

        debug!(pattern, ?kind, "Registered route");
        Ok(kind)
    }

    /// Direct lookup in the static table
    pub fn resolve_static(&self, path: &str) -> Option<&ComponentRef> {
        self.static_routes.get(path)
    }

    /// First matching dynamic registration
    pub fn resolve_dynamic(&self, path: &str) -> Option<RouteMatch<ComponentRef>> {
        match_route(path, &self.dynamic_routes)
    }

    // Registration slot of the first matching dynamic route
    fn match_dynamic(&self, path: &str) -> Option<(usize, String, ComponentRef, RouteParams)> {
        self.dynamic_routes
            .iter()
            .enumerate()
            .find_map(|(route, (pattern, target))| {
                pattern
                    .captures(path)
                    .map(|params| (route, pattern.raw().to_string(), target.clone(), params))
            })
    }

    /// Statically registered paths, in registration order
    pub fn static_paths(&self) -> impl Iterator<Item = &str> {
        self.static_routes.keys().map(String::as_str)
    }

    pub fn cache(&self) -> &ComponentCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.failures.clear();
    }

    /// Most recent failure recorded for a path
    pub fn last_failure(&self, path: &str) -> Option<&ResolutionFailure> {
        self.failures.get(path)
    }

    /// Resolves a path to a page unit
    ///
    /// Order: cache → static table → dynamic table → previously discovered
    /// path → auto-discovery.
    pub async fn resolve(&mut self, path: &str) -> Result<Arc<ResolvedComponent>, ResolveError> {
        let static_key = CacheKey::Static(path.to_string());
        if let Some(hit) = self.cache.get(&static_key) {
            debug!(path, "Component cache hit");
            return Ok(hit);
        }

        if let Some(component) = self.resolve_static(path).cloned() {
            return self
                .load_registered(path, path, component, RouteParams::new(), static_key)
                .await;
        }

        if let Some((route, pattern, target, params)) = self.match_dynamic(path) {
            let key = CacheKey::route(route, &params);
            if let Some(hit) = self.cache.get(&key) {
                debug!(path, pattern = %pattern, "Component cache hit");
                return Ok(hit);
            }
            return self.load_registered(path, &pattern, target, params, key).await;
        }

        if let Some(hit) = self.cache.get_by_path(path) {
            debug!(path, "Component cache hit (discovered)");
            return Ok(hit);
        }

        if !self.config.auto_discovery {
            return Err(ResolveError::NotFound {
                path: path.to_string(),
            });
        }

        self.auto_discover(path)
            .await
            .map_err(ResolveError::Unresolved)
    }

    /// Probes convention-based candidates strictly in priority order
    ///
    /// Candidates are awaited one at a time. Racing them would be faster but
    /// the first candidate by priority must win, not the first to settle.
    pub async fn auto_discover(
        &mut self,
        path: &str,
    ) -> Result<Arc<ResolvedComponent>, ResolutionFailure> {
        let candidates = discovery::candidates(path, &self.config);
        let mut attempts = Vec::new();

        for candidate in candidates {
            debug!(path, candidate = %candidate.module_path, "Trying candidate");

            let error = match self.loader.load(&candidate.module_path).await {
                Ok(module) if module.is_page() => {
                    let key = if candidate.is_parametrized() {
                        CacheKey::parametrized(&candidate.module_path, &candidate.params)
                    } else {
                        CacheKey::Static(path.to_string())
                    };

                    info!(
                        path,
                        module = %candidate.module_path,
                        failed_before = attempts.len(),
                        "Auto-discovered page"
                    );

                    let resolved = ResolvedComponent {
                        module,
                        pattern: candidate.module_path.clone(),
                        module_path: candidate.module_path,
                        params: candidate.params,
                    };
                    let entry = self.cache.insert(key.clone(), resolved);
                    if let CacheKey::Parametrized { .. } = key {
                        self.cache.remember_path(path, key);
                    }
                    self.failures.remove(path);
                    return Ok(entry);
                }
                Ok(_) => LoadError::WrongExport {
                    path: candidate.module_path.clone(),
                    expected: "page",
                },
                Err(error) => error,
            };

            attempts.push(FailedAttempt {
                module_path: candidate.module_path,
                error,
            });
        }

        let failure = ResolutionFailure {
            path: path.to_string(),
            attempts,
        };
        error!(
            path,
            attempted = ?failure.attempted_paths(),
            "No candidate module could be loaded"
        );
        self.failures.insert(path.to_string(), failure.clone());
        Err(failure)
    }

    /// Eagerly loads every statically registered lazy component, concurrently
    ///
    /// Failures are logged and left for navigation time to report. Returns
    /// the number of components now cached.
    pub async fn preload_static(&mut self) -> usize {
        let pending: Vec<(String, ComponentRef)> = self
            .static_routes
            .iter()
            .filter(|(path, _)| self.cache.get(&CacheKey::Static((*path).clone())).is_none())
            .map(|(path, component)| (path.clone(), component.clone()))
            .collect();

        let results = {
            let this = &*self;
            join_all(pending.into_iter().map(|(path, component)| async move {
                let result = this.load_page(&component).await;
                (path, result)
            }))
            .await
        };

        let mut loaded = 0;
        for (path, result) in results {
            match result {
                Ok((module, module_path)) => {
                    self.cache.insert(
                        CacheKey::Static(path.clone()),
                        ResolvedComponent {
                            module,
                            module_path,
                            pattern: path,
                            params: RouteParams::new(),
                        },
                    );
                    loaded += 1;
                }
                Err(error) => warn!(path = %path, error = %error, "Preload failed"),
            }
        }

        debug!(loaded, "Preloaded static routes");
        loaded
    }

    async fn load_page(&self, component: &ComponentRef) -> Result<(Arc<Module>, String), LoadError> {
        let module_path = component.module_path();
        let module = match component {
            ComponentRef::Lazy(path) => self.loader.load(path).await?,
            ComponentRef::Inline(module) => module.clone(),
        };

        if !module.is_page() {
            return Err(LoadError::WrongExport {
                path: module_path,
                expected: "page",
            });
        }

        Ok((module, module_path))
    }

    async fn load_registered(
        &mut self,
        path: &str,
        pattern: &str,
        component: ComponentRef,
        params: RouteParams,
        key: CacheKey,
    ) -> Result<Arc<ResolvedComponent>, ResolveError> {
        match self.load_page(&component).await {
            Ok((module, module_path)) => {
                debug!(path, module = %module_path, "Loaded registered component");
                self.failures.remove(path);
                Ok(self.cache.insert(
                    key,
                    ResolvedComponent {
                        module,
                        module_path,
                        pattern: pattern.to_string(),
                        params,
                    },
                ))
            }
            Err(error) => {
                error!(path, pattern, error = %error, "Registered component failed to load");
                let failure = ResolutionFailure {
                    path: path.to_string(),
                    attempts: vec![FailedAttempt {
                        module_path: component.module_path(),
                        error,
                    }],
                };
                self.failures.insert(path.to_string(), failure.clone());
                Err(ResolveError::Unresolved(failure))
            }
        }
    }
}
