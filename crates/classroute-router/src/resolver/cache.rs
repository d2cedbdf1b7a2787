//! Session-lifetime cache of resolved page components

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::Module;
use crate::route::RouteParams;

/// Key under which a resolved component is memoized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Parameterless resolution, keyed by the request path
    Static(String),
    /// Registered dynamic route: registration slot plus serialized params
    Route { route: usize, params: String },
    /// Parametrized auto-discovery: module path plus serialized params
    Parametrized { module_path: String, params: String },
}

impl CacheKey {
    pub fn route(route: usize, params: &RouteParams) -> Self {
        CacheKey::Route {
            route,
            params: params.serialize_key(),
        }
    }

    pub fn parametrized(module_path: &str, params: &RouteParams) -> Self {
        CacheKey::Parametrized {
            module_path: module_path.to_string(),
            params: params.serialize_key(),
        }
    }
}

/// A page unit ready to instantiate
#[derive(Debug)]
pub struct ResolvedComponent {
    pub module: Arc<Module>,
    /// Logical module path it was loaded from
    pub module_path: String,
    /// Registered pattern, or the module path for auto-discovered pages
    pub pattern: String,
    pub params: RouteParams,
}

/// Component cache owned by one resolver
///
/// Entries are never evicted during a session; `clear` exists for tests and
/// for hosts that rebuild their module table.
#[derive(Debug, Default)]
pub struct ComponentCache {
    entries: HashMap<CacheKey, Arc<ResolvedComponent>>,
    // request path → key for parametrized auto-discovery hits
    discovered: HashMap<String, CacheKey>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResolvedComponent>> {
        self.entries.get(key).cloned()
    }

    /// Stores an entry; an existing entry for the same key is kept and returned
    pub fn insert(&mut self, key: CacheKey, component: ResolvedComponent) -> Arc<ResolvedComponent> {
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(component))
            .clone()
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<Arc<ResolvedComponent>> {
        self.discovered.retain(|_, remembered| remembered != key);
        self.entries.remove(key)
    }

    /// Remembers which key an auto-discovered request path resolved to
    pub fn remember_path(&mut self, path: &str, key: CacheKey) {
        self.discovered.insert(path.to_string(), key);
    }

    /// Cached entry for a request path previously resolved by discovery
    pub fn get_by_path(&self, path: &str) -> Option<Arc<ResolvedComponent>> {
        self.discovered.get(path).and_then(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.discovered.clear();
    }
}
