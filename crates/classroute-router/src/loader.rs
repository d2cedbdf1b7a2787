//! Module loader contract and an in-memory implementation

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::component::Module;
use crate::error::LoadError;

/// Asynchronously obtains a module for a logical path such as `app/contact.js`
///
/// How the path is turned into code (bundler import, fetch, static table)
/// is the implementor's business; every call is a suspension point.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, logical_path: &str) -> Result<Arc<Module>, LoadError>;
}

/// Loader backed by a table of bundled modules
///
/// Counts every load attempt per path, which makes it suitable for
/// asserting cache behavior.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: HashMap<String, Arc<Module>>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    attempts: Mutex<Vec<String>>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module under a logical path
    pub fn with_module(mut self, logical_path: impl Into<String>, module: Module) -> Self {
        self.modules.insert(logical_path.into(), Arc::new(module));
        self
    }

    /// Makes loading `logical_path` fail with the given message
    pub fn with_failure(mut self, logical_path: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(logical_path.into(), message.into());
        self
    }

    /// Delays every load of `logical_path`
    pub fn with_delay(mut self, logical_path: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(logical_path.into(), delay);
        self
    }

    /// Every attempted path, in call order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of attempts for one path
    pub fn load_count(&self, logical_path: &str) -> usize {
        self.attempts().iter().filter(|p| *p == logical_path).count()
    }

    /// Total number of attempts
    pub fn total_loads(&self) -> usize {
        self.attempts().len()
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn load(&self, logical_path: &str) -> Result<Arc<Module>, LoadError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(logical_path.to_string());
        }

        if let Some(delay) = self.delays.get(logical_path) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(message) = self.failures.get(logical_path) {
            return Err(LoadError::Failed {
                path: logical_path.to_string(),
                message: message.clone(),
            });
        }

        self.modules
            .get(logical_path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(logical_path.to_string()))
    }
}
