//! Error types for the routing engine
//!
//! Navigation itself never fails outward: these errors describe what went
//! wrong so the router can pick a diagnostic view or abort startup.

use thiserror::Error;

/// Invalid route pattern at registration time
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatternError {
    #[error("Unclosed '[' in route pattern '{pattern}'")]
    UnclosedBracket { pattern: String },

    #[error("Empty parameter name in route pattern '{pattern}'")]
    EmptyParam { pattern: String },

    #[error("Parameter '{name}' declared twice in route pattern '{pattern}'")]
    DuplicateParam { pattern: String, name: String },

    #[error("Route pattern '{pattern}' does not compile: {message}")]
    Regex { pattern: String, message: String },
}

/// A module could not be obtained from the loader
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module '{path}' does not export a {expected}")]
    WrongExport { path: String, expected: &'static str },

    #[error("Failed to load module '{path}': {message}")]
    Failed { path: String, message: String },
}

/// A resolved page or layout failed while being instantiated or mounted
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MountError {
    #[error("Component '{tag}' failed to mount: {message}")]
    Component { tag: String, message: String },

    #[error("Component '{tag}' panicked while mounting: {message}")]
    Panicked { tag: String, message: String },
}

/// Fatal startup failures; the router is left un-started
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Mount point '{0}' not found")]
    MountPointNotFound(String),

    #[error("Default layout '{path}' could not be loaded: {source}")]
    DefaultLayout {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("Router already started")]
    AlreadyStarted,
}

/// Extracts a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
