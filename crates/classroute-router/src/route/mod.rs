//! Route module: pattern compilation and matching
//!
//! Contains pure functional components only. No state lives here; the
//! registries that hold compiled patterns belong to the resolver.

pub mod matcher;
pub mod params;
pub mod pattern;

// Re-export commonly used types
pub use matcher::{match_route, RouteMatch};
pub use params::RouteParams;
pub use pattern::{classify, PatternKind, RoutePattern};
