//! First-match-wins route matching
//!
//! Patterns are tried strictly in registration order. There is no priority
//! sorting: a general pattern registered before a more specific one shadows
//! it, so register `/users/new` before `/users/[id]`.

use super::params::RouteParams;
use super::pattern::RoutePattern;

/// Result of matching a concrete path against the pattern set
#[derive(Debug, Clone)]
pub struct RouteMatch<T> {
    /// Raw text of the pattern that matched
    pub pattern: String,
    /// Whatever was registered alongside the pattern
    pub target: T,
    /// Captured parameters in declaration order
    pub params: RouteParams,
}

/// Matches `path` against `patterns`, returning the first hit
///
/// # Examples
///
/// ```
/// use classroute_router::route::{match_route, RoutePattern};
///
/// let routes = vec![
///     (RoutePattern::compile("/users/new").unwrap(), "new-user"),
///     (RoutePattern::compile("/users/[id]").unwrap(), "user"),
/// ];
///
/// let m = match_route("/users/new", &routes).unwrap();
/// assert_eq!(m.target, "new-user");
///
/// let m = match_route("/users/42", &routes).unwrap();
/// assert_eq!(m.params.get("id"), Some("42"));
///
/// assert!(match_route("/posts", &routes).is_none());
/// ```
pub fn match_route<T: Clone>(path: &str, patterns: &[(RoutePattern, T)]) -> Option<RouteMatch<T>> {
    patterns.iter().find_map(|(pattern, target)| {
        pattern.captures(path).map(|params| RouteMatch {
            pattern: pattern.raw().to_string(),
            target: target.clone(),
            params,
        })
    })
}
