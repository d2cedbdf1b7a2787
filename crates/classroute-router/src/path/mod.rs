//! Path and query-string utilities
//!
//! All functions are **pure**: given same input, always produce same output with no side effects.
//! No trailing-slash normalization happens anywhere in this module; callers
//! that want `/about/` to equal `/about` must normalize before routing.

use std::borrow::Cow;

use indexmap::IndexMap;

/// Parsed query parameters, in order of first appearance
pub type QueryParams = IndexMap<String, String>;

/// Parses a query string into decoded key/value pairs
///
/// - A leading `?` is ignored
/// - A key without `=` yields an empty value
/// - `+` is kept literally (component decoding, not form decoding)
/// - A pair whose key or value has malformed percent-encoding is dropped;
///   the rest of the query still parses
/// - Repeated keys: the last value wins
///
/// # Examples
///
/// ```
/// use classroute_router::path::parse_query;
///
/// let q = parse_query("a=1&b=2");
/// assert_eq!(q.get("a").map(String::as_str), Some("1"));
/// assert_eq!(q.get("b").map(String::as_str), Some("2"));
///
/// assert_eq!(parse_query("flag").get("flag").map(String::as_str), Some(""));
/// assert!(parse_query("").is_empty());
///
/// // Malformed pair dropped, the rest survives
/// let q = parse_query("bad=%zz&good=%20ok");
/// assert!(q.get("bad").is_none());
/// assert_eq!(q.get("good").map(String::as_str), Some(" ok"));
/// ```
pub fn parse_query(search: &str) -> QueryParams {
    let search = search.strip_prefix('?').unwrap_or(search);

    search
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

/// Strict percent-decoding of one URL component
///
/// Returns `None` when a `%` is not followed by two hex digits or when the
/// decoded bytes are not valid UTF-8.
pub fn decode_component(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit())
    });

    if !well_formed {
        return None;
    }

    urlencoding::decode(raw).ok().map(Cow::into_owned)
}

/// Logical page key: the path without its leading slash
///
/// ```
/// use classroute_router::path::page_key;
///
/// assert_eq!(page_key("/dashboard/admin"), "dashboard/admin");
/// assert_eq!(page_key("/"), "");
/// ```
pub fn page_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Non-empty path segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// First path segment ("route group"), if any
///
/// ```
/// use classroute_router::path::route_group;
///
/// assert_eq!(route_group("/dashboard/admin"), Some("dashboard"));
/// assert_eq!(route_group("/"), None);
/// ```
pub fn route_group(path: &str) -> Option<&str> {
    path.split('/').find(|s| !s.is_empty())
}

/// Clean equivalent of an `index.html`-suffixed path
///
/// Returns `Cow::Borrowed` when nothing needs to change.
///
/// ```
/// use classroute_router::path::strip_index_html;
///
/// assert_eq!(strip_index_html("/index.html"), "/");
/// assert_eq!(strip_index_html("/about/index.html"), "/about");
/// assert_eq!(strip_index_html("/about"), "/about");
/// ```
pub fn strip_index_html(path: &str) -> Cow<'_, str> {
    match path.strip_suffix("index.html") {
        Some(prefix) if prefix.ends_with('/') => {
            let trimmed = prefix.trim_end_matches('/');
            if trimmed.is_empty() {
                Cow::Borrowed("/")
            } else {
                Cow::Owned(trimmed.to_string())
            }
        }
        _ => Cow::Borrowed(path),
    }
}
