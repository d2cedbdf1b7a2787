//! The browser surface the router drives
//!
//! [`BrowserHost`] covers what the router needs from the page it lives in:
//! the current location, history entries, the mount point and painting.
//! [`MemoryHost`] implements it without a browser.
//!
//! Events flow the other way as [`NavigationEvent`] values. Whether a click
//! may be handled internally is decided synchronously by [`link_target`],
//! since the browser glue has to call `preventDefault` before returning.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use url::Url;

/// Parsed browser location; `search` keeps its leading `?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub pathname: String,
    pub search: String,
}

impl Location {
    /// Parses an absolute URL; the fragment is dropped
    ///
    /// # Examples
    ///
    /// ```
    /// use classroute_router::host::Location;
    ///
    /// let loc = Location::parse("https://school.test/grades?term=2#top").unwrap();
    /// assert_eq!(loc.origin, "https://school.test");
    /// assert_eq!(loc.pathname, "/grades");
    /// assert_eq!(loc.search, "?term=2");
    /// ```
    pub fn parse(href: &str) -> Option<Self> {
        Url::parse(href).ok().map(|url| Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}{}", self.origin, self.pathname, self.search)
    }

    /// Path plus query, the form pushed into history
    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }

    /// Resolves `href` against this location
    pub fn join(&self, href: &str) -> Option<Location> {
        let base = Url::parse(&self.href()).ok()?;
        base.join(href).ok().map(|url| Self::from_url(&url))
    }

    pub fn same_origin(&self, other: &Location) -> bool {
        self.origin == other.origin
    }
}

/// History, mount point and painting as seen by the router
pub trait BrowserHost: Send {
    fn location(&self) -> Location;

    /// Adds a history entry for `url` (path, optionally with query)
    fn push_state(&mut self, url: &str);

    /// Rewrites the current history entry
    fn replace_state(&mut self, url: &str);

    fn has_mount_point(&self, selector: &str) -> bool;

    /// Replaces the subtree of the element matching `selector`
    fn paint(&mut self, selector: &str, html: &str);
}

/// A delegated click on an anchor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickEvent {
    pub href: String,
    pub target: Option<String>,
    pub download: bool,
    /// 0 is the primary button
    pub button: u16,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
}

impl ClickEvent {
    /// Plain primary-button click on `href`
    pub fn primary(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl_key || self.meta_key || self.shift_key || self.alt_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Back/forward moved the current history entry
    PopState,
    LinkClick(ClickEvent),
}

/// What the browser glue should do with the original event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    /// Handled by the router; call `preventDefault`
    Intercepted,
    /// Let the browser perform its default action
    PassThrough,
}

/// Internal path for a click the router should handle, if any
///
/// Only unmodified primary-button clicks on same-origin links without a
/// foreign `target` or `download` are taken over. Bare fragment links are
/// left to the browser.
///
/// # Examples
///
/// ```
/// use classroute_router::host::{link_target, ClickEvent, Location};
///
/// let here = Location::parse("https://school.test/grades").unwrap();
/// assert_eq!(
///     link_target(&ClickEvent::primary("/assignments?due=today"), &here),
///     Some("/assignments?due=today".to_string())
/// );
/// assert_eq!(link_target(&ClickEvent::primary("https://example.com/"), &here), None);
/// assert_eq!(link_target(&ClickEvent::primary("#top"), &here), None);
/// ```
pub fn link_target(click: &ClickEvent, current: &Location) -> Option<String> {
    if click.button != 0 || click.has_modifier() || click.download {
        return None;
    }
    if matches!(click.target.as_deref(), Some(t) if !t.is_empty() && t != "_self") {
        return None;
    }

    let href = click.href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let destination = current.join(href)?;
    if !destination.same_origin(current) {
        return None;
    }

    Some(destination.path_and_query())
}

/// In-memory browser: a history stack plus painted markup per selector
#[derive(Debug, Clone)]
pub struct MemoryHost {
    entries: Vec<Location>,
    index: usize,
    mount_points: HashSet<String>,
    painted: HashMap<String, String>,
    paints: usize,
}

impl MemoryHost {
    /// Host whose first history entry is `initial_url` (absolute)
    pub fn new(initial_url: &str) -> Self {
        let initial = Location::parse(initial_url).unwrap_or_else(|| {
            warn!(url = initial_url, "Invalid initial URL, using http://localhost/");
            Location {
                origin: "http://localhost".to_string(),
                pathname: "/".to_string(),
                search: String::new(),
            }
        });

        Self {
            entries: vec![initial],
            index: 0,
            mount_points: HashSet::new(),
            painted: HashMap::new(),
            paints: 0,
        }
    }

    pub fn with_mount_point(mut self, selector: impl Into<String>) -> Self {
        self.mount_points.insert(selector.into());
        self
    }

    /// Moves back one entry, yielding the event the browser would fire
    pub fn back(&mut self) -> Option<NavigationEvent> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(NavigationEvent::PopState)
    }

    pub fn forward(&mut self) -> Option<NavigationEvent> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(NavigationEvent::PopState)
    }

    /// Path and query of every entry, oldest first
    pub fn history(&self) -> Vec<String> {
        self.entries.iter().map(Location::path_and_query).collect()
    }

    pub fn painted(&self, selector: &str) -> Option<&str> {
        self.painted.get(selector).map(String::as_str)
    }

    pub fn paint_count(&self) -> usize {
        self.paints
    }

    fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    fn resolve(&self, url: &str) -> Option<Location> {
        let resolved = self.current().join(url);
        if resolved.is_none() {
            warn!(url, "Ignoring history update with invalid URL");
        }
        resolved
    }
}

impl BrowserHost for MemoryHost {
    fn location(&self) -> Location {
        self.current().clone()
    }

    fn push_state(&mut self, url: &str) {
        if let Some(location) = self.resolve(url) {
            self.entries.truncate(self.index + 1);
            self.entries.push(location);
            self.index += 1;
        }
    }

    fn replace_state(&mut self, url: &str) {
        if let Some(location) = self.resolve(url) {
            self.entries[self.index] = location;
        }
    }

    fn has_mount_point(&self, selector: &str) -> bool {
        self.mount_points.contains(selector)
    }

    fn paint(&mut self, selector: &str, html: &str) {
        self.painted.insert(selector.to_string(), html.to_string());
        self.paints += 1;
    }
}
