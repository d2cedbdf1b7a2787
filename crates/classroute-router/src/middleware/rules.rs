//! Middleware rule configuration and layered rule tables
//!
//! A page's effective config is built from four layers, lowest priority
//! first:
//!
//! 1. built-in defaults for the page's [`LayoutClass`]
//! 2. the wildcard entry (`"*"`)
//! 3. the entry keyed by the layout class name
//! 4. the entry keyed by the exact page key
//!
//! Each layer only overrides the keys it sets. The table is read on every
//! evaluation, so edits between navigations take effect immediately.
//!
//! # Examples
//!
//! ```
//! use classroute_router::middleware::rules::{LayoutClass, MiddlewareConfig, RuleTable};
//!
//! let mut rules = RuleTable::new();
//! rules.insert("dashboard/public", MiddlewareConfig::new().require_auth(false));
//!
//! let (class, inherited) = rules.effective("dashboard/grades");
//! assert_eq!(class, LayoutClass::Dashboard);
//! assert_eq!(inherited.require_auth, Some(true));
//!
//! let (_, overridden) = rules.effective("dashboard/public");
//! assert_eq!(overridden.require_auth, Some(false));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::session::User;

/// Key of the catch-all rule entry
pub const WILDCARD_KEY: &str = "*";

/// Page keys rendered inside the minimal error layout
const MINIMAL_PAGE_KEYS: &[&str] = &["404", "500", "error", "not-found", "maintenance"];

/// Layout family a page key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutClass {
    Auth,
    Dashboard,
    Minimal,
    Root,
}

impl LayoutClass {
    /// Classifies a page key by its reserved prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use classroute_router::middleware::rules::LayoutClass;
    ///
    /// assert_eq!(LayoutClass::detect("auth/login"), LayoutClass::Auth);
    /// assert_eq!(LayoutClass::detect("dashboard"), LayoutClass::Dashboard);
    /// assert_eq!(LayoutClass::detect("404"), LayoutClass::Minimal);
    /// assert_eq!(LayoutClass::detect("authors"), LayoutClass::Root);
    /// ```
    pub fn detect(page_key: &str) -> Self {
        let group = page_key.split('/').next().unwrap_or("");
        match group {
            "auth" => LayoutClass::Auth,
            "dashboard" => LayoutClass::Dashboard,
            _ if MINIMAL_PAGE_KEYS.contains(&page_key) => LayoutClass::Minimal,
            _ => LayoutClass::Root,
        }
    }

    /// Rule table key for the whole class
    pub fn name(self) -> &'static str {
        match self {
            LayoutClass::Auth => "auth",
            LayoutClass::Dashboard => "dashboard",
            LayoutClass::Minimal => "minimal",
            LayoutClass::Root => "root",
        }
    }

    /// Built-in rules every page of this class starts from
    pub fn defaults(self) -> MiddlewareConfig {
        match self {
            LayoutClass::Dashboard => MiddlewareConfig::new().require_auth(true),
            LayoutClass::Auth => MiddlewareConfig::new().redirect_if_auth(true),
            LayoutClass::Minimal | LayoutClass::Root => MiddlewareConfig::new(),
        }
    }
}

pub type RedirectFn = Arc<dyn Fn(Option<&User>) -> String + Send + Sync>;

/// Where a denied navigation is sent
///
/// String targets may contain `{role}` and `{id}`, filled from the current
/// user, so tables loaded from TOML can still redirect per role.
#[derive(Clone)]
pub enum RedirectTo {
    Path(String),
    Computed(RedirectFn),
}

impl RedirectTo {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(Option<&User>) -> String + Send + Sync + 'static,
    {
        RedirectTo::Computed(Arc::new(f))
    }

    /// Concrete redirect path for `user`
    ///
    /// # Examples
    ///
    /// ```
    /// use classroute_router::middleware::rules::RedirectTo;
    /// use classroute_router::User;
    ///
    /// let to = RedirectTo::from("/dashboard/{role}");
    /// assert_eq!(to.target(Some(&User::new(7, "teacher"))), "/dashboard/teacher");
    /// assert_eq!(to.target(None), "/dashboard");
    /// ```
    pub fn target(&self, user: Option<&User>) -> String {
        match self {
            RedirectTo::Path(template) => expand_template(template, user),
            RedirectTo::Computed(f) => f(user),
        }
    }
}

fn expand_template(template: &str, user: Option<&User>) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let (role, id) = user.map_or(("", ""), |u| (u.role.as_str(), u.id.as_str()));
    let expanded = template.replace("{role}", role).replace("{id}", id);
    let trimmed = expanded.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl fmt::Debug for RedirectTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTo::Path(path) => f.debug_tuple("Path").field(path).finish(),
            RedirectTo::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for RedirectTo {
    fn from(path: &str) -> Self {
        RedirectTo::Path(path.to_string())
    }
}

impl From<String> for RedirectTo {
    fn from(path: String) -> Self {
        RedirectTo::Path(path)
    }
}

impl<'de> Deserialize<'de> for RedirectTo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RedirectTo::Path)
    }
}

/// Inclusive local-hour window in which a page is reachable
///
/// `start_hour <= hour <= end_hour`; overnight windows need two rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeRestriction {
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default = "default_time_message")]
    pub message: String,
}

fn default_time_message() -> String {
    "This page is not available at this time".to_string()
}

impl TimeRestriction {
    pub fn new(start_hour: u32, end_hour: u32, message: impl Into<String>) -> Self {
        Self {
            start_hour,
            end_hour,
            message: message.into(),
        }
    }

    pub fn allows(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }
}

/// One layer of middleware rules; `None` falls through to the layer below
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiddlewareConfig {
    pub require_auth: Option<bool>,
    pub require_role: Option<String>,
    pub redirect_if_auth: Option<bool>,
    pub redirect_to: Option<RedirectTo>,
    pub time_restriction: Option<TimeRestriction>,
    pub restrict_roles: Option<Vec<String>>,
    /// Reason reported when `restrict_roles` denies
    pub restriction_message: Option<String>,
    pub log_access: Option<bool>,
    pub notify_on_access: Option<bool>,
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_auth(mut self, value: bool) -> Self {
        self.require_auth = Some(value);
        self
    }

    pub fn require_role(mut self, role: impl Into<String>) -> Self {
        self.require_role = Some(role.into());
        self
    }

    pub fn redirect_if_auth(mut self, value: bool) -> Self {
        self.redirect_if_auth = Some(value);
        self
    }

    pub fn redirect_to(mut self, to: impl Into<RedirectTo>) -> Self {
        self.redirect_to = Some(to.into());
        self
    }

    pub fn redirect_with<F>(self, f: F) -> Self
    where
        F: Fn(Option<&User>) -> String + Send + Sync + 'static,
    {
        self.redirect_to(RedirectTo::computed(f))
    }

    pub fn time_restriction(mut self, restriction: TimeRestriction) -> Self {
        self.time_restriction = Some(restriction);
        self
    }

    pub fn restrict_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrict_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn restriction_message(mut self, message: impl Into<String>) -> Self {
        self.restriction_message = Some(message.into());
        self
    }

    pub fn log_access(mut self, value: bool) -> Self {
        self.log_access = Some(value);
        self
    }

    pub fn notify_on_access(mut self, value: bool) -> Self {
        self.notify_on_access = Some(value);
        self
    }

    /// Overlays every key `upper` defines onto `self`
    pub fn merge(&mut self, upper: &MiddlewareConfig) {
        fn overlay<T: Clone>(slot: &mut Option<T>, upper: &Option<T>) {
            if let Some(value) = upper {
                *slot = Some(value.clone());
            }
        }

        overlay(&mut self.require_auth, &upper.require_auth);
        overlay(&mut self.require_role, &upper.require_role);
        overlay(&mut self.redirect_if_auth, &upper.redirect_if_auth);
        overlay(&mut self.redirect_to, &upper.redirect_to);
        overlay(&mut self.time_restriction, &upper.time_restriction);
        overlay(&mut self.restrict_roles, &upper.restrict_roles);
        overlay(&mut self.restriction_message, &upper.restriction_message);
        overlay(&mut self.log_access, &upper.log_access);
        overlay(&mut self.notify_on_access, &upper.notify_on_access);
    }

    /// Redirect target for a denial, or `fallback` when none is configured
    pub fn redirect_for(&self, user: Option<&User>, fallback: &str) -> String {
        self.redirect_to
            .as_ref()
            .map_or_else(|| fallback.to_string(), |to| to.target(user))
    }
}

/// Keyed middleware rules: page keys, layout class names and `"*"`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    rules: HashMap<String, MiddlewareConfig>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a rule table from a TOML file of `[rules."<key>"]` tables
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule table: {:?}", path))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to parse rule table: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid middleware rule table")
    }

    /// Sets the rules for `key`, returning the previous entry
    pub fn insert(&mut self, key: impl Into<String>, config: MiddlewareConfig) -> Option<MiddlewareConfig> {
        self.rules.insert(key.into(), config)
    }

    pub fn get(&self, key: &str) -> Option<&MiddlewareConfig> {
        self.rules.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MiddlewareConfig> {
        self.rules.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MiddlewareConfig> {
        self.rules.remove(key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Layout class and merged config for a page key
    pub fn effective(&self, page_key: &str) -> (LayoutClass, MiddlewareConfig) {
        let class = LayoutClass::detect(page_key);
        let mut config = class.defaults();

        for key in [WILDCARD_KEY, class.name(), page_key] {
            if let Some(layer) = self.rules.get(key) {
                config.merge(layer);
            }
        }

        (class, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", LayoutClass::Root)]
    #[case("about", LayoutClass::Root)]
    #[case("auth", LayoutClass::Auth)]
    #[case("auth/register", LayoutClass::Auth)]
    #[case("dashboard/admin/users", LayoutClass::Dashboard)]
    #[case("dashboards", LayoutClass::Root)]
    #[case("maintenance", LayoutClass::Minimal)]
    #[case("not-found", LayoutClass::Minimal)]
    fn test_detect_layout_class(#[case] key: &str, #[case] expected: LayoutClass) {
        assert_eq!(LayoutClass::detect(key), expected);
    }

    #[test]
    fn test_layers_override_only_defined_keys() {
        let mut rules = RuleTable::new();
        rules.insert(WILDCARD_KEY, MiddlewareConfig::new().log_access(true));
        rules.insert("dashboard", MiddlewareConfig::new().require_role("teacher"));
        rules.insert(
            "dashboard/admin",
            MiddlewareConfig::new().require_role("admin").log_access(false),
        );

        let (_, config) = rules.effective("dashboard/admin");
        assert_eq!(config.require_auth, Some(true));
        assert_eq!(config.require_role.as_deref(), Some("admin"));
        assert_eq!(config.log_access, Some(false));

        let (_, config) = rules.effective("dashboard/grades");
        assert_eq!(config.require_role.as_deref(), Some("teacher"));
        assert_eq!(config.log_access, Some(true));
    }

    #[test]
    fn test_empty_page_entry_keeps_inherited_defaults() {
        let mut rules = RuleTable::new();
        rules.insert("dashboard/reports", MiddlewareConfig::new());
        let (_, config) = rules.effective("dashboard/reports");
        assert_eq!(config.require_auth, Some(true));
    }

    #[test]
    fn test_parse_rule_table_toml() {
        let rules = RuleTable::from_toml_str(
            r#"
            [rules."*"]
            log_access = true

            [rules."auth/login"]
            redirect_to = "/dashboard/{role}"

            [rules."dashboard/finance"]
            require_role = "admin"
            time_restriction = { start_hour = 8, end_hour = 17, message = "Finance is closed" }

            [rules."dashboard/exams"]
            restrict_roles = ["student"]
            "#,
        )
        .unwrap();

        assert_eq!(rules.len(), 4);
        let (_, finance) = rules.effective("dashboard/finance");
        assert_eq!(
            finance.time_restriction,
            Some(TimeRestriction::new(8, 17, "Finance is closed"))
        );
        assert_eq!(finance.log_access, Some(true));

        let (_, login) = rules.effective("auth/login");
        let user = User::new(3, "student");
        assert_eq!(login.redirect_for(Some(&user), "/"), "/dashboard/student");
    }

    #[test]
    fn test_unknown_rule_key_rejected() {
        assert!(RuleTable::from_toml_str("[rules.about]\nrequire_login = true").is_err());
    }

    #[test]
    fn test_time_window_is_inclusive() {
        let window = TimeRestriction::new(8, 17, "closed");
        assert!(window.allows(8));
        assert!(window.allows(17));
        assert!(!window.allows(7));
        assert!(!window.allows(18));
    }

    #[test]
    fn test_computed_redirect() {
        let config = MiddlewareConfig::new()
            .redirect_with(|user| format!("/dashboard/{}", user.map_or("guest", |u| u.role.as_str())));
        assert_eq!(config.redirect_for(None, "/"), "/dashboard/guest");
        assert_eq!(MiddlewareConfig::new().redirect_for(None, "/dashboard"), "/dashboard");
    }
}
