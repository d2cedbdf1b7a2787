//! Application-defined middleware run after the built-in rules

use super::rules::{LayoutClass, MiddlewareConfig};
use super::AccessDecision;
use crate::session::User;

/// What a custom middleware gets to look at
#[derive(Debug, Clone, Copy)]
pub struct AccessContext<'a> {
    pub path: &'a str,
    pub page_key: &'a str,
    pub layout_class: LayoutClass,
    pub user: Option<&'a User>,
    /// The merged rules that already passed
    pub config: &'a MiddlewareConfig,
}

/// A custom access check
///
/// Returning `Err` or panicking denies the navigation; neither escapes the
/// pipeline.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str {
        "custom"
    }

    fn check(&self, ctx: &AccessContext<'_>) -> anyhow::Result<AccessDecision>;
}

/// Adapts a closure into a named [`Middleware`]
pub struct FnMiddleware<F> {
    name: String,
    check: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&AccessContext<'_>) -> anyhow::Result<AccessDecision> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&AccessContext<'_>) -> anyhow::Result<AccessDecision> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &AccessContext<'_>) -> anyhow::Result<AccessDecision> {
        (self.check)(ctx)
    }
}
