//! Access control evaluated before every render
//!
//! [`MiddlewarePipeline::evaluate`] turns a path and the current session into
//! an [`AccessDecision`]. Built-in rule checks run first in a fixed order,
//! then access side effects, then custom middleware in registration order.
//! The first denial wins. Nothing in here returns an error or panics out.

pub mod custom;
pub mod notify;
pub mod rules;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RouterConfig;
use crate::error::panic_message;
use crate::path::page_key;
use crate::session::{SessionProvider, User};

pub use custom::{AccessContext, FnMiddleware, Middleware};
pub use notify::{AccessEvent, AccessNotifier, TracingNotifier};
pub use rules::{LayoutClass, MiddlewareConfig, RedirectTo, RuleTable, TimeRestriction};

/// A refused navigation and where to send the user instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub redirect_path: String,
    pub reason: String,
}

/// Outcome of evaluating a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(Denial),
}

impl AccessDecision {
    pub fn deny(redirect_path: impl Into<String>, reason: impl Into<String>) -> Self {
        AccessDecision::Deny(Denial {
            redirect_path: redirect_path.into(),
            reason: reason.into(),
        })
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(denial) => Some(denial),
        }
    }
}

pub struct MiddlewarePipeline {
    config: Arc<RouterConfig>,
    rules: RuleTable,
    middleware: Vec<Arc<dyn Middleware>>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn AccessNotifier>,
}

impl MiddlewarePipeline {
    pub fn new(config: Arc<RouterConfig>) -> Self {
        Self {
            config,
            rules: RuleTable::new(),
            middleware: Vec::new(),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AccessNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    /// Appends a custom middleware; they run in registration order
    pub fn push(&mut self, middleware: impl Middleware + 'static) {
        self.middleware.push(Arc::new(middleware));
    }

    pub fn push_fn<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&AccessContext<'_>) -> anyhow::Result<AccessDecision> + Send + Sync + 'static,
    {
        self.push(FnMiddleware::new(name, check));
    }

    /// Decides whether `path` may be rendered for the current session
    pub fn evaluate(&self, path: &str, session: &dyn SessionProvider) -> AccessDecision {
        let page_key = page_key(path);
        let (layout_class, effective) = self.rules.effective(page_key);
        let authenticated = session.is_authenticated();
        let user = session.current_user();

        if let Some(denial) = self.check_rules(&effective, authenticated, user.as_ref()) {
            warn!(
                page = page_key,
                redirect = %denial.redirect_path,
                reason = %denial.reason,
                "Navigation denied"
            );
            return AccessDecision::Deny(denial);
        }

        self.emit_side_effects(page_key, &effective, user.as_ref());

        let ctx = AccessContext {
            path,
            page_key,
            layout_class,
            user: user.as_ref(),
            config: &effective,
        };
        for middleware in &self.middleware {
            if let AccessDecision::Deny(denial) = self.run_custom(middleware.as_ref(), &ctx) {
                warn!(
                    page = page_key,
                    middleware = middleware.name(),
                    redirect = %denial.redirect_path,
                    reason = %denial.reason,
                    "Navigation denied by middleware"
                );
                return AccessDecision::Deny(denial);
            }
        }

        debug!(page = page_key, class = layout_class.name(), "Navigation allowed");
        AccessDecision::Allow
    }

    fn check_rules(
        &self,
        config: &MiddlewareConfig,
        authenticated: bool,
        user: Option<&User>,
    ) -> Option<Denial> {
        let deny = |redirect_path: String, reason: String| {
            Some(Denial {
                redirect_path,
                reason,
            })
        };

        if config.require_auth == Some(true) && !authenticated {
            return deny(self.config.login_path.clone(), "Authentication required".to_string());
        }

        if let Some(role) = &config.require_role {
            if user.map_or(true, |u| &u.role != role) {
                return deny(
                    config.redirect_for(user, &self.config.dashboard_path),
                    format!("{} access required", role),
                );
            }
        }

        if config.redirect_if_auth == Some(true) && authenticated {
            return deny(
                config.redirect_for(user, "/"),
                "User already authenticated".to_string(),
            );
        }

        if let Some(window) = &config.time_restriction {
            let hour = self.clock.current_hour();
            if !window.allows(hour) {
                return deny(self.config.maintenance_path.clone(), window.message.clone());
            }
        }

        if let (Some(restricted), Some(user)) = (&config.restrict_roles, user) {
            if restricted.contains(&user.role) {
                let reason = config
                    .restriction_message
                    .clone()
                    .unwrap_or_else(|| "Access restricted for your role".to_string());
                return deny(config.redirect_for(Some(user), &self.config.dashboard_path), reason);
            }
        }

        None
    }

    fn emit_side_effects(&self, page_key: &str, config: &MiddlewareConfig, user: Option<&User>) {
        let should_log = config.log_access == Some(true);
        let should_notify = config.notify_on_access == Some(true);
        if !should_log && !should_notify {
            return;
        }

        let event = AccessEvent {
            page_key: page_key.to_string(),
            role: user.map(|u| u.role.clone()),
            timestamp: self.clock.timestamp(),
        };

        if should_log {
            notify::log_access(&event);
        }
        if should_notify {
            let notifier = &self.notifier;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| notifier.notify(&event))) {
                warn!(page = page_key, error = %panic_message(payload.as_ref()), "Access notifier panicked");
            }
        }
    }

    fn run_custom(&self, middleware: &dyn Middleware, ctx: &AccessContext<'_>) -> AccessDecision {
        let outcome = catch_unwind(AssertUnwindSafe(|| middleware.check(ctx)));
        let message = match outcome {
            Ok(Ok(decision)) => return decision,
            Ok(Err(error)) => error.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(middleware = middleware.name(), error = %message, "Middleware failed");
        AccessDecision::deny(
            self.config.dashboard_path.clone(),
            format!("Middleware error: {}", message),
        )
    }
}
