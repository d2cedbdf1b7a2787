//! Access side effects: structured access logs and notifications

use chrono::{DateTime, Utc};
use tracing::info;

/// Tracing target of access log events
pub const ACCESS_TARGET: &str = "classroute::access";

/// One allowed page access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub page_key: String,
    /// `None` for anonymous visitors
    pub role: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or("anonymous")
    }
}

/// Receives `notify_on_access` events
pub trait AccessNotifier: Send + Sync {
    fn notify(&self, event: &AccessEvent);
}

/// Forwards notifications to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl AccessNotifier for TracingNotifier {
    fn notify(&self, event: &AccessEvent) {
        info!(
            target: ACCESS_TARGET,
            role = %event.role_label(),
            page = %event.page_key,
            timestamp = %event.timestamp.to_rfc3339(),
            "Page access notification"
        );
    }
}

/// Writes the access log line for an event
pub(crate) fn log_access(event: &AccessEvent) {
    info!(
        target: ACCESS_TARGET,
        role = %event.role_label(),
        page = %event.page_key,
        timestamp = %event.timestamp.to_rfc3339(),
        "Page accessed"
    );
}
