//! Diagnostic views painted into the mount point when navigation fails
//!
//! Which view is shown depends on the stage that failed: no route at all,
//! a resolved component that failed to mount, auto-discovery exhausting its
//! candidates, or a redirect chain that never settles.

use maud::{html, Markup};

use crate::error::MountError;
use crate::resolver::ResolutionFailure;

/// Nothing matched the path
pub fn not_found_view(path: &str) -> Markup {
    html! {
        section.route-error.not-found data-view="not-found" {
            h1 { "404" }
            p { "Page not found: " code { (path) } }
            a href="/" { "Back to home" }
        }
    }
}

/// A component was resolved but failed while mounting
pub fn error_view(path: &str, error: &MountError) -> Markup {
    html! {
        section.route-error data-view="error" {
            h1 { "Something went wrong" }
            p { "The page " code { (path) } " could not be displayed." }
            pre.error-detail { (error.to_string()) }
            button type="button" onclick="window.location.reload()" { "Reload page" }
        }
    }
}

/// Auto-discovery tried every candidate and none loaded
pub fn resolution_error_view(failure: &ResolutionFailure) -> Markup {
    html! {
        section.route-error data-view="resolution-error" {
            h1 { "Component not found" }
            p { "No page component could be resolved for " code { (failure.path) } "." }
            h2 { "Attempted paths" }
            ol.attempts {
                @for attempt in &failure.attempts {
                    li {
                        code.attempt-path { (attempt.module_path) }
                        " "
                        span.attempt-error { (attempt.error.to_string()) }
                    }
                }
            }
        }
    }
}

/// Middleware redirects did not settle on a page
pub fn blocked_view(path: &str, chain: &[String], reason: &str) -> Markup {
    html! {
        section.route-error data-view="blocked" {
            h1 { "Access blocked" }
            p { "Navigation to " code { (path) } " was redirected too many times." }
            p.reason { (reason) }
            @if !chain.is_empty() {
                ol.redirects {
                    @for hop in chain {
                        li { code { (hop) } }
                    }
                }
            }
        }
    }
}
