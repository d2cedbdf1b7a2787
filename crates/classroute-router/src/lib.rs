//! # Classroute Router
//!
//! Client-side routing and access-control engine for a single-page school
//! management application. It maps URLs to page modules, wraps them in
//! persistent layouts, runs an authorization pipeline before every render
//! and owns exactly one mount point.
//!
//! - Static routes (`/about`)
//! - Dynamic parameters (`/users/[id]`, `/users/:id`)
//! - Wildcards (`/files/*`)
//! - Convention-based auto-discovery of unregistered pages
//! - Layered middleware rules (layout defaults, `*`, layout group, page)
//! - History integration and same-origin link interception
//!
//! ## Collaborators
//!
//! Everything outside the engine is injected:
//!
//! - [`ModuleLoader`]: asynchronously turns a logical module path into a
//!   [`Module`] exporting a page or layout factory
//! - [`SessionProvider`]: who is signed in
//! - [`BrowserHost`]: location, history and painting
//!
//! In-memory implementations ([`StaticModuleLoader`], [`StoredSession`],
//! [`MemoryHost`]) let the engine run natively.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use classroute_router::{
//!     MemoryHost, Module, Router, RouterConfig, StaticModuleLoader, StoredSession,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let loader = StaticModuleLoader::new()
//!     .with_module("app/layout.js", Module::slot_layout("app-shell", "School"))
//!     .with_module("app/about.js", Module::markup_page("about-page", "About us"));
//! let host = MemoryHost::new("https://school.test/").with_mount_point("#app");
//!
//! let mut router = Router::new(
//!     RouterConfig::default(),
//!     Arc::new(loader),
//!     Arc::new(StoredSession::in_memory()),
//!     host,
//! );
//! router.route("/about", "app/about.js").unwrap();
//! router.start("#app").await.unwrap();
//!
//! router.navigate("/about").await;
//! let painted = router.host().painted("#app").unwrap();
//! assert!(painted.contains("<about-page>About us</about-page>"));
//! # }
//! ```

pub mod clock;
pub mod component;
pub mod config;
pub mod error;
pub mod host;
pub mod layout;
pub mod loader;
pub mod middleware;
pub mod path;
pub mod resolver;
pub mod route;
pub mod router;
pub mod session;
pub mod views;

pub use clock::{Clock, FixedClock, SystemClock};
pub use component::{Layout, MarkupPage, Module, ModuleExport, Mountable, SlotLayout};
pub use config::RouterConfig;
pub use error::{LoadError, MountError, PatternError, StartError};
pub use host::{BrowserHost, ClickEvent, LinkDecision, Location, MemoryHost, NavigationEvent};
pub use layout::{LayoutRef, LayoutResolver, MountContent, MountPoint};
pub use loader::{ModuleLoader, StaticModuleLoader};
pub use middleware::{
    AccessContext, AccessDecision, AccessEvent, AccessNotifier, Denial, LayoutClass, Middleware,
    MiddlewareConfig, MiddlewarePipeline, RedirectTo, RuleTable, TimeRestriction, TracingNotifier,
};
pub use path::{parse_query, QueryParams};
pub use resolver::{
    ComponentRef, ComponentResolver, FailedAttempt, ResolutionFailure, ResolveError, ResolvedComponent,
};
pub use route::{match_route, PatternKind, RouteMatch, RouteParams, RoutePattern};
pub use router::{Router, RouterState};
pub use session::{MemorySessionStore, SessionProvider, SessionStore, StoredSession, User};
