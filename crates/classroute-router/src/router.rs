//! The navigation orchestrator
//!
//! Ties resolution, layouts and middleware together for one mount point.
//!
//! ```text
//! Uninitialized ──start()──▶ Preloading ──preloads done──▶ Ready
//! ```
//!
//! Navigations requested before `Ready` update history but do not render;
//! `start` renders whatever the current entry is once preloading finishes.
//! Each render runs to completion before the next event is handled, so a
//! later navigation always paints last.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use maud::Markup;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::component::Mountable;
use crate::config::RouterConfig;
use crate::error::{panic_message, MountError, PatternError, StartError};
use crate::host::{link_target, BrowserHost, Location, LinkDecision, NavigationEvent};
use crate::layout::{LayoutResolver, MountPoint};
use crate::loader::ModuleLoader;
use crate::middleware::{AccessDecision, AccessNotifier, MiddlewarePipeline, RuleTable};
use crate::path::{parse_query, route_group, strip_index_html, QueryParams};
use crate::resolver::{ComponentRef, ComponentResolver, ResolveError, ResolvedComponent};
use crate::route::PatternKind;
use crate::session::SessionProvider;
use crate::views;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Uninitialized,
    Preloading,
    Ready,
}

pub struct Router<H: BrowserHost> {
    config: Arc<RouterConfig>,
    state: RouterState,
    host: H,
    session: Arc<dyn SessionProvider>,
    resolver: ComponentResolver,
    layouts: LayoutResolver,
    pipeline: MiddlewarePipeline,
    mount: MountPoint,
}

impl<H: BrowserHost> Router<H> {
    pub fn new(
        config: RouterConfig,
        loader: Arc<dyn ModuleLoader>,
        session: Arc<dyn SessionProvider>,
        host: H,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            state: RouterState::Uninitialized,
            host,
            session,
            resolver: ComponentResolver::new(config.clone(), loader.clone()),
            layouts: LayoutResolver::new(config.clone(), loader),
            pipeline: MiddlewarePipeline::new(config.clone()),
            mount: MountPoint::new(config.mount_selector.clone()),
            config,
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.pipeline = self.pipeline.with_rules(rules);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.pipeline = self.pipeline.with_clock(clock);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AccessNotifier>) -> Self {
        self.pipeline = self.pipeline.with_notifier(notifier);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn mount_point(&self) -> &MountPoint {
        &self.mount
    }

    pub fn resolver(&self) -> &ComponentResolver {
        &self.resolver
    }

    pub fn middleware(&self) -> &MiddlewarePipeline {
        &self.pipeline
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewarePipeline {
        &mut self.pipeline
    }

    /// Rule table consulted on every render; edits apply to the next one
    pub fn rules_mut(&mut self) -> &mut RuleTable {
        self.pipeline.rules_mut()
    }

    /// Registers a route, classifying it as static, dynamic or wildcard
    pub fn route(
        &mut self,
        pattern: &str,
        component: impl Into<ComponentRef>,
    ) -> Result<PatternKind, PatternError> {
        self.resolver.register(pattern, component)
    }

    /// Starts on the configured mount selector
    pub async fn start_default(&mut self) -> Result<(), StartError> {
        let selector = self.config.mount_selector.clone();
        self.start(&selector).await
    }

    /// Locates the mount point, preloads, becomes `Ready` and renders
    ///
    /// On error the router stays `Uninitialized`.
    pub async fn start(&mut self, mount_selector: &str) -> Result<(), StartError> {
        if self.state != RouterState::Uninitialized {
            return Err(StartError::AlreadyStarted);
        }

        if !self.host.has_mount_point(mount_selector) {
            error!(selector = mount_selector, "Mount point not found, aborting startup");
            return Err(StartError::MountPointNotFound(mount_selector.to_string()));
        }

        self.mount = MountPoint::new(mount_selector);
        self.state = RouterState::Preloading;
        debug!(selector = mount_selector, "Preloading default layout and static routes");

        let (layout, preloaded) = tokio::join!(
            self.layouts.preload_default(),
            self.resolver.preload_static()
        );

        if let Err(source) = layout {
            let path = self.config.default_layout_path();
            error!(layout = %path, error = %source, "Default layout unavailable, aborting startup");
            self.state = RouterState::Uninitialized;
            return Err(StartError::DefaultLayout { path, source });
        }

        self.state = RouterState::Ready;
        info!(selector = mount_selector, preloaded, "Router ready");

        self.render().await;
        Ok(())
    }

    /// Pushes a history entry for `path` and renders it
    pub async fn navigate(&mut self, path: &str) {
        info!(path, "Navigating");
        self.host.push_state(path);
        self.render().await;
    }

    /// Renders the current location
    ///
    /// Failures never escape: the outcome is the page, a redirect, or a
    /// diagnostic view in the mount point.
    pub async fn render(&mut self) {
        if self.state != RouterState::Ready {
            debug!(state = ?self.state, "Render deferred until ready");
            return;
        }

        let mut location = self.host.location();
        let clean = strip_index_html(&location.pathname).into_owned();
        if clean != location.pathname {
            debug!(from = %location.pathname, to = %clean, "Normalizing index URL");
            self.host.replace_state(&format!("{}{}", clean, location.search));
            location = self.host.location();
        }

        let Some(location) = self.apply_middleware(location) else {
            return;
        };
        self.show(&location).await;
    }

    /// Routes one browser event
    ///
    /// Link clicks report whether the browser default must be prevented.
    /// `PopState` is always handled and reports `Intercepted`. Before the
    /// router is ready nothing is intercepted.
    pub async fn handle_event(&mut self, event: NavigationEvent) -> LinkDecision {
        if self.state != RouterState::Ready {
            debug!(?event, "Event before router is ready");
            return LinkDecision::PassThrough;
        }

        match event {
            NavigationEvent::PopState => {
                self.render().await;
                LinkDecision::Intercepted
            }
            NavigationEvent::LinkClick(click) => match link_target(&click, &self.host.location()) {
                Some(path) => {
                    self.navigate(&path).await;
                    LinkDecision::Intercepted
                }
                None => LinkDecision::PassThrough,
            },
        }
    }

    /// Handles events from a channel in arrival order until it closes
    ///
    /// Returns the number of events handled.
    pub async fn run_events(&mut self, mut events: mpsc::Receiver<NavigationEvent>) -> usize {
        let mut handled = 0;
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
            handled += 1;
        }
        debug!(handled, "Navigation event channel closed");
        handled
    }

    /// Follows middleware redirects; `None` once a blocked view is shown
    fn apply_middleware(&mut self, mut location: Location) -> Option<Location> {
        let origin = location.pathname.clone();
        let mut chain: Vec<String> = Vec::new();

        loop {
            let denial = match self.pipeline.evaluate(&location.pathname, self.session.as_ref()) {
                AccessDecision::Allow => return Some(location),
                AccessDecision::Deny(denial) => denial,
            };

            let target = denial.redirect_path;
            let target_path = target.split('?').next().unwrap_or("").to_string();
            let looping = target_path == location.pathname
                || target_path == origin
                || chain.iter().any(|hop| hop == &target);

            if looping || chain.len() >= self.config.max_redirects {
                error!(
                    path = %origin,
                    redirect = %target,
                    hops = chain.len(),
                    reason = %denial.reason,
                    "Redirect loop, blocking navigation"
                );
                chain.push(target);
                self.show_view(views::blocked_view(&origin, &chain, &denial.reason));
                return None;
            }

            info!(from = %location.pathname, to = %target, reason = %denial.reason, "Redirecting");
            self.host.replace_state(&target);
            chain.push(target);
            location = self.host.location();
        }
    }

    async fn show(&mut self, location: &Location) {
        let path = location.pathname.as_str();
        let query = parse_query(&location.search);

        let component = match self.resolver.resolve(path).await {
            Ok(component) => component,
            Err(ResolveError::NotFound { .. }) => {
                warn!(path, "No route matches");
                self.show_view(views::not_found_view(path));
                return;
            }
            Err(ResolveError::Unresolved(failure)) => {
                error!(
                    path,
                    attempts = ?failure.attempted_paths(),
                    "Component resolution failed"
                );
                self.show_view(views::resolution_error_view(&failure));
                return;
            }
        };

        if let Err(error) = self.mount_page(path, &query, &component).await {
            error!(path, error = %error, "Page failed to mount");
            self.show_view(views::error_view(path, &error));
            return;
        }

        let html = self.mount.render();
        self.host.paint(self.mount.selector(), &html);
        info!(path, module = %component.module_path, "Rendered");
    }

    async fn mount_page(
        &mut self,
        path: &str,
        query: &QueryParams,
        component: &ResolvedComponent,
    ) -> Result<(), MountError> {
        let layout = self
            .layouts
            .resolve_layout_for_group(route_group(path))
            .await
            .map_err(|e| MountError::Component {
                tag: "layout".to_string(),
                message: e.to_string(),
            })?;

        let mut page = component.module.instantiate_page()?;
        attach_route_state(page.as_mut(), path, query, component);
        run_on_mount(page.as_mut(), component.module.mount_tag())?;

        let reused = self.layouts.mount(&layout, &mut self.mount)?;
        debug!(path, layout = %layout.kind, reused, "Layout ready");

        LayoutResolver::set_content(&mut self.mount, page).map_err(|_| MountError::Component {
            tag: component.module.mount_tag().to_string(),
            message: "no layout mounted".to_string(),
        })
    }

    fn show_view(&mut self, view: Markup) {
        self.mount.show_view(view.into_string());
        let html = self.mount.render();
        self.host.paint(self.mount.selector(), &html);
    }
}

fn attach_route_state(
    page: &mut dyn Mountable,
    path: &str,
    query: &QueryParams,
    component: &ResolvedComponent,
) {
    let params = serde_json::to_value(&component.params).unwrap_or(Value::Null);
    let query_value = serde_json::to_value(query).unwrap_or(Value::Null);

    if !component.params.is_empty() {
        page.set_state("routeParams", params.clone());
    }
    if !query.is_empty() {
        page.set_state("queryParams", query_value.clone());
    }
    page.set_state(
        "routeInfo",
        json!({
            "path": path,
            "params": params,
            "query": query_value,
            "pattern": component.pattern,
        }),
    );
}

fn run_on_mount(page: &mut dyn Mountable, tag: &str) -> Result<(), MountError> {
    match catch_unwind(AssertUnwindSafe(|| page.on_mount())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(MountError::Component {
            tag: tag.to_string(),
            message: format!("{:#}", e),
        }),
        Err(payload) => Err(MountError::Panicked {
            tag: tag.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}
