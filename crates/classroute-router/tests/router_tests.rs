//! Integration tests for the navigation orchestrator
//!
//! Each test drives a `Router` over a `MemoryHost`, a `StaticModuleLoader`
//! and an in-memory session, then inspects history and painted markup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use classroute_router::resolver::discovery::candidates;
use classroute_router::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::sync::mpsc;

type Session = StoredSession<MemorySessionStore>;

/// Page that renders the route state the router attached to it
struct ProbePage {
    state: std::collections::HashMap<String, Value>,
}

impl Mountable for ProbePage {
    fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    fn set_state(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    fn render(&self) -> String {
        let field = |key: &str| {
            self.state
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string())
        };
        format!(
            "<probe-page params={} query={} info={}></probe-page>",
            field("routeParams"),
            field("queryParams"),
            field("routeInfo")
        )
    }
}

fn probe_module() -> Module {
    Module::page("probe-page", || {
        Ok(Box::new(ProbePage {
            state: Default::default(),
        }))
    })
}

fn school_loader() -> StaticModuleLoader {
    StaticModuleLoader::new()
        .with_module("app/layout.js", Module::slot_layout("app-shell", "School"))
        .with_module("app/dashboard/layout.js", Module::slot_layout("dashboard-shell", "Dashboard"))
        .with_module("app/page.js", Module::markup_page("home-page", "Home"))
        .with_module("app/about.js", Module::markup_page("about-page", "About"))
        .with_module("app/auth/login/page.js", Module::markup_page("login-page", "Sign in"))
        .with_module("app/dashboard/page.js", Module::markup_page("dashboard-page", "Overview"))
        .with_module("app/dashboard/teacher/page.js", Module::markup_page("teacher-page", "Classes"))
}

/// Routes engine logs to the test output; `RUST_LOG=debug` shows resolution steps
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn build(
    loader: StaticModuleLoader,
    url: &str,
) -> (Router<MemoryHost>, Arc<StaticModuleLoader>, Arc<Session>) {
    init_tracing();
    let loader = Arc::new(loader);
    let session = Arc::new(StoredSession::in_memory());
    let host = MemoryHost::new(url).with_mount_point("#app");
    let router = Router::new(RouterConfig::default(), loader.clone(), session.clone(), host);
    (router, loader, session)
}

fn html(router: &Router<MemoryHost>) -> String {
    router.host().painted("#app").unwrap_or_default().to_string()
}

fn current_path(router: &Router<MemoryHost>) -> String {
    router.host().location().path_and_query()
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_start_fails_without_mount_point() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/");
    let err = router.start("#root").await.unwrap_err();
    assert!(matches!(err, StartError::MountPointNotFound(ref s) if s == "#root"));
    assert_eq!(router.state(), RouterState::Uninitialized);
    assert_eq!(router.host().paint_count(), 0);
}

#[tokio::test]
async fn test_start_fails_without_default_layout() {
    let loader = StaticModuleLoader::new().with_module("app/page.js", Module::markup_page("home-page", "Home"));
    let (mut router, _, _) = build(loader, "https://school.test/");
    let err = router.start("#app").await.unwrap_err();
    assert!(matches!(err, StartError::DefaultLayout { .. }));
    assert_eq!(router.state(), RouterState::Uninitialized);
}

#[tokio::test]
async fn test_start_renders_current_url_and_rejects_restart() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/");
    router.route("/", "app/page.js").unwrap();
    router.start_default().await.unwrap();

    assert_eq!(router.state(), RouterState::Ready);
    assert!(html(&router).contains("<home-page>Home</home-page>"));
    assert!(matches!(router.start("#app").await, Err(StartError::AlreadyStarted)));
}

#[tokio::test]
async fn test_navigation_before_ready_is_deferred() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/");
    router.route("/about", "app/about.js").unwrap();

    router.navigate("/about").await;
    assert_eq!(router.host().paint_count(), 0);
    assert_eq!(router.host().history(), vec!["/", "/about"]);

    // Clicks are not intercepted until the router is ready
    let decision = router
        .handle_event(NavigationEvent::LinkClick(ClickEvent::primary("/about")))
        .await;
    assert_eq!(decision, LinkDecision::PassThrough);

    router.start("#app").await.unwrap();
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

// ============================================================================
// Resolution and caching
// ============================================================================

#[tokio::test]
async fn test_static_route_preloaded_and_loaded_once() {
    let (mut router, loader, _) = build(school_loader(), "https://school.test/");
    router.route("/about", "app/about.js").unwrap();
    router.start("#app").await.unwrap();
    assert_eq!(loader.load_count("app/about.js"), 1);

    router.navigate("/about").await;
    router.navigate("/").await;
    router.navigate("/about").await;

    assert_eq!(loader.load_count("app/about.js"), 1);
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

#[tokio::test]
async fn test_static_preload_runs_concurrently() {
    let delay = Duration::from_millis(200);
    let loader = school_loader()
        .with_module("app/grades.js", Module::markup_page("grades-page", "Grades"))
        .with_module("app/library.js", Module::markup_page("library-page", "Library"))
        .with_delay("app/grades.js", delay)
        .with_delay("app/library.js", delay);
    let (mut router, loader, _) = build(loader, "https://school.test/");
    router.route("/", "app/page.js").unwrap();
    router.route("/grades", "app/grades.js").unwrap();
    router.route("/library", "app/library.js").unwrap();

    let started = Instant::now();
    router.start("#app").await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= delay);
    assert!(elapsed < delay * 2, "preload took {:?}", elapsed);
    assert_eq!(loader.load_count("app/grades.js"), 1);
    assert_eq!(loader.load_count("app/library.js"), 1);
}

#[tokio::test]
async fn test_contact_auto_discovery_uses_first_candidate() {
    let loader = school_loader()
        .with_module("app/contact.js", Module::markup_page("contact-page", "Contact"))
        .with_module("app/contact/page.js", Module::markup_page("shadowed-page", "Never"));
    let (mut router, loader, _) = build(loader, "https://school.test/");
    router.start("#app").await.unwrap();

    router.navigate("/contact").await;
    assert!(html(&router).contains("<contact-page>Contact</contact-page>"));
    assert_eq!(loader.load_count("app/contact.js"), 1);
    assert_eq!(loader.load_count("app/contact/page.js"), 0);

    router.navigate("/about").await;
    let loads = loader.total_loads();
    router.navigate("/contact").await;
    assert_eq!(loader.total_loads(), loads);
    assert!(html(&router).contains("<contact-page>Contact</contact-page>"));
}

#[tokio::test]
async fn test_unresolvable_path_lists_every_attempt() {
    let loader = school_loader().with_failure("app/missing/thing/page.js", "SyntaxError: unexpected token");
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.start("#app").await.unwrap();

    router.navigate("/missing/thing").await;

    let expected: Vec<String> = candidates("/missing/thing", router.config())
        .into_iter()
        .map(|c| c.module_path)
        .collect();
    let failure = router.resolver().last_failure("/missing/thing").unwrap();
    assert_eq!(failure.attempted_paths(), expected);
    assert_eq!(failure.errors().len(), expected.len());

    let painted = html(&router);
    assert!(painted.contains("data-view=\"resolution-error\""));
    for path in &expected {
        assert!(painted.contains(path.as_str()), "missing attempt {path} in view");
    }
    assert!(painted.contains("SyntaxError: unexpected token"));
}

#[tokio::test]
async fn test_not_found_view_without_auto_discovery() {
    init_tracing();
    let loader = Arc::new(school_loader());
    let config = RouterConfig {
        auto_discovery: false,
        ..RouterConfig::default()
    };
    let host = MemoryHost::new("https://school.test/nowhere").with_mount_point("#app");
    let mut router = Router::new(config, loader.clone(), Arc::new(StoredSession::in_memory()), host);
    router.start("#app").await.unwrap();

    assert!(html(&router).contains("data-view=\"not-found\""));
    assert!(html(&router).contains("/nowhere"));
    // Only the default layout was loaded; no page candidates were probed
    assert_eq!(loader.attempts(), vec!["app/layout.js"]);
}

#[tokio::test]
async fn test_mount_failure_renders_error_view() {
    let loader = school_loader()
        .with_module(
            "app/reports.js",
            Module::page("reports-page", || anyhow::bail!("grade service unavailable")),
        )
        .with_module("app/broken.js", Module::page("broken-page", || panic!("constructor exploded")));
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.start("#app").await.unwrap();

    router.navigate("/reports").await;
    let painted = html(&router);
    assert!(painted.contains("data-view=\"error\""));
    assert!(painted.contains("grade service unavailable"));
    assert!(painted.contains("Reload page"));

    router.navigate("/broken").await;
    assert!(html(&router).contains("constructor exploded"));

    // The router keeps working afterwards
    router.navigate("/about").await;
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

// ============================================================================
// Route state
// ============================================================================

#[tokio::test]
async fn test_route_state_attached_to_page() {
    let loader = school_loader().with_module("app/users/[id]/page.js", probe_module());
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.route("/users/[id]", "app/users/[id]/page.js").unwrap();
    router.start("#app").await.unwrap();

    router.navigate("/users/42?tab=grades").await;
    let painted = html(&router);
    assert!(painted.contains(r#"params={"id":"42"}"#));
    assert!(painted.contains(r#"query={"tab":"grades"}"#));
    assert!(painted.contains(r#""pattern":"/users/[id]""#));
    assert!(painted.contains(r#""path":"/users/42""#));

    // Empty params and query are not set at all
    router.route("/probe", probe_module()).unwrap();
    router.navigate("/probe").await;
    let painted = html(&router);
    assert!(painted.contains("params=none query=none"));
    assert!(painted.contains(r#""pattern":"/probe""#));
}

#[tokio::test]
async fn test_shared_module_reports_matched_pattern() {
    let loader = school_loader().with_module("app/person.js", probe_module());
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.route("/users/[id]", "app/person.js").unwrap();
    router.route("/students/[id]", "app/person.js").unwrap();
    router.start("#app").await.unwrap();

    router.navigate("/users/1").await;
    assert!(html(&router).contains(r#""pattern":"/users/[id]""#));

    router.navigate("/students/1").await;
    let painted = html(&router);
    assert!(painted.contains(r#""pattern":"/students/[id]""#));
    assert!(painted.contains(r#""path":"/students/1""#));
}

#[tokio::test]
async fn test_discovered_dynamic_page_gets_params() {
    let loader = school_loader().with_module("app/students/[id]/page.js", probe_module());
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.start("#app").await.unwrap();

    router.navigate("/students/s-17").await;
    assert!(html(&router).contains(r#"params={"id":"s-17"}"#));
}

// ============================================================================
// Layouts
// ============================================================================

#[tokio::test]
async fn test_layout_reused_until_group_changes() {
    let (mut router, _, session) = build(school_loader(), "https://school.test/");
    session.sign_in(&User::new(7, "teacher")).unwrap();
    router.route("/", "app/page.js").unwrap();
    router.route("/about", "app/about.js").unwrap();
    router.start("#app").await.unwrap();
    assert_eq!(router.mount_point().layouts_created(), 1);

    router.navigate("/about").await;
    assert_eq!(router.mount_point().layouts_created(), 1);
    assert_eq!(router.mount_point().layout_kind(), Some("app/layout.js"));
    assert!(html(&router).contains("<header>School</header>"));

    router.navigate("/dashboard").await;
    assert_eq!(router.mount_point().layouts_created(), 2);
    assert_eq!(router.mount_point().layout_kind(), Some("app/dashboard/layout.js"));
    assert!(html(&router).contains("<dashboard-shell><header>Dashboard</header>"));

    router.navigate("/dashboard/teacher").await;
    assert_eq!(router.mount_point().layouts_created(), 2);
    assert!(html(&router).contains("<teacher-page>Classes</teacher-page>"));
}

// ============================================================================
// History and events
// ============================================================================

#[tokio::test]
async fn test_index_html_normalized() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/about/index.html?ref=nav");
    router.route("/about", "app/about.js").unwrap();
    router.start("#app").await.unwrap();

    assert_eq!(current_path(&router), "/about?ref=nav");
    assert_eq!(router.host().history().len(), 1);
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

#[tokio::test]
async fn test_link_interception() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/");
    router.route("/about", "app/about.js").unwrap();
    router.start("#app").await.unwrap();

    let external = router
        .handle_event(NavigationEvent::LinkClick(ClickEvent::primary("https://example.org/")))
        .await;
    assert_eq!(external, LinkDecision::PassThrough);

    let new_tab = router
        .handle_event(NavigationEvent::LinkClick(ClickEvent::primary("/about").with_target("_blank")))
        .await;
    assert_eq!(new_tab, LinkDecision::PassThrough);
    assert_eq!(router.host().history(), vec!["/"]);

    let internal = router
        .handle_event(NavigationEvent::LinkClick(ClickEvent::primary("/about")))
        .await;
    assert_eq!(internal, LinkDecision::Intercepted);
    assert_eq!(router.host().history(), vec!["/", "/about"]);
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

#[tokio::test]
async fn test_popstate_renders_previous_entry() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/");
    router.route("/", "app/page.js").unwrap();
    router.route("/about", "app/about.js").unwrap();
    router.start("#app").await.unwrap();
    router.navigate("/about").await;

    let event = router.host_mut().back().unwrap();
    router.handle_event(event).await;
    assert!(html(&router).contains("<home-page>Home</home-page>"));

    let event = router.host_mut().forward().unwrap();
    router.handle_event(event).await;
    assert!(html(&router).contains("<about-page>About</about-page>"));
}

#[tokio::test]
async fn test_later_navigation_wins() {
    let loader = school_loader()
        .with_module("app/slow.js", Module::markup_page("slow-page", "Slow"))
        .with_delay("app/slow.js", Duration::from_millis(30))
        .with_module("app/fast.js", Module::markup_page("fast-page", "Fast"));
    let (mut router, _, _) = build(loader, "https://school.test/");
    router.start("#app").await.unwrap();

    let (tx, rx) = mpsc::channel(8);
    tx.send(NavigationEvent::LinkClick(ClickEvent::primary("/slow"))).await.unwrap();
    tx.send(NavigationEvent::LinkClick(ClickEvent::primary("/fast"))).await.unwrap();
    drop(tx);

    assert_eq!(router.run_events(rx).await, 2);
    assert_eq!(current_path(&router), "/fast");
    let painted = html(&router);
    assert!(painted.contains("<fast-page>Fast</fast-page>"));
    assert!(!painted.contains("slow-page"));
}

// ============================================================================
// Middleware-driven navigation
// ============================================================================

#[tokio::test]
async fn test_unauthenticated_dashboard_redirects_to_login() {
    let (mut router, _, _) = build(school_loader(), "https://school.test/dashboard/teacher");
    router.start("#app").await.unwrap();

    assert_eq!(current_path(&router), "/auth/login");
    assert!(html(&router).contains("<login-page>Sign in</login-page>"));
}

#[tokio::test]
async fn test_signed_in_user_bounced_from_login() {
    let (mut router, _, session) = build(school_loader(), "https://school.test/");
    router.rules_mut().insert(
        "auth/login",
        MiddlewareConfig::new().redirect_with(|user| {
            format!("/dashboard/{}", user.map_or("", |u| u.role.as_str()))
        }),
    );
    router.start("#app").await.unwrap();
    session.sign_in(&User::new(7, "teacher")).unwrap();

    router.navigate("/auth/login").await;
    assert_eq!(current_path(&router), "/dashboard/teacher");
    assert!(html(&router).contains("<teacher-page>Classes</teacher-page>"));
}

#[tokio::test]
async fn test_redirect_loop_is_blocked() {
    let (mut router, _, session) = build(school_loader(), "https://school.test/");
    session.sign_in(&User::new(1, "student")).unwrap();
    router.rules_mut().insert(
        "dashboard/a",
        MiddlewareConfig::new().require_role("admin").redirect_to("/dashboard/b"),
    );
    router.rules_mut().insert(
        "dashboard/b",
        MiddlewareConfig::new().require_role("admin").redirect_to("/dashboard/a"),
    );
    router.start("#app").await.unwrap();

    router.navigate("/dashboard/a").await;
    let painted = html(&router);
    assert!(painted.contains("data-view=\"blocked\""));
    assert!(painted.contains("admin access required"));
}
