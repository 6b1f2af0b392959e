use super::*;
use crate::auth;
use crate::config::ConsoleConfig;
use crate::context::AppContext;
use crate::http::ErrorMessageMode;
use crate::notify::RecordingNotifier;
use crate::permission::{PermissionMode, ensure_routes};
use crate::request::{MockReply, MockTransport};
use crate::session::{SessionEvent, SessionPhase};
use cms_console_shared::{HttpMethod, LoginParams};
use serde_json::{Value, json};
use std::cell::Cell;
use std::rc::Rc;

// =========================================================
// 辅助函数
// =========================================================

const CURRENT_USER: &str = "/api/v1/auth/current";
const MENUS: &str = "/api/v1/menus";

struct Env {
    transport: Rc<MockTransport>,
    notifier: Rc<RecordingNotifier>,
    ctx: AppContext,
}

fn env_with(mode: PermissionMode) -> Env {
    let transport = Rc::new(MockTransport::new());
    let notifier = Rc::new(RecordingNotifier::default());
    let mut config = ConsoleConfig::default();
    config.permission_mode = mode;
    config.request.retry.wait_ms = 1;

    let ctx = AppContext::builder(transport.clone())
        .notifier(notifier.clone())
        .config(config)
        .build()
        .unwrap();
    ctx.init();
    Env {
        transport,
        notifier,
        ctx,
    }
}

fn env() -> Env {
    env_with(PermissionMode::Dynamic)
}

fn backend_menus() -> Value {
    json!([{
        "id": 1, "name": "Content", "type": 1, "path": "/content", "sort": 1,
        "children": [
            {"id": 2, "parent_id": 1, "name": "Articles", "type": 2, "path": "articles",
             "component": "/views/web/articles/index.vue", "permission": "content:articles"},
            {"id": 3, "parent_id": 2, "name": "Add", "type": 3, "permission": "content:articles:add"}
        ]
    }])
}

/// 已登录（有 token）但本次会话尚未拉取用户信息
fn signed_in(env: &Env, roles: &[&str]) {
    env.ctx.session.set_token(Some("tk".into()));
    env.transport.ok(
        HttpMethod::Get,
        CURRENT_USER,
        json!({"username": "root", "roles": roles, "permissions": ["content:articles"]}),
    );
    env.transport.ok(HttpMethod::Get, MENUS, backend_menus());
}

fn logout_counter(env: &Env) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    env.ctx.session.subscribe(move |e| {
        if *e == SessionEvent::LoggedOut {
            c.set(c.get() + 1);
        }
    });
    count
}

// =========================================================
// 未登录
// =========================================================

#[tokio::test]
async fn missing_token_redirects_to_login_with_target() {
    let env = env();
    let loc = env.ctx.navigate("/web/news?tab=2").await.unwrap();

    assert_eq!(loc.path, "/login");
    assert_eq!(loc.query_value("redirect"), Some("/web/news?tab=2"));
    assert_eq!(env.ctx.phase(), SessionPhase::Unauthenticated);
    assert_eq!(env.transport.requests.borrow().len(), 0);
}

#[tokio::test]
async fn ignore_auth_route_needs_no_token() {
    let env = env();
    env.ctx.router.borrow_mut().add_route(
        RouteNode::new("/public/help", "help").meta(RouteMeta {
            ignore_auth: true,
            ..Default::default()
        }),
    );
    let loc = env.ctx.navigate("/public/help").await.unwrap();
    assert_eq!(loc.path, "/public/help");
}

#[tokio::test]
async fn root_without_session_goes_to_login() {
    let env = env();
    let loc = env.ctx.navigate("/").await.unwrap();
    assert_eq!(loc.path, "/login");
    assert_eq!(loc.query_value("redirect"), Some("/general/dashboard"));
}

// =========================================================
// 首次导航：用户信息与路由构建
// =========================================================

#[tokio::test]
async fn first_navigation_builds_routes_once() {
    let env = env();
    signed_in(&env, &["admin"]);

    let loc = env.ctx.navigate("/content/articles").await.unwrap();
    assert_eq!(loc.path, "/content/articles");
    assert_eq!(env.ctx.phase(), SessionPhase::RoutesBuilt);
    assert_eq!(env.transport.count(HttpMethod::Get, CURRENT_USER), 1);
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 1);
    assert_eq!(env.ctx.session.get_role_list(), vec!["admin".to_string()]);

    {
        let router = env.ctx.router.borrow();
        assert!(router.has_route("content:articles"));
        assert!(router.has_route("web-news"));
        assert!(router.has_route("system-users"));
        // BUTTON 不生成路由
        assert!(!router.has_route("content:articles:add"));
    }

    // 后续导航不再拉取
    let loc = env.ctx.navigate("/web").await.unwrap();
    assert_eq!(loc.path, "/web/news");
    assert_eq!(env.transport.count(HttpMethod::Get, CURRENT_USER), 1);
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 1);

    let menus = env.ctx.get_menus();
    assert_eq!(menus[0].path, "/content");
    assert_eq!(menus[0].children[0].path, "/content/articles");
    assert!(menus.iter().any(|m| m.path == "/system"));
    assert!(!env.ctx.session.permission().last_build_menu_time().is_zero());
}

#[tokio::test]
async fn routes_are_filtered_by_role() {
    let env = env();
    signed_in(&env, &["editor"]);

    env.ctx.navigate("/web/news").await.unwrap();
    assert!(!env.ctx.router.borrow().has_route("system-users"));
    assert!(env.ctx.router.borrow().has_route("web-news"));

    // 无权限的路径落到 404
    let loc = env.ctx.navigate("/system/users").await.unwrap();
    assert_eq!(loc.path, "/system/users");
    assert!(
        env.ctx
            .router
            .borrow()
            .current_route()
            .is_some_and(|r| r.is_not_found())
    );
    assert!(env.ctx.get_menus().iter().all(|m| m.path != "/system"));
}

#[tokio::test]
async fn menu_failure_falls_back_to_static_routes() {
    let env = env();
    env.ctx.session.set_token(Some("tk".into()));
    env.transport
        .ok(HttpMethod::Get, CURRENT_USER, json!({"username": "root", "roles": ["admin"]}));
    env.transport
        .reply(HttpMethod::Get, MENUS, MockReply::Response(500, json!({})));

    let loc = env.ctx.navigate("/web/news").await.unwrap();
    assert_eq!(loc.path, "/web/news");
    assert!(!env.ctx.router.borrow().has_route("content:articles"));
    assert!(env.ctx.session.permission().back_menu_list().is_empty());
    assert!(env.ctx.session.permission().last_build_menu_time().is_zero());
    assert_eq!(env.notifier.messages.borrow().len(), 1);
}

#[tokio::test]
async fn static_mode_never_fetches_menus() {
    let env = env_with(PermissionMode::Static);
    signed_in(&env, &["admin"]);

    env.ctx.navigate("/storage").await.unwrap();
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 0);
    assert_eq!(env.ctx.current_location().path, "/storage/index");
}

#[tokio::test]
async fn user_info_failure_tears_down_session() {
    let env = env();
    env.ctx.session.set_token(Some("tk".into()));
    env.transport
        .reply(HttpMethod::Get, CURRENT_USER, MockReply::Response(500, json!({})));
    let logouts = logout_counter(&env);

    let loc = env.ctx.navigate("/web/news").await.unwrap();
    assert_eq!(loc.path, "/login");
    assert!(env.ctx.session.get_token().is_none());
    assert_eq!(logouts.get(), 1);
    assert_eq!(env.notifier.destroyed.get(), 1);
}

#[tokio::test]
async fn user_info_401_logs_out_once() {
    let env = env();
    env.ctx.session.set_token(Some("expired".into()));
    env.transport
        .reply(HttpMethod::Get, CURRENT_USER, MockReply::Response(401, json!({})));
    let logouts = logout_counter(&env);

    let loc = env.ctx.navigate("/web/news").await.unwrap();
    assert_eq!(loc.path, "/login");
    assert_eq!(logouts.get(), 1);
    assert_eq!(env.transport.count(HttpMethod::Get, CURRENT_USER), 1);
}

// =========================================================
// 登录、redirect 参数与 404
// =========================================================

#[tokio::test]
async fn login_resumes_redirect_target() {
    let env = env();
    env.ctx.navigate("/web/news").await.unwrap();
    assert_eq!(env.ctx.current_location().path, "/login");

    env.transport
        .ok(HttpMethod::Post, "/api/v1/auth/login", json!({"token": "fresh"}));
    env.transport
        .ok(HttpMethod::Get, CURRENT_USER, json!({"username": "root", "roles": ["admin"]}));
    env.transport.ok(HttpMethod::Get, MENUS, json!([]));

    let logged_in = Rc::new(Cell::new(false));
    let flag = logged_in.clone();
    env.ctx.session.subscribe(move |e| {
        if *e == SessionEvent::LoggedIn {
            flag.set(true);
        }
    });

    let params = LoginParams {
        email: "admin@example.com".into(),
        password: "secret".into(),
    };
    let user = auth::login(&env.ctx, &params, ErrorMessageMode::Modal)
        .await
        .unwrap();

    assert_eq!(user.unwrap().username, "root");
    assert!(logged_in.get());
    assert_eq!(env.ctx.session.get_token().as_deref(), Some("fresh"));
    assert_eq!(env.ctx.current_location().full_path, "/web/news");
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 1);
}

#[tokio::test]
async fn login_page_with_session_resumes_silently() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.ctx.navigate("/web/news").await.unwrap();

    let loc = env
        .ctx
        .navigate("/login?redirect=%2Fstorage%2Findex")
        .await
        .unwrap();
    assert_eq!(loc.path, "/storage/index");
    // 登录页再次确认用户信息，但不重复构建路由
    assert_eq!(env.transport.count(HttpMethod::Get, CURRENT_USER), 2);
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 1);
}

#[tokio::test]
async fn unknown_path_from_login_goes_home() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.ctx.navigate("/web/news").await.unwrap();
    env.ctx
        .router
        .borrow_mut()
        .commit(Location::parse("/login"), false);

    let loc = env.ctx.navigate("/does/not/exist").await.unwrap();
    assert_eq!(loc.path, "/general/dashboard");

    // 其他页面进入未知路径则停在 404
    let loc = env.ctx.navigate("/does/not/exist").await.unwrap();
    assert_eq!(loc.path, "/does/not/exist");
}

// =========================================================
// 登出
// =========================================================

#[tokio::test]
async fn logout_resets_routes_and_state() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.ctx.navigate("/web/news").await.unwrap();

    env.ctx.logout().await.unwrap();

    let router = env.ctx.router.borrow();
    assert_eq!(router.current_location().path, "/login");
    assert!(!router.has_route("web-news"));
    assert!(router.has_route(LOGIN_ROUTE_NAME));
    assert!(router.has_route(PAGE_NOT_FOUND_NAME));
    drop(router);

    assert_eq!(env.ctx.phase(), SessionPhase::Unauthenticated);
    assert!(!env.ctx.session.permission().is_dynamic_added_route());
    assert!(env.ctx.session.get_role_list().is_empty());
    assert_eq!(env.notifier.destroyed.get(), 1);
}

#[tokio::test]
async fn forced_401_sends_protected_page_back_to_login() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.ctx.navigate("/web/news").await.unwrap();
    env.transport.reply(
        HttpMethod::Get,
        "/api/v1/news",
        MockReply::Response(401, json!({"message": "token expired"})),
    );

    let err = env.ctx.http.get::<Value>("/news", None).await.unwrap_err();
    assert!(err.is_unauthorized());

    let loc = env.ctx.current_location();
    assert_eq!(loc.path, "/login");
    assert_eq!(loc.query_value("redirect"), Some("/web/news"));
    assert!(!env.ctx.router.borrow().has_route("web-news"));
}

// =========================================================
// 路由构建并发
// =========================================================

#[tokio::test]
async fn concurrent_builds_install_routes_once() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.transport.set_yields(3);

    let (first, second) = tokio::join!(ensure_routes(&env.ctx), ensure_routes(&env.ctx));

    assert!(first);
    assert!(!second);
    assert_eq!(env.transport.count(HttpMethod::Get, MENUS), 1);
    assert!(env.ctx.router.borrow().has_route("content:articles"));
    assert!(!env.ctx.session.permission().is_building());
}

#[tokio::test]
async fn reset_during_build_discards_routes() {
    let env = env();
    signed_in(&env, &["admin"]);
    env.transport.set_yields(3);

    let (installed, _) = tokio::join!(ensure_routes(&env.ctx), async {
        tokio::task::yield_now().await;
        env.ctx.session.logout();
    });

    assert!(!installed);
    assert!(!env.ctx.router.borrow().has_route("web-news"));
    assert!(!env.ctx.session.permission().is_dynamic_added_route());
}
