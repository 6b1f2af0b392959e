//! 导航守卫
//!
//! 流程：请求 -> 验证(Guard) -> 处理 -> 加载。
//! 守卫在 await 期间不持有任何 RefCell 借用。

use std::collections::BTreeMap;

use crate::auth;
use crate::context::AppContext;
use crate::error::{ConsoleError, ConsoleResult};
use crate::permission::ensure_routes;
use crate::session::SessionPhase;

use super::route::Location;

/// 单次导航最多跟随的重定向次数
const MAX_REDIRECTS: usize = 10;
const REDIRECT_QUERY: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Next,
    Redirect { location: Location, replace: bool },
}

impl GuardDecision {
    fn redirect(full_path: &str, replace: bool) -> Self {
        GuardDecision::Redirect {
            location: Location::parse(full_path),
            replace,
        }
    }
}

/// **核心方法：权限守卫**
///
/// `from` 的 `redirect` 参数被消费后会清空。
pub async fn before_each(ctx: &AppContext, to: &Location, from: &mut Location) -> GuardDecision {
    let paths = &ctx.config.paths;

    // 根路径进入首页，路由已就绪时直接放行
    if from.path == paths.root
        && to.path == paths.home
        && ctx.session.phase() == SessionPhase::RoutesBuilt
    {
        return GuardDecision::Next;
    }

    let token = ctx.session.get_token();

    // --- Step 1: 白名单（登录页） ---
    if to.path == paths.login {
        if token.is_some() {
            let is_session_timeout = ctx.session.get_session_timeout();
            match auth::after_login_action(ctx).await {
                Ok(_) if !is_session_timeout => {
                    let target = to.query_value(REDIRECT_QUERY).unwrap_or("/");
                    tracing::info!("[Router] Already authenticated, resume {}", target);
                    return GuardDecision::redirect(target, false);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("[Router] Silent login resume failed: {}", e),
            }
        }
        return GuardDecision::Next;
    }

    // --- Step 2: 未登录 ---
    if token.is_none() {
        let ignore_auth = {
            let router = ctx.router.borrow();
            router.resolve(&to.path).is_some_and(|r| r.meta.ignore_auth)
        };
        if ignore_auth {
            return GuardDecision::Next;
        }

        tracing::info!("[Router] Access denied for {}, redirect to login", to.full_path);
        let mut query = BTreeMap::new();
        query.insert(REDIRECT_QUERY.to_string(), to.full_path.clone());
        return GuardDecision::Redirect {
            location: Location::with_query(&paths.login, query),
            replace: true,
        };
    }

    // --- Step 3: 本次会话首次拉取用户信息 ---
    if ctx.session.get_last_update_time().is_zero() {
        if let Err(e) = auth::get_user_info_action(ctx).await {
            tracing::warn!("[Router] Get user info failed: {}", e);
            // 401 已在请求层完成登出
            if !e.is_unauthorized() {
                auth::teardown(ctx);
            }
            return GuardDecision::redirect(&paths.login, true);
        }
    }

    // --- Step 4: 构建并安装路由（每个会话一次） ---
    if ensure_routes(ctx).await {
        return GuardDecision::redirect(&to.full_path, true);
    }

    // --- Step 5: 404 与 redirect 参数 ---
    let is_not_found = {
        let router = ctx.router.borrow();
        router.resolve(&to.path).is_none_or(|r| r.is_not_found())
    };

    if is_not_found {
        from.clear_query(REDIRECT_QUERY);
        if from.path == paths.login && to.full_path != paths.home {
            return GuardDecision::redirect(&paths.home, true);
        }
        return GuardDecision::Next;
    }

    if let Some(redirect) = from.query_value(REDIRECT_QUERY).map(str::to_string) {
        from.clear_query(REDIRECT_QUERY);
        if redirect == to.full_path {
            return GuardDecision::Next;
        }
        return GuardDecision::redirect(&redirect, true);
    }

    GuardDecision::Next
}

/// 导航到目标地址：跟随路由重定向，执行守卫，提交结果
pub async fn navigate(ctx: &AppContext, target: &str, replace: bool) -> ConsoleResult<Location> {
    let mut to = Location::parse(target);
    let mut replace = replace;

    for _ in 0..MAX_REDIRECTS {
        let record_redirect = {
            let router = ctx.router.borrow();
            router.resolve(&to.path).and_then(|r| r.redirect.clone())
        };
        if let Some(redirect) = record_redirect.filter(|r| *r != to.path) {
            tracing::debug!("[Router] Route redirect {} -> {}", to.path, redirect);
            to = Location::parse(&redirect);
            continue;
        }

        let mut from = ctx.router.borrow().current_location().clone();
        match before_each(ctx, &to, &mut from).await {
            GuardDecision::Next => {
                ctx.router.borrow_mut().commit(to.clone(), replace);
                tracing::debug!("[Router] Navigated to {}", to.full_path);
                return Ok(to);
            }
            GuardDecision::Redirect {
                location,
                replace: redirect_replace,
            } => {
                tracing::debug!("[Router] Guard redirect {} -> {}", to.full_path, location.full_path);
                to = location;
                replace = replace || redirect_replace;
            }
        }
    }

    Err(ConsoleError::invalid_input("Too many redirects").in_op_with("router.navigate", target))
}
