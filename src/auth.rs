//! 认证流程
//!
//! 登录、登录后处理、拉取当前用户与登出。所有状态都经 `AppContext` 传递。

use cms_console_shared::{LoginParams, UserInfo};

use crate::api::user::{get_user_info_api, login_api};
use crate::context::AppContext;
use crate::error::ConsoleResult;
use crate::http::ErrorMessageMode;
use crate::permission::ensure_routes;
use crate::router::navigate;

/// 登录：保存 token，完成登录后处理，然后跳转首页
pub async fn login(
    ctx: &AppContext,
    params: &LoginParams,
    mode: ErrorMessageMode,
) -> ConsoleResult<Option<UserInfo>> {
    let result = login_api(&ctx.http, params, mode)
        .await
        .map_err(|e| e.in_op("auth.login"))?;
    ctx.session.set_token(Some(result.token));

    let was_timeout = ctx.session.get_session_timeout();
    let user = match after_login_action(ctx).await {
        Ok(user) => user,
        Err(e) => {
            if !e.is_unauthorized() {
                teardown(ctx);
            }
            return Err(e.in_op("auth.login"));
        }
    };

    tracing::info!("[Session] Logged in as {:?}", user.as_ref().map(|u| &u.username));
    ctx.session.notify_logged_in();

    // 会话超时后的重新登录停留在当前页
    if !was_timeout {
        let home = ctx.config.paths.home.clone();
        navigate(ctx, &home, true).await?;
    }
    Ok(user)
}

/// 登录后处理
///
/// 拉取用户信息；会话超时重登只清除超时标记，否则安装路由（每个会话一次）。
/// 不负责跳转，由调用方决定去向。
pub async fn after_login_action(ctx: &AppContext) -> ConsoleResult<Option<UserInfo>> {
    if ctx.session.get_token().is_none() {
        return Ok(None);
    }

    let user = get_user_info_action(ctx).await?;
    if ctx.session.get_session_timeout() {
        ctx.session.set_session_timeout(false);
    } else {
        ensure_routes(ctx).await;
    }
    Ok(user)
}

/// 拉取当前用户并写入角色、权限码与用户信息
///
/// 失败时只返回错误；是否登出由调用方决定。
pub async fn get_user_info_action(ctx: &AppContext) -> ConsoleResult<Option<UserInfo>> {
    if ctx.session.get_token().is_none() {
        return Ok(None);
    }
    let info = get_user_info_api(&ctx.http)
        .await
        .map_err(|e| e.in_op("auth.get_user_info"))?;

    ctx.session.set_role_list(info.roles.clone());
    ctx.session.set_permissions(info.permissions.clone());
    ctx.session.set_user_info(Some(info.clone()));
    Ok(Some(info))
}

/// 清理会话：中止请求、关闭提示、清空状态（触发 `LoggedOut`）
pub fn teardown(ctx: &AppContext) {
    ctx.http.remove_all_pending();
    ctx.notifier.destroy_all();
    ctx.session.logout();
}

/// 主动登出并回到登录页
pub async fn logout(ctx: &AppContext) -> ConsoleResult<()> {
    teardown(ctx);
    let login = ctx.config.paths.login.clone();
    navigate(ctx, &login, true).await?;
    Ok(())
}
