//! 权限状态与路由构建
//!
//! 路由在每个会话内只构建一次：静态模块 + 后端菜单，按角色过滤后交给路由服务安装。

use cms_console_shared::Timestamp;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

use crate::api::menu::get_menu_list;
use crate::context::AppContext;
use crate::router::{
    Menu, RouteNode, filter_routes_by_roles, page_not_found_route, transform_menu_modules,
    transform_obj_to_route,
};

/// 权限模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// 静态模块 + 后端菜单
    #[default]
    Dynamic,
    /// 仅静态模块
    Static,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionState {
    pub is_dynamic_added_route: bool,
    /// 0 表示本次会话尚未从后端构建菜单
    pub last_build_menu_time: Timestamp,
    pub back_menu_list: Vec<Menu>,
    pub front_menu_list: Vec<Menu>,
    pub static_menu_list: Vec<Menu>,
}

#[derive(Debug, Default)]
pub struct PermissionStore {
    state: RefCell<PermissionState>,
    /// 路由构建进行中
    building: Cell<bool>,
    /// 每次重置加一，使进行中的构建作废
    generation: Cell<u64>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PermissionState {
        self.state.borrow().clone()
    }

    pub fn is_dynamic_added_route(&self) -> bool {
        self.state.borrow().is_dynamic_added_route
    }

    pub fn last_build_menu_time(&self) -> Timestamp {
        self.state.borrow().last_build_menu_time
    }

    pub fn back_menu_list(&self) -> Vec<Menu> {
        self.state.borrow().back_menu_list.clone()
    }

    pub fn front_menu_list(&self) -> Vec<Menu> {
        self.state.borrow().front_menu_list.clone()
    }

    pub fn static_menu_list(&self) -> Vec<Menu> {
        self.state.borrow().static_menu_list.clone()
    }

    /// 非空列表同时刷新最后构建时间
    pub fn set_back_menu_list(&self, list: Vec<Menu>) {
        let mut state = self.state.borrow_mut();
        if !list.is_empty() {
            state.last_build_menu_time = Timestamp::now();
        }
        state.back_menu_list = list;
    }

    pub fn set_front_menu_list(&self, list: Vec<Menu>) {
        self.state.borrow_mut().front_menu_list = list;
    }

    pub fn set_static_menu_list(&self, list: Vec<Menu>) {
        self.state.borrow_mut().static_menu_list = list;
    }

    pub fn set_dynamic_added_route(&self, added: bool) {
        self.state.borrow_mut().is_dynamic_added_route = added;
    }

    pub fn reset_state(&self) {
        *self.state.borrow_mut() = PermissionState::default();
        self.building.set(false);
        self.generation.set(self.generation.get() + 1);
    }

    pub fn is_building(&self) -> bool {
        self.building.get()
    }

    /// 已有构建在进行时返回 None
    fn begin_build(&self) -> Option<u64> {
        if self.building.replace(true) {
            return None;
        }
        Some(self.generation.get())
    }

    /// 构建期间未被重置时返回 true
    fn finish_build(&self, generation: u64) -> bool {
        if self.generation.get() != generation {
            return false;
        }
        self.building.set(false);
        true
    }
}

/// 构建当前用户可见的路由
///
/// 顺序：后端菜单路由、静态模块、兜底 404（始终最后）。后端菜单拉取失败时
/// 只记录日志，继续使用静态路由。
pub async fn build_routes(ctx: &AppContext) -> Vec<RouteNode> {
    let permission = ctx.session.permission();
    let roles = ctx.session.get_role_list();

    let static_menus = transform_menu_modules(ctx.modules.modules());
    permission.set_static_menu_list(static_menus);

    let mut dynamic_routes = Vec::new();
    if ctx.config.permission_mode == PermissionMode::Dynamic {
        match get_menu_list(&ctx.http).await {
            Ok(menus) => {
                dynamic_routes = transform_obj_to_route(&menus, &ctx.registry);
                permission.set_back_menu_list(transform_menu_modules(&dynamic_routes));
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!("[Permission] Menu fetch cancelled");
            }
            Err(e) => {
                tracing::warn!("[Permission] Failed to load dynamic menus: {}", e);
            }
        }
    }

    let mut routes = dynamic_routes;
    routes.extend(ctx.modules.modules().iter().cloned());
    routes.push(page_not_found_route());

    let routes = filter_routes_by_roles(routes, &roles);
    tracing::info!(
        "[Permission] Built {} top-level routes for roles {:?}",
        routes.len(),
        roles
    );
    routes
}

/// 会话内首次调用时构建并安装路由；返回本次是否新装
///
/// 构建进行中的并发调用直接返回 false；构建期间会话被重置时丢弃结果。
pub async fn ensure_routes(ctx: &AppContext) -> bool {
    let permission = ctx.session.permission();
    if permission.is_dynamic_added_route() {
        return false;
    }
    let Some(generation) = permission.begin_build() else {
        tracing::debug!("[Permission] Route build already in progress");
        return false;
    };
    let routes = build_routes(ctx).await;
    if !permission.finish_build(generation) {
        tracing::debug!("[Permission] Session reset during route build, discard");
        return false;
    }
    {
        let mut router = ctx.router.borrow_mut();
        for route in routes {
            router.add_route(route);
        }
    }
    permission.set_dynamic_added_route(true);
    true
}
