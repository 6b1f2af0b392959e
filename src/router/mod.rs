//! 路由模块
//!
//! - `route`: 路由树节点与地址
//! - `registry`: 视图注册表
//! - `modules`: 静态路由模块
//! - `helper`: 后端菜单转换与角色过滤
//! - `menu`: 侧栏菜单
//! - `service`: 路由表与历史
//! - `guard`: 权限守卫与导航

mod guard;
mod helper;
mod menu;
mod modules;
mod registry;
mod route;
mod service;

#[cfg(test)]
mod tests;

pub use guard::{GuardDecision, before_each, navigate};
pub use helper::{filter_routes_by_roles, role_allowed, transform_obj_to_route};
pub use menu::{Menu, get_menus, transform_menu_modules};
pub use modules::RouteModules;
pub use registry::{LAYOUT_COMPONENT, ViewRegistry, normalize as normalize_view_path};
pub use route::{
    LOGIN_ROUTE_NAME, Location, PAGE_NOT_FOUND_NAME, PAGE_NOT_FOUND_PATH, ROOT_ROUTE_NAME,
    RouteComponent, RouteMeta, RouteNode, is_http_url, join_path, page_not_found_route,
};
pub use service::{PathMatch, RouteRecord, RouterService, match_path};
