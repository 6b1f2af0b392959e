//! 侧栏菜单
//!
//! 菜单由路由模块派生，只展示已安装路由能匹配到的条目。

use serde::Serialize;

use super::route::{RouteMeta, RouteNode, is_http_url, join_path};
use super::service::{RouteRecord, match_path};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Menu {
    pub name: String,
    pub path: String,
    pub icon: Option<String>,
    pub order_no: Option<i32>,
    pub roles: Vec<String>,
    pub disabled: bool,
    pub meta: Option<RouteMeta>,
    pub children: Vec<Menu>,
}

impl Menu {
    pub fn from_route(route: &RouteNode) -> Self {
        Self {
            name: route.name.clone(),
            path: route.path.clone(),
            icon: route.meta.icon.clone(),
            order_no: route.meta.order_no,
            roles: route.meta.roles.clone(),
            disabled: false,
            meta: Some(route.meta.clone()),
            children: route.children.iter().map(Menu::from_route).collect(),
        }
    }

    fn hide_children_in_menu(&self) -> bool {
        self.meta.as_ref().is_some_and(|m| m.hide_children_in_menu)
    }
}

/// 路由模块 -> 菜单：相对路径拼上父路径，按 order_no 稳定排序（缺省为 0）
pub fn transform_menu_modules(modules: &[RouteNode]) -> Vec<Menu> {
    let mut menus: Vec<Menu> = modules.iter().map(Menu::from_route).collect();
    join_parent_path(&mut menus, "");
    menus.sort_by_key(|m| m.order_no.unwrap_or(0));
    menus
}

fn join_parent_path(menus: &mut [Menu], parent: &str) {
    for menu in menus.iter_mut() {
        menu.path = join_path(parent, &menu.path);
        if !menu.children.is_empty() {
            // 子菜单隐藏时，子路由挂在祖父路径下
            let base = if menu.hide_children_in_menu() {
                parent.to_string()
            } else {
                menu.path.clone()
            };
            join_parent_path(&mut menu.children, &base);
        }
    }
}

/// 过滤出已安装路由能匹配的菜单；父菜单不匹配但仍有子菜单时保留
pub fn get_menus(static_menus: &[Menu], routes: &[RouteRecord]) -> Vec<Menu> {
    static_menus
        .iter()
        .filter_map(|menu| {
            let mut menu = menu.clone();
            menu.children = get_menus(&menu.children, routes);
            let keep = attach_route(&mut menu, routes) || !menu.children.is_empty();
            keep.then_some(menu)
        })
        .collect()
}

fn attach_route(menu: &mut Menu, routes: &[RouteRecord]) -> bool {
    if is_http_url(&menu.path) {
        return true;
    }
    let matched = routes.iter().find(|r| {
        r.path == menu.path || match_path(&r.path, &menu.path).is_some_and(|m| !m.catch_all)
    });
    match matched {
        Some(route) => {
            if menu.icon.is_none() {
                menu.icon = route.meta.icon.clone();
            }
            menu.meta = Some(route.meta.clone());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteModules;

    #[test]
    fn static_menus_join_paths_and_sort() {
        let menus = transform_menu_modules(RouteModules::builtin().modules());
        let paths: Vec<_> = menus.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/general", "/system", "/web", "/storage"]);
        assert_eq!(menus[2].children[1].path, "/web/news");
        assert_eq!(menus[3].children[0].path, "/storage/index");
    }

    #[test]
    fn hidden_children_attach_to_grandparent() {
        let mut parent = RouteNode::new("detail", "detail").child(RouteNode::new("edit", "edit"));
        parent.meta.hide_children_in_menu = true;
        let module = RouteNode::new("/web", "web").child(parent);

        let menus = transform_menu_modules(&[module]);
        assert_eq!(menus[0].children[0].path, "/web/detail");
        assert_eq!(menus[0].children[0].children[0].path, "/web/edit");
    }
}
