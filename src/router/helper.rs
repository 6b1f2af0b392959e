//! 路由转换工具
//!
//! 后端菜单树 -> 路由树，以及按角色过滤路由树。

use cms_console_shared::{MenuModel, MenuType};

use super::registry::ViewRegistry;
use super::route::{RouteComponent, RouteMeta, RouteNode};

/// 后端菜单 -> 路由
///
/// - BUTTON 节点只承载权限码，不生成路由
/// - DIRECTORY 节点一律使用布局容器
/// - 路由名优先使用权限码，保证唯一
pub fn transform_obj_to_route(menus: &[MenuModel], registry: &ViewRegistry) -> Vec<RouteNode> {
    menus
        .iter()
        .filter(|m| m.menu_type != MenuType::Button)
        .map(|menu| {
            let component = match menu.menu_type {
                MenuType::Directory => RouteComponent::Layout,
                _ => registry.resolve(&menu.component),
            };
            let name = if menu.permission.is_empty() {
                menu.path.clone()
            } else {
                menu.permission.clone()
            };
            let meta = RouteMeta {
                title: menu.name.clone(),
                icon: (!menu.icon.is_empty()).then(|| menu.icon.clone()),
                order_no: Some(menu.sort),
                hide_menu: !menu.visible,
                ..Default::default()
            };

            RouteNode::new(menu.path.clone(), name)
                .component(component)
                .meta(meta)
                .children(transform_obj_to_route(&menu.children, registry))
        })
        .collect()
}

/// 没有声明角色的路由对所有人可见，否则至少命中一个角色
pub fn role_allowed(route: &RouteNode, roles: &[String]) -> bool {
    route.meta.roles.is_empty() || route.meta.roles.iter().any(|r| roles.contains(r))
}

/// 严格过滤：父节点不可见时整棵子树一并移除
pub fn filter_routes_by_roles(routes: Vec<RouteNode>, roles: &[String]) -> Vec<RouteNode> {
    routes
        .into_iter()
        .filter(|r| role_allowed(r, roles))
        .map(|mut r| {
            r.children = filter_routes_by_roles(std::mem::take(&mut r.children), roles);
            r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn menus() -> Vec<MenuModel> {
        serde_json::from_value(json!([
            {
                "id": 1, "name": "Website", "type": 1, "path": "/web", "sort": 3,
                "children": [
                    {"id": 2, "parent_id": 1, "name": "News", "type": 2, "path": "news",
                     "component": "/views/web/news/index.vue", "permission": "web:news:list"},
                    {"id": 3, "parent_id": 2, "name": "Add", "type": 3, "permission": "web:news:add"},
                    {"id": 4, "parent_id": 1, "name": "Ghost", "type": 2, "path": "ghost",
                     "component": "/views/nowhere", "visible": false}
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn menu_tree_becomes_routes() {
        let routes = transform_obj_to_route(&menus(), &ViewRegistry::builtin());
        assert_eq!(routes.len(), 1);

        let web = &routes[0];
        assert_eq!(web.component, Some(RouteComponent::Layout));
        assert_eq!(web.name, "/web");
        assert_eq!(web.meta.order_no, Some(3));
        // BUTTON 被跳过
        assert_eq!(web.children.len(), 2);

        let news = &web.children[0];
        assert_eq!(news.name, "web:news:list");
        assert_eq!(
            news.component,
            Some(RouteComponent::View("/views/web/news/index".into()))
        );

        let ghost = &web.children[1];
        assert_eq!(ghost.component, Some(RouteComponent::Exception));
        assert!(ghost.meta.hide_menu);
    }

    #[test]
    fn role_filter_requires_intersection() {
        let routes = vec![
            RouteNode::new("/open", "open"),
            RouteNode::new("/admin", "admin")
                .meta(RouteMeta::default().with_roles(&["admin"]))
                .child(RouteNode::new("x", "x")),
            RouteNode::new("/mixed", "mixed").child(
                RouteNode::new("ops", "ops").meta(RouteMeta::default().with_roles(&["ops", "dev"])),
            ),
        ];

        let visible = filter_routes_by_roles(routes.clone(), &["dev".to_string()]);
        let names: Vec<_> = visible.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["open", "mixed"]);
        assert_eq!(visible[1].children.len(), 1);

        let none = filter_routes_by_roles(routes, &[]);
        assert_eq!(none.len(), 2);
        assert!(none[1].children.is_empty());
    }
}
