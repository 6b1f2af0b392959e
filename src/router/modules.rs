//! 静态路由模块
//!
//! 既是静态路由的来源，也是静态菜单的来源。

use super::route::{RouteComponent, RouteMeta, RouteNode};

#[derive(Debug, Clone, Default)]
pub struct RouteModules {
    modules: Vec<RouteNode>,
}

impl RouteModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, module: RouteNode) -> Self {
        self.modules.push(module);
        self
    }

    /// 按注册顺序返回
    pub fn modules(&self) -> &[RouteNode] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn builtin() -> Self {
        Self::new()
            .register(general())
            .register(system())
            .register(web())
            .register(storage())
    }
}

fn general() -> RouteNode {
    RouteNode::new("/general", "general")
        .component(RouteComponent::Layout)
        .redirect("/general/dashboard")
        .meta(RouteMeta::titled("General"))
        .child(
            RouteNode::new("dashboard", "general-dashboard")
                .view("/views/general/dashboard/index")
                .meta(RouteMeta::titled("Dashboard")),
        )
}

fn system() -> RouteNode {
    RouteNode::new("/system", "system")
        .component(RouteComponent::Layout)
        .redirect("/system/users")
        .meta(RouteMeta::titled("System").with_roles(&["admin"]))
        .child(
            RouteNode::new("users", "system-users")
                .view("/views/system/users/index")
                .meta(RouteMeta::titled("Users").with_icon("tabler:user")),
        )
}

fn web() -> RouteNode {
    let page = |path: &str, title: &str, icon: &str| {
        RouteNode::new(path, format!("web-{}", path))
            .view(format!("/views/web/{}/index", path))
            .meta(RouteMeta::titled(title).with_icon(icon))
    };

    RouteNode::new("/web", "web")
        .component(RouteComponent::Layout)
        .redirect("/web/news")
        .meta(RouteMeta::titled("Website").with_order(10))
        .children(vec![
            page("banner", "Banners", "tabler:ad"),
            page("news", "News", "tabler:news"),
            page("solutions", "Solutions", "tabler:bulb"),
            page("products", "Products", "tabler:brand-producthunt"),
            page("downloads", "Downloads", "tabler:download"),
        ])
}

fn storage() -> RouteNode {
    RouteNode::new("/storage", "storage")
        .component(RouteComponent::Layout)
        .redirect("/storage/index")
        .meta(RouteMeta::titled("Storage").with_order(18))
        .child(
            RouteNode::new("index", "storage-index")
                .view("/views/storage/s3/index")
                .meta(RouteMeta::titled("S3").with_icon("tabler:database")),
        )
        .child(
            RouteNode::new("qiniu", "storage-qiniu")
                .view("/views/storage/qiniu/index")
                .meta(RouteMeta::titled("Qiniu").with_icon("tabler:cloud")),
        )
}
