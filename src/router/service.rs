//! 路由服务模块 - 核心引擎
//!
//! 已安装的路由表、当前地址与历史记录。守卫流程见 `guard`。

use crate::config::PathConfig;

use super::route::{
    LOGIN_ROUTE_NAME, Location, PAGE_NOT_FOUND_NAME, ROOT_ROUTE_NAME, RouteComponent, RouteMeta,
    RouteNode, join_path, page_not_found_route,
};

/// 扁平化后的路由记录，`path` 为完整路径
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub path: String,
    pub name: String,
    pub component: Option<RouteComponent>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
}

impl RouteRecord {
    pub fn is_not_found(&self) -> bool {
        self.name == PAGE_NOT_FOUND_NAME
    }
}

/// 路径匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathMatch {
    /// 静态段 3 分，参数段 2 分
    pub score: u32,
    pub catch_all: bool,
}

/// 匹配 `/a/:id` 形式的模式；`:name(.*)` 段匹配剩余所有路径
pub fn match_path(pattern: &str, path: &str) -> Option<PathMatch> {
    let pattern_segs: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut score = 0;
    for (i, seg) in pattern_segs.iter().enumerate() {
        if seg.starts_with(':') && seg.contains("(.*)") {
            return Some(PathMatch {
                score,
                catch_all: true,
            });
        }
        let actual = path_segs.get(i)?;
        if seg.starts_with(':') {
            score += 2;
        } else if seg == actual {
            score += 3;
        } else {
            return None;
        }
    }

    (pattern_segs.len() == path_segs.len()).then_some(PathMatch {
        score,
        catch_all: false,
    })
}

pub struct RouterService {
    routes: Vec<RouteRecord>,
    /// 基础路由名，重置时保留
    basic_names: Vec<String>,
    current: Location,
    history: Vec<String>,
}

impl Default for RouterService {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterService {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            basic_names: Vec::new(),
            current: Location::parse("/"),
            history: Vec::new(),
        }
    }

    /// 启动路由：根路径重定向、登录页、兜底 404
    ///
    /// 静态模块不在此安装，由权限构建后按角色过滤再加入。
    pub fn with_basic_routes(paths: &PathConfig) -> Self {
        let mut router = Self::new();
        router.add_route(
            RouteNode::new(paths.root.clone(), ROOT_ROUTE_NAME)
                .redirect(paths.home.clone())
                .meta(RouteMeta::titled("Root")),
        );
        router.add_route(
            RouteNode::new(paths.login.clone(), LOGIN_ROUTE_NAME)
                .view("/views/public/login/index")
                .meta(RouteMeta {
                    title: "Login".to_string(),
                    ignore_auth: true,
                    hide_menu: true,
                    ..Default::default()
                }),
        );
        router.add_route(page_not_found_route());
        router.basic_names = router.routes.iter().map(|r| r.name.clone()).collect();
        router
    }

    // =========================================================
    // 路由表
    // =========================================================

    /// 安装路由树；同名路由会被替换
    pub fn add_route(&mut self, route: RouteNode) {
        let mut records = Vec::new();
        flatten(&route, "", &mut records);
        for record in records {
            self.routes.retain(|r| r.name != record.name);
            tracing::debug!("[Router] Add route {} -> {}", record.name, record.path);
            self.routes.push(record);
        }
    }

    pub fn get_routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.iter().any(|r| r.name == name)
    }

    /// 解析路径：静态段优先于参数段，兜底路由最后
    pub fn resolve(&self, path: &str) -> Option<&RouteRecord> {
        self.routes
            .iter()
            .filter_map(|r| match_path(&r.path, path).map(|m| (m, r)))
            .max_by(|(a, _), (b, _)| {
                (!a.catch_all, a.score).cmp(&(!b.catch_all, b.score))
            })
            .map(|(_, r)| r)
    }

    /// 移除所有动态安装的路由，只保留基础路由
    pub fn reset_routes(&mut self) {
        let basic = &self.basic_names;
        self.routes.retain(|r| basic.contains(&r.name));
        tracing::debug!("[Router] Reset to {} basic routes", self.routes.len());
    }

    // =========================================================
    // 地址与历史
    // =========================================================

    pub fn current_location(&self) -> &Location {
        &self.current
    }

    pub fn current_route(&self) -> Option<&RouteRecord> {
        self.resolve(&self.current.path)
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// 提交一次导航结果
    pub fn commit(&mut self, location: Location, replace: bool) {
        if replace {
            self.history.pop();
        }
        self.history.push(location.full_path.clone());
        self.current = location;
    }
}

fn flatten(node: &RouteNode, parent: &str, out: &mut Vec<RouteRecord>) {
    let full = if parent.is_empty() {
        node.path.clone()
    } else {
        join_path(parent, &node.path)
    };
    out.push(RouteRecord {
        path: full.clone(),
        name: node.name.clone(),
        component: node.component.clone(),
        redirect: node.redirect.clone(),
        meta: node.meta.clone(),
    });
    for child in &node.children {
        flatten(child, &full, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::RouteModules;

    #[test]
    fn match_prefers_static_over_params() {
        assert_eq!(match_path("/web/news", "/web/news").map(|m| m.score), Some(6));
        assert_eq!(match_path("/web/:id", "/web/news").map(|m| m.score), Some(5));
        assert!(match_path("/web/:id", "/web").is_none());
        assert!(match_path("/:path(.*)*", "/a/b/c").unwrap().catch_all);
        assert!(match_path("/", "/").is_some());
        assert!(match_path("/", "/x").is_none());
    }

    #[test]
    fn resolve_and_reset() {
        let mut router = RouterService::with_basic_routes(&PathConfig::default());
        assert!(router.resolve("/web/news").unwrap().is_not_found());

        for module in RouteModules::builtin().modules() {
            router.add_route(module.clone());
        }
        let news = router.resolve("/web/news").unwrap();
        assert_eq!(news.name, "web-news");
        assert_eq!(router.resolve("/web").unwrap().redirect.as_deref(), Some("/web/news"));
        assert_eq!(router.resolve("/").unwrap().name, ROOT_ROUTE_NAME);

        router.reset_routes();
        assert_eq!(router.get_routes().len(), 3);
        assert!(router.resolve("/web/news").unwrap().is_not_found());
    }

    #[test]
    fn same_name_replaces_route() {
        let mut router = RouterService::new();
        router.add_route(RouteNode::new("/a", "a"));
        router.add_route(RouteNode::new("/b", "a"));
        assert_eq!(router.get_routes().len(), 1);
        assert_eq!(router.get_routes()[0].path, "/b");
    }

    #[test]
    fn replace_overwrites_history_entry() {
        let mut router = RouterService::new();
        router.commit(Location::parse("/a"), false);
        router.commit(Location::parse("/b"), true);
        router.commit(Location::parse("/c"), false);
        assert_eq!(router.history(), &["/b".to_string(), "/c".to_string()]);
        assert_eq!(router.current_location().path, "/c");
    }
}
