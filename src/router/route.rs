//! 路由定义模块
//!
//! 路由树节点与地址解析。

use serde::Serialize;
use std::collections::BTreeMap;

pub const ROOT_ROUTE_NAME: &str = "Root";
pub const LOGIN_ROUTE_NAME: &str = "Login";
pub const PAGE_NOT_FOUND_NAME: &str = "PageNotFound";
/// 兜底路由，匹配任意路径
pub const PAGE_NOT_FOUND_PATH: &str = "/:path(.*)*";

/// 路由组件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RouteComponent {
    /// 带侧栏的布局容器
    Layout,
    /// 已注册的视图，值为规范化后的视图键
    View(String),
    /// 组件无法解析时的异常页
    Exception,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RouteMeta {
    pub title: String,
    pub icon: Option<String>,
    pub order_no: Option<i32>,
    /// 为空表示不限制角色
    pub roles: Vec<String>,
    pub hide_menu: bool,
    pub hide_children_in_menu: bool,
    /// 未登录也可访问
    pub ignore_auth: bool,
}

impl RouteMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_order(mut self, order_no: i32) -> Self {
        self.order_no = Some(order_no);
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }
}

/// 路由树节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteNode {
    /// 顶层为绝对路径，子节点可为相对路径
    pub path: String,
    pub name: String,
    pub component: Option<RouteComponent>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            component: None,
            redirect: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn component(mut self, component: RouteComponent) -> Self {
        self.component = Some(component);
        self
    }

    pub fn view(self, key: impl Into<String>) -> Self {
        self.component(RouteComponent::View(key.into()))
    }

    pub fn redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect = Some(to.into());
        self
    }

    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }

    pub fn order_no(&self) -> i32 {
        self.meta.order_no.unwrap_or(0)
    }
}

/// 兜底 404 路由，必须位于路由表末尾
pub fn page_not_found_route() -> RouteNode {
    RouteNode::new(PAGE_NOT_FOUND_PATH, PAGE_NOT_FOUND_NAME)
        .component(RouteComponent::Exception)
        .meta(RouteMeta {
            title: "ErrorPage".to_string(),
            hide_menu: true,
            hide_children_in_menu: true,
            ..Default::default()
        })
}

/// 拼接父子路径；绝对路径与 URL 保持不变
pub fn join_path(parent: &str, child: &str) -> String {
    if child.starts_with('/') || is_http_url(child) {
        return child.to_string();
    }
    if child.is_empty() {
        return parent.to_string();
    }
    format!("{}/{}", parent.trim_end_matches('/'), child)
}

pub fn is_http_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

// =========================================================
// 地址 (Location)
// =========================================================

/// 一次导航的目标地址
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// path + 编码后的 query
    pub full_path: String,
}

impl Location {
    /// 解析 `/path?a=1&b=2`，query 值做百分号解码
    pub fn parse(full: &str) -> Self {
        let (path, query_str) = match full.split_once('?') {
            Some((p, q)) => (p, q),
            None => (full, ""),
        };
        let path = if path.is_empty() { "/" } else { path };
        let query: BTreeMap<String, String> = url::form_urlencoded::parse(query_str.as_bytes())
            .into_owned()
            .collect();
        Self::with_query(path, query)
    }

    pub fn with_query(path: &str, query: BTreeMap<String, String>) -> Self {
        let full_path = if query.is_empty() {
            path.to_string()
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            format!("{}?{}", path, encoded)
        };
        Self {
            path: path.to_string(),
            query,
            full_path,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// 清空某个 query 参数（值置空，full_path 同步更新）
    pub fn clear_query(&mut self, key: &str) {
        if self.query.contains_key(key) {
            self.query.insert(key.to_string(), String::new());
            let path = std::mem::take(&mut self.path);
            let query = std::mem::take(&mut self.query);
            *self = Self::with_query(&path, query);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_absolute_and_urls() {
        assert_eq!(join_path("/web", "news"), "/web/news");
        assert_eq!(join_path("/web", "/abs"), "/abs");
        assert_eq!(join_path("/web", "https://x.io"), "https://x.io");
        assert_eq!(join_path("/", "login"), "/login");
    }

    #[test]
    fn location_round_trips_redirect_query() {
        let target = Location::parse("/web/news?page=2");
        let mut query = BTreeMap::new();
        query.insert("redirect".to_string(), target.full_path.clone());
        let login = Location::with_query("/login", query);

        assert_eq!(login.full_path, "/login?redirect=%2Fweb%2Fnews%3Fpage%3D2");
        let parsed = Location::parse(&login.full_path);
        assert_eq!(parsed.query_value("redirect"), Some("/web/news?page=2"));
    }

    #[test]
    fn clear_query_keeps_key_with_empty_value() {
        let mut loc = Location::parse("/login?redirect=%2Fa");
        loc.clear_query("redirect");
        assert_eq!(loc.query_value("redirect"), None);
        assert_eq!(loc.full_path, "/login?redirect=");
    }
}
