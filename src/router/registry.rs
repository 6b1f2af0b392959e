//! 视图注册表
//!
//! 启动时登记所有可用视图，后端菜单中的组件路径在此解析。

use std::collections::BTreeSet;

use super::route::RouteComponent;

pub const LAYOUT_COMPONENT: &str = "LAYOUT";

/// 内置视图
const BUILTIN_VIEWS: &[&str] = &[
    "/views/general/dashboard/index.vue",
    "/views/system/users/index.vue",
    "/views/system/roles/index.vue",
    "/views/system/menus/index.vue",
    "/views/system/logs/index.vue",
    "/views/system/info/index.vue",
    "/views/web/banner/index.vue",
    "/views/web/news/index.vue",
    "/views/web/news/category/index.vue",
    "/views/web/articles/index.vue",
    "/views/web/articles/category/index.vue",
    "/views/web/solutions/index.vue",
    "/views/web/solutions/category/index.vue",
    "/views/web/products/index.vue",
    "/views/web/products/series/index.vue",
    "/views/web/downloads/index.vue",
    "/views/web/downloads/category/index.vue",
    "/views/web/webinars/index.vue",
    "/views/web/pages/index.vue",
    "/views/storage/s3/index.vue",
    "/views/storage/qiniu/index.vue",
    "/views/public/login/index.vue",
];

#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    views: BTreeSet<String>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for view in BUILTIN_VIEWS {
            registry.register(view);
        }
        registry
    }

    pub fn register(&mut self, path: &str) -> &mut Self {
        self.views.insert(normalize(path));
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.views.contains(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// 解析组件路径；未登记的视图记录警告并回落为异常页
    pub fn resolve(&self, component: &str) -> RouteComponent {
        if component == LAYOUT_COMPONENT {
            return RouteComponent::Layout;
        }
        let key = normalize(component);
        if self.views.contains(&key) {
            RouteComponent::View(key)
        } else {
            tracing::warn!("[Router] Component not found: {}", component);
            RouteComponent::Exception
        }
    }
}

/// `views/web/news/index.vue`、`/src/views/web/news/index` 都规范化为
/// `/views/web/news/index`
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    let with_slash = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    let without_src = with_slash
        .strip_prefix("/src")
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(with_slash.as_str());
    let without_ext = without_src
        .strip_suffix(".vue")
        .or_else(|| without_src.strip_suffix(".tsx"))
        .unwrap_or(without_src);
    without_ext.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_equivalent_spellings() {
        assert_eq!(normalize("views/web/news/index.vue"), "/views/web/news/index");
        assert_eq!(normalize("/src/views/web/news/index"), "/views/web/news/index");
        assert_eq!(normalize(" /views/a.tsx "), "/views/a");
        assert_eq!(normalize("/srcs/x"), "/srcs/x");
    }

    #[test]
    fn resolve_falls_back_to_exception() {
        let registry = ViewRegistry::builtin();
        assert_eq!(registry.resolve("LAYOUT"), RouteComponent::Layout);
        assert_eq!(
            registry.resolve("views/web/news/index.vue"),
            RouteComponent::View("/views/web/news/index".into())
        );
        assert_eq!(registry.resolve("/views/missing"), RouteComponent::Exception);
    }
}
