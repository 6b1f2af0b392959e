use crate::models::{
    ArticleCategoryModel, ArticleModel, BannerModel, DownloadCategoryModel, DownloadModel,
    NewsCategoryModel, NewsModel, PageModel, ProductModel, ProductSeriesModel,
    SolutionCategoryModel, SolutionModel, WebinarModel,
};
use crate::{MenuModel, RoleModel, UserModel};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// GET 之外的方法都可能修改服务端状态
    pub fn is_idempotent_read(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

// =========================================================
// 响应信封 (Response Envelope)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Success,
    Error,
    Warning,
}

/// 后端统一响应格式 `{code, type, message, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T = serde_json::Value> {
    pub code: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<ResultType>,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(code: i64, data: T) -> Self {
        Self {
            code,
            result_type: Some(ResultType::Success),
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            result_type: Some(ResultType::Error),
            message: message.into(),
            data: None,
        }
    }
}

/// 分页列表信封 `{count, items, page, pageSize}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicFetchResult<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: u64,
    #[serde(rename = "pageSize", default)]
    pub page_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicPageParams {
    pub page: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
}

impl BasicPageParams {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }
}

// =========================================================
// 资源定义 (Resource Definitions)
// =========================================================

/// A REST collection exposing the standard list/get/create/update/delete/check set.
pub trait Resource {
    /// The model returned for a single item.
    type Model: Serialize + DeserializeOwned;
    /// The collection path, e.g. `/articles`.
    const PATH: &'static str;
    /// Method used by `{PATH}/check` uniqueness probes.
    const CHECK_METHOD: HttpMethod = HttpMethod::Get;
}

macro_rules! resource {
    ($(#[$doc:meta])* $name:ident, $model:ty, $path:literal) => {
        resource!($(#[$doc])* $name, $model, $path, HttpMethod::Get);
    };
    ($(#[$doc:meta])* $name:ident, $model:ty, $path:literal, $check:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Resource for $name {
            type Model = $model;
            const PATH: &'static str = $path;
            const CHECK_METHOD: HttpMethod = $check;
        }
    };
}

resource!(Articles, ArticleModel, "/articles");
resource!(
    /// 文章分类的 check 接口使用 POST
    ArticleCategories,
    ArticleCategoryModel,
    "/articles/categories",
    HttpMethod::Post
);
resource!(News, NewsModel, "/news");
resource!(NewsCategories, NewsCategoryModel, "/news/categories");
resource!(Products, ProductModel, "/products");
resource!(ProductSeries, ProductSeriesModel, "/products/series");
resource!(Downloads, DownloadModel, "/downloads");
resource!(
    DownloadCategories,
    DownloadCategoryModel,
    "/downloads/categories",
    HttpMethod::Post
);
resource!(Solutions, SolutionModel, "/solutions");
resource!(SolutionCategories, SolutionCategoryModel, "/solutions/categories");
resource!(Banners, BannerModel, "/banners");
resource!(Webinars, WebinarModel, "/webinars");
resource!(Pages, PageModel, "/pages");
resource!(Users, UserModel, "/users");
resource!(Roles, RoleModel, "/roles");
resource!(Menus, MenuModel, "/menus");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_without_data_parses() {
        let env: ApiEnvelope = serde_json::from_value(json!({
            "code": 500,
            "type": "error",
            "message": "boom"
        }))
        .unwrap();
        assert_eq!(env.code, 500);
        assert_eq!(env.result_type, Some(ResultType::Error));
        assert!(env.data.is_none());
    }

    #[test]
    fn fetch_result_uses_camel_case_page_size() {
        let page: BasicFetchResult<serde_json::Value> = serde_json::from_value(json!({
            "count": 51,
            "items": [{"a": 1}],
            "page": 1,
            "pageSize": 20
        }))
        .unwrap();
        assert_eq!(page.count, 51);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn category_check_uses_post() {
        assert_eq!(ArticleCategories::CHECK_METHOD, HttpMethod::Post);
        assert_eq!(Articles::CHECK_METHOD, HttpMethod::Get);
        assert_eq!(ProductSeries::PATH, "/products/series");
    }
}
