//! 后端 REST 接口绑定
//!
//! 通用 CRUD 资源走 `CrudApi<R>`，其余接口按领域拆分。

pub mod menu;
pub mod storage;
pub mod system;
pub mod user;

use cms_console_shared::{BasicFetchResult, BasicPageParams, HttpMethod, Resource};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{ConsoleError, ConsoleResult};
use crate::http::{DefHttp, RequestConfig};
use crate::table::TableApi;

fn to_params<P: Serialize>(params: &P) -> ConsoleResult<Value> {
    Ok(serde_json::to_value(params)?)
}

/// 标准资源集合：list / get / create / update / delete / check
pub struct CrudApi<'a, R: Resource> {
    http: &'a DefHttp,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> CrudApi<'a, R> {
    pub fn new(http: &'a DefHttp) -> Self {
        Self {
            http,
            _resource: PhantomData,
        }
    }

    fn item_url(id: i64) -> String {
        format!("{}/{}", R::PATH, id)
    }

    /// 原始列表响应（数组或分页信封），供表格使用
    pub async fn list(&self, params: Option<Value>) -> ConsoleResult<Value> {
        let mut config = RequestConfig::get(R::PATH);
        config.params = params;
        self.http.request_value(config, None).await
    }

    pub async fn list_page(
        &self,
        page: BasicPageParams,
        filters: Option<Value>,
    ) -> ConsoleResult<BasicFetchResult<R::Model>> {
        let mut params = to_params(&page)?;
        if let (Some(Value::Object(extra)), Some(obj)) = (filters, params.as_object_mut()) {
            obj.extend(extra);
        }
        self.http.get(R::PATH, Some(params)).await
    }

    /// 不分页的完整列表（下拉选项等）
    pub async fn list_all(&self) -> ConsoleResult<Vec<R::Model>> {
        self.http.get(R::PATH, None).await
    }

    pub async fn get(&self, id: i64) -> ConsoleResult<R::Model> {
        self.http.get(&Self::item_url(id), None).await
    }

    pub async fn create<B: Serialize>(&self, body: &B) -> ConsoleResult<Value> {
        self.http.post(R::PATH, to_params(body)?).await
    }

    pub async fn update<B: Serialize>(&self, id: i64, body: &B) -> ConsoleResult<Value> {
        self.http.put(&Self::item_url(id), to_params(body)?).await
    }

    pub async fn delete(&self, id: i64) -> ConsoleResult<Value> {
        self.http.delete(&Self::item_url(id), None).await
    }

    /// 唯一性校验 `{PATH}/check`，参数如 `{permalink, id?}`
    pub async fn check<P: Serialize>(&self, params: &P) -> ConsoleResult<Value> {
        let url = format!("{}/check", R::PATH);
        let params = to_params(params)?;
        let config = match R::CHECK_METHOD {
            HttpMethod::Get => RequestConfig::get(url).params(params),
            method => RequestConfig::new(method, url).params(params),
        };
        self.http.request_value(config, None).await
    }
}

// =========================================================
// 表格数据源适配
// =========================================================

/// 以 GET 某个 url 作为表格数据源
pub struct HttpTableApi {
    http: Rc<DefHttp>,
    url: String,
}

impl HttpTableApi {
    pub fn new(http: Rc<DefHttp>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn for_resource<R: Resource>(http: Rc<DefHttp>) -> Self {
        Self::new(http, R::PATH)
    }
}

#[async_trait::async_trait(?Send)]
impl TableApi for HttpTableApi {
    async fn fetch(&self, params: serde_json::Map<String, Value>) -> ConsoleResult<Value> {
        let config = RequestConfig::get(self.url.clone()).params(Value::Object(params));
        self.http
            .request_value(config, None)
            .await
            .map_err(|e: ConsoleError| e.in_op_with("table.api", self.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::notify::RecordingNotifier;
    use crate::request::{HttpBody, MockTransport};
    use crate::session::SessionStore;
    use crate::storage::{AuthCache, MemoryStore};
    use cms_console_shared::protocol::{ArticleCategories, Articles, News};
    use serde_json::json;

    fn http() -> (Rc<MockTransport>, Rc<DefHttp>) {
        let transport = Rc::new(MockTransport::new());
        let session = Rc::new(SessionStore::new(AuthCache::new(Rc::new(MemoryStore::new()))));
        let http = DefHttp::new(
            transport.clone(),
            session,
            Rc::new(RecordingNotifier::default()),
            Rc::new(ConsoleConfig::default()),
        );
        (transport, Rc::new(http))
    }

    #[tokio::test]
    async fn crud_paths() {
        let (t, http) = http();
        t.ok(HttpMethod::Get, "/api/v1/news/7", json!({"id": 7, "title": "hello"}));
        t.ok(HttpMethod::Put, "/api/v1/news/7", json!(null));
        t.ok(HttpMethod::Delete, "/api/v1/news/7", json!(null));

        let api = CrudApi::<News>::new(&http);
        let news = api.get(7).await.unwrap();
        assert_eq!(news.title, "hello");

        api.update(7, &json!({"title": "bye"})).await.unwrap();
        assert_eq!(t.last_request().unwrap().body, HttpBody::Json(json!({"title": "bye"})));
        api.delete(7).await.unwrap();
        assert_eq!(t.count(HttpMethod::Delete, "/api/v1/news/7"), 1);
    }

    #[tokio::test]
    async fn list_page_merges_filters() {
        let (t, http) = http();
        t.ok(
            HttpMethod::Get,
            "/api/v1/articles",
            json!({"count": 1, "items": [{"id": 1, "title": "a"}], "page": 1, "pageSize": 20}),
        );

        let page = CrudApi::<Articles>::new(&http)
            .list_page(BasicPageParams::new(1, 20), Some(json!({"title": "a"})))
            .await
            .unwrap();
        assert_eq!(page.items[0].title, "a");

        let url = t.last_request().unwrap().url;
        assert!(url.contains("pageSize=20") && url.contains("title=a"));
    }

    #[tokio::test]
    async fn check_uses_resource_method() {
        let (t, http) = http();
        t.ok(HttpMethod::Post, "/api/v1/articles/categories/check", json!(true));
        t.ok(HttpMethod::Get, "/api/v1/articles/check", json!(false));

        let taken = CrudApi::<ArticleCategories>::new(&http)
            .check(&json!({"shorthand": "faq"}))
            .await
            .unwrap();
        assert_eq!(taken, json!(true));
        assert_eq!(
            t.last_request().unwrap().body,
            HttpBody::Json(json!({"shorthand": "faq"}))
        );

        let free = CrudApi::<Articles>::new(&http)
            .check(&json!({"permalink": "x"}))
            .await
            .unwrap();
        assert_eq!(free, json!(false));
        assert!(t.last_request().unwrap().url.contains("permalink=x"));
    }
}
