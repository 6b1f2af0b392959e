use cms_console_shared::HttpMethod;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
use std::cell::{Cell, RefCell};
#[cfg(test)]
use std::collections::VecDeque;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 传输层错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// multipart 表单字段
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartValue {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HttpBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartField>),
}

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: HttpBody,
    /// None 表示使用传输层默认超时
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: HttpBody::Empty,
            timeout: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = HttpBody::Json(body);
        self
    }

    pub fn with_multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = HttpBody::Multipart(fields);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// 传输层特性 (Trait)
///
/// 一次请求对应一个响应或一个传输错误。非 2xx 状态码不是传输错误。
#[async_trait::async_trait(?Send)]
pub trait Transport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// =========================================================
// 实现层: reqwest 客户端 (Production)
// =========================================================

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_timeout,
        }
    }

    pub fn with_client(client: reqwest::Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }

    fn build_form(fields: Vec<MultipartField>) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for field in fields {
            form = match field.value {
                MultipartValue::Text(text) => form.text(field.name, text),
                MultipartValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let part = reqwest::multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&content_type)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };
        let timeout = req.timeout.unwrap_or(self.default_timeout);

        let mut builder = self.client.request(method, &req.url).timeout(timeout);

        let is_multipart = matches!(req.body, HttpBody::Multipart(_));
        for (k, v) in &req.headers {
            // multipart 的 Content-Type 由 reqwest 生成 boundary
            if is_multipart && k.eq_ignore_ascii_case("content-type") {
                continue;
            }
            builder = builder.header(k, v);
        }

        builder = match req.body {
            HttpBody::Empty => builder,
            HttpBody::Json(value) => builder.body(value.to_string()),
            HttpBody::Multipart(fields) => builder.multipart(Self::build_form(fields)?),
        };

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout.as_millis() as u64)
            } else if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        };

        let resp = builder.send().await.map_err(map_err)?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = resp.text().await.map_err(map_err)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// =========================================================
// 测试工具: MockTransport
// =========================================================

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(u16, serde_json::Value),
    Timeout,
    Network,
}

/// 按 "METHOD /path" 匹配的脚本化传输层
///
/// 同一路由的回复按顺序消费，最后一个回复保持生效。
#[cfg(test)]
pub struct MockTransport {
    replies: RefCell<HashMap<String, VecDeque<MockReply>>>,
    pub requests: RefCell<Vec<HttpRequest>>,
    /// 每次请求在返回前让出执行权的次数，用于制造"进行中"的请求
    yields: Cell<usize>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            yields: Cell::new(0),
        }
    }

    pub fn route_key(method: HttpMethod, url: &str) -> String {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.split('?').next().unwrap_or(url).to_string());
        format!("{} {}", method.as_str(), path)
    }

    pub fn reply(&self, method: HttpMethod, path: &str, reply: MockReply) {
        self.replies
            .borrow_mut()
            .entry(format!("{} {}", method.as_str(), path))
            .or_default()
            .push_back(reply);
    }

    /// 快捷方法：回复成功信封 `{code: 0, data}`
    pub fn ok(&self, method: HttpMethod, path: &str, data: serde_json::Value) {
        self.reply(
            method,
            path,
            MockReply::Response(
                200,
                serde_json::json!({"code": 0, "type": "success", "message": "ok", "data": data}),
            ),
        );
    }

    pub fn set_yields(&self, n: usize) {
        self.yields.set(n);
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        let key = format!("{} {}", method.as_str(), path);
        self.requests
            .borrow()
            .iter()
            .filter(|r| Self::route_key(r.method, &r.url) == key)
            .count()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.borrow().last().cloned()
    }

    fn next_reply(&self, key: &str) -> Option<MockReply> {
        let mut replies = self.replies.borrow_mut();
        let queue = replies.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl Transport for MockTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = Self::route_key(req.method, &req.url);
        self.requests.borrow_mut().push(req);

        for _ in 0..self.yields.get() {
            tokio::task::yield_now().await;
        }

        match self.next_reply(&key) {
            Some(MockReply::Response(status, body)) => Ok(HttpResponse::new(status, body.to_string())),
            Some(MockReply::Timeout) => Err(TransportError::Timeout(10_000)),
            Some(MockReply::Network) => Err(TransportError::Network("connection refused".into())),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}
