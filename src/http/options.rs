use cms_console_shared::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::request::MultipartField;

/// 错误提示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMessageMode {
    None,
    #[default]
    Message,
    Modal,
}

/// GET 请求重试策略（固定间隔）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryRequest {
    pub is_open_retry: bool,
    pub count: u32,
    pub wait_ms: u64,
}

impl Default for RetryRequest {
    fn default() -> Self {
        Self {
            is_open_retry: true,
            count: 5,
            wait_ms: 100,
        }
    }
}

/// 单次请求的行为开关，默认值来自配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// 是否拼接 url 前缀
    pub join_prefix: bool,
    /// 直接返回原生响应（含状态码与响应头）
    pub is_return_native_response: bool,
    /// 是否按信封格式处理响应
    pub is_transform_response: bool,
    /// 非 GET 请求是否把参数拼到 url
    pub join_params_to_url: bool,
    pub error_message_mode: ErrorMessageMode,
    /// 覆盖全局 api 地址
    pub api_url: Option<String>,
    /// 覆盖全局 url 前缀
    pub url_prefix: Option<String>,
    /// GET 请求追加 `_t` 时间戳
    pub join_time: bool,
    /// 不参与重复请求取消
    pub ignore_cancel_token: bool,
    /// 是否携带 token
    pub with_token: bool,
    pub retry: RetryRequest,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            join_prefix: true,
            is_return_native_response: false,
            is_transform_response: true,
            join_params_to_url: false,
            error_message_mode: ErrorMessageMode::Message,
            api_url: None,
            url_prefix: None,
            join_time: true,
            ignore_cancel_token: false,
            with_token: true,
            retry: RetryRequest::default(),
        }
    }
}

impl RequestOptions {
    pub fn with_error_mode(mut self, mode: ErrorMessageMode) -> Self {
        self.error_message_mode = mode;
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.retry.is_open_retry = false;
        self
    }

    pub fn without_token(mut self) -> Self {
        self.with_token = false;
        self
    }

    pub fn ignore_cancel(mut self) -> Self {
        self.ignore_cancel_token = true;
        self
    }
}

/// 单次请求的内容
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub url: String,
    pub method: HttpMethod,
    /// GET 为 query；非 GET 且没有 data 时作为 body
    pub params: Option<Value>,
    pub data: Option<Value>,
    pub headers: HashMap<String, String>,
    pub multipart: Option<Vec<MultipartField>>,
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: None,
            data: None,
            headers: HashMap::new(),
            multipart: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.multipart = Some(fields);
        self
    }
}
