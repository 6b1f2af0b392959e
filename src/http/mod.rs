//! HTTP 客户端封装
//!
//! 在 `Transport` 之上实现：url 整理、鉴权头、重复请求取消、信封拆解、
//! 状态码映射、GET 重试以及统一的错误提示。

mod cancel;
mod options;
mod transform;

#[cfg(test)]
mod tests;

pub use cancel::{RequestCanceler, pending_key};
pub use options::{ErrorMessageMode, RequestConfig, RequestOptions, RetryRequest};
pub use transform::{REQUEST_FAILED_MESSAGE, check_status, encode_query, shape_url};

use cms_console_shared::HttpMethod;
use futures::future::Abortable;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::notify::{Notifier, show_error};
use crate::request::{HttpResponse, MultipartField, MultipartValue, Transport};
use crate::session::SessionStore;

// =========================================================
// 上传 (Upload)
// =========================================================

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// `/storage/upload` 的表单参数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadFileParams {
    pub file: Option<UploadFile>,
    pub prefix: Option<String>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub mode: Option<String>,
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadFileParams {
    fn into_fields(self) -> ConsoleResult<Vec<MultipartField>> {
        let file = self
            .file
            .ok_or_else(|| ConsoleError::invalid_input("upload requires a file"))?;
        let mut fields = vec![MultipartField {
            name: "file".to_string(),
            value: MultipartValue::File {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
            },
        }];
        let text = |name: &str, value: String| MultipartField {
            name: name.to_string(),
            value: MultipartValue::Text(value),
        };
        if let Some(prefix) = self.prefix {
            fields.push(text("prefix", prefix));
        }
        if let Some(w) = self.max_width {
            fields.push(text("max_width", w.to_string()));
        }
        if let Some(h) = self.max_height {
            fields.push(text("max_height", h.to_string()));
        }
        if let Some(mode) = self.mode {
            fields.push(text("mode", mode));
        }
        if let Some(q) = self.quality {
            fields.push(text("quality", q.to_string()));
        }
        Ok(fields)
    }
}

// =========================================================
// DefHttp
// =========================================================

enum Outcome {
    Native(HttpResponse),
    Value(Value),
}

pub struct DefHttp {
    transport: Rc<dyn Transport>,
    session: Rc<SessionStore>,
    notifier: Rc<dyn Notifier>,
    config: Rc<ConsoleConfig>,
    canceler: RequestCanceler,
}

impl DefHttp {
    pub fn new(
        transport: Rc<dyn Transport>,
        session: Rc<SessionStore>,
        notifier: Rc<dyn Notifier>,
        config: Rc<ConsoleConfig>,
    ) -> Self {
        Self {
            transport,
            session,
            notifier,
            config,
            canceler: RequestCanceler::new(),
        }
    }

    /// 全局默认请求选项的副本
    pub fn options(&self) -> RequestOptions {
        self.config.request.clone()
    }

    pub fn canceler(&self) -> &RequestCanceler {
        &self.canceler
    }

    /// 中止所有进行中的请求（登出时调用）
    pub fn remove_all_pending(&self) {
        self.canceler.remove_all_pending();
    }

    // --- 请求入口 ---

    /// 返回反序列化后的 `data`
    pub async fn request<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
        options: Option<RequestOptions>,
    ) -> ConsoleResult<T> {
        let url = config.url.clone();
        let value = self.request_value(config, options).await?;
        serde_json::from_value(value).map_err(|e| {
            ConsoleError::transform(format!("unexpected response shape: {}", e))
                .with_source(e)
                .in_op_with("http.request", url)
        })
    }

    /// 返回未类型化的 `data`（`is_transform_response = false` 时为完整响应体）
    pub async fn request_value(
        &self,
        config: RequestConfig,
        options: Option<RequestOptions>,
    ) -> ConsoleResult<Value> {
        let mut options = options.unwrap_or_else(|| self.options());
        options.is_return_native_response = false;
        match self.execute(config, options).await? {
            Outcome::Value(v) => Ok(v),
            Outcome::Native(resp) => Ok(resp.json()?),
        }
    }

    /// 返回原生响应（状态码、响应头、原始 body）
    pub async fn request_native(
        &self,
        config: RequestConfig,
        options: Option<RequestOptions>,
    ) -> ConsoleResult<HttpResponse> {
        let mut options = options.unwrap_or_else(|| self.options());
        options.is_return_native_response = true;
        match self.execute(config, options).await? {
            Outcome::Native(resp) => Ok(resp),
            Outcome::Value(v) => Ok(HttpResponse::new(200, v.to_string())),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str, params: Option<Value>) -> ConsoleResult<T> {
        let mut config = RequestConfig::get(url);
        config.params = params;
        self.request(config, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, url: &str, data: Value) -> ConsoleResult<T> {
        self.request(RequestConfig::post(url).data(data), None).await
    }

    pub async fn put<T: DeserializeOwned>(&self, url: &str, data: Value) -> ConsoleResult<T> {
        self.request(RequestConfig::put(url).data(data), None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: &str, params: Option<Value>) -> ConsoleResult<T> {
        let mut config = RequestConfig::delete(url);
        config.params = params;
        self.request(config, None).await
    }

    /// multipart 上传；进度只在开始与完成时回调
    pub async fn upload_file(
        &self,
        url: &str,
        params: UploadFileParams,
        on_progress: Option<&dyn Fn(UploadProgress)>,
    ) -> ConsoleResult<Value> {
        let total = params.file.as_ref().map_or(0, |f| f.bytes.len() as u64);
        let fields = params.into_fields()?;

        if let Some(cb) = on_progress {
            cb(UploadProgress { loaded: 0, total });
        }
        let options = self.options().without_retry();
        let result = self
            .request_value(RequestConfig::post(url).multipart(fields), Some(options))
            .await;
        if result.is_ok() {
            if let Some(cb) = on_progress {
                cb(UploadProgress {
                    loaded: total,
                    total,
                });
            }
        }
        result
    }

    // --- 内部流程 ---

    async fn execute(&self, config: RequestConfig, options: RequestOptions) -> ConsoleResult<Outcome> {
        let url = config.url.clone();
        let method = config.method;
        let mut attempt: u32 = 0;

        let result = loop {
            match self.send_once(config.clone(), &options).await {
                Ok(outcome) => break Ok(outcome),
                Err(e) => {
                    if self.should_retry(method, &options, attempt, &e) {
                        attempt += 1;
                        tracing::warn!(
                            "[Http] Retry {}/{} {}: {}",
                            attempt,
                            options.retry.count,
                            url,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(options.retry.wait_ms)).await;
                        continue;
                    }
                    break Err(e);
                }
            }
        };

        result.map_err(|e| {
            self.report(&e, &options);
            e.in_op_with("http.request", url)
        })
    }

    fn should_retry(
        &self,
        method: HttpMethod,
        options: &RequestOptions,
        attempt: u32,
        err: &ConsoleError,
    ) -> bool {
        method.is_idempotent_read()
            && options.retry.is_open_retry
            && attempt < options.retry.count
            && err.kind.is_retryable()
    }

    async fn send_once(&self, config: RequestConfig, options: &RequestOptions) -> ConsoleResult<Outcome> {
        let token = self.session.get_token();
        let prepared = transform::before_request(config, options, &self.config.http, token.as_deref())?;
        let key = prepared.key;

        let response = if options.ignore_cancel_token {
            self.transport.send(prepared.request).await
        } else {
            let (id, registration) = self.canceler.add_pending(&key);
            let result = Abortable::new(self.transport.send(prepared.request), registration).await;
            self.canceler.finish(&key, id);
            match result {
                Ok(r) => r,
                Err(aborted) => {
                    tracing::debug!("[Http] Request cancelled: {}", key);
                    return Err(aborted.into());
                }
            }
        };
        let response = response?;

        if let Err(e) = transform::check_status(&response) {
            return Err(self.handle_unauthorized(e));
        }

        if options.is_return_native_response {
            return Ok(Outcome::Native(response));
        }
        if !options.is_transform_response {
            return Ok(Outcome::Value(response.json()?));
        }

        transform::transform_envelope(&response.body, &self.config.http)
            .map(Outcome::Value)
            .map_err(|e| self.handle_unauthorized(e))
    }

    /// 401 与信封超时码：清除 token 并登出，每个响应只触发一次
    fn handle_unauthorized(&self, err: ConsoleError) -> ConsoleError {
        if err.is_unauthorized() {
            tracing::warn!("[Http] Unauthorized, forcing logout: {}", err.message());
            self.session.set_token(None);
            self.canceler.remove_all_pending();
            self.session.logout();
        }
        err
    }

    fn report(&self, err: &ConsoleError, options: &RequestOptions) {
        if err.is_cancelled() {
            return;
        }
        tracing::error!("[Http] {}", err);
        show_error(self.notifier.as_ref(), options.error_message_mode, err.message());
    }
}
