use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::request::TransportError;
use crate::storage::CacheError;

// =========================================================
// 错误类型枚举
// =========================================================

/// 错误分类
///
/// 与用户可见的行为一一对应：取消静默，401 强制登出，业务错误原样展示后端消息。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleErrorKind {
    /// 连接失败、DNS 错误等
    Network,
    /// 请求超时
    Timeout,
    /// 请求被去重或登出取消
    Cancelled,
    /// 非 2xx 的 HTTP 状态码 (401 除外)
    Status(u16),
    /// 信封 `code` 不是成功码
    Business(i64),
    /// 401 或会话超时
    Unauthorized,
    /// JSON 解析或序列化错误
    Serialization,
    /// 响应结构不符合预期
    Transform,
    /// 缓存读写失败
    Storage,
    /// 调用参数校验失败
    InvalidInput,
    /// 路由、视图或行未找到
    NotFound,
}

impl ConsoleErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConsoleErrorKind::Network => "NETWORK_ERROR",
            ConsoleErrorKind::Timeout => "TIMEOUT",
            ConsoleErrorKind::Cancelled => "CANCELLED",
            ConsoleErrorKind::Status(_) => "HTTP_STATUS",
            ConsoleErrorKind::Business(_) => "BUSINESS_ERROR",
            ConsoleErrorKind::Unauthorized => "UNAUTHORIZED",
            ConsoleErrorKind::Serialization => "JSON_PARSE_ERROR",
            ConsoleErrorKind::Transform => "TRANSFORM_ERROR",
            ConsoleErrorKind::Storage => "STORAGE_ERROR",
            ConsoleErrorKind::InvalidInput => "INVALID_INPUT",
            ConsoleErrorKind::NotFound => "NOT_FOUND",
        }
    }

    /// GET 重试只针对这些瞬时失败
    pub fn is_retryable(&self) -> bool {
        match self {
            ConsoleErrorKind::Network | ConsoleErrorKind::Timeout => true,
            ConsoleErrorKind::Status(code) => *code != 401,
            _ => false,
        }
    }
}

// =========================================================
// 错误上下文追踪
// =========================================================

/// 结构化的错误追踪片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSpan {
    /// 操作名称，如 "http.request", "table.fetch"
    pub operation: String,
    /// 额外的细节信息，如 url、路由路径等
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// 核心错误类型
// =========================================================

/// 控制台领域错误
///
/// - kind: 错误分类
/// - message: 面向用户的消息
/// - source: 原始错误（可选，用于错误链）
/// - spans: 结构化的调用追踪栈
///
/// 需要同时交给表格事件订阅者和调用方，所以是 `Clone` 的。
#[derive(Debug, Clone)]
pub struct ConsoleError {
    pub kind: ConsoleErrorKind,
    pub message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl ConsoleError {
    pub fn new(kind: ConsoleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Cancelled, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Status(code), message)
    }

    pub fn business(code: i64, message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Business(code), message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Unauthorized, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Serialization, message)
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Transform, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::Storage, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ConsoleErrorKind::NotFound, message)
    }

    // --- Context builders ---

    /// 添加操作追踪（无额外细节）
    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    /// 添加操作追踪（带额外细节）
    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    /// 取消不是失败，所有消费方都应静默处理
    pub fn is_cancelled(&self) -> bool {
        self.kind == ConsoleErrorKind::Cancelled
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ConsoleErrorKind::Unauthorized
    }
}

// =========================================================
// Display & Error trait 实现
// =========================================================

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;

// =========================================================
// 类型转换实现
// =========================================================

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::serialization(e.to_string()).with_source(e)
    }
}

impl From<TransportError> for ConsoleError {
    fn from(e: TransportError) -> Self {
        match &e {
            TransportError::Timeout(_) => ConsoleError::timeout("API Timeout").with_source(e),
            TransportError::Network(_) => ConsoleError::network("Network Error").with_source(e),
            TransportError::InvalidRequest(msg) => {
                ConsoleError::invalid_input(msg.clone()).with_source(e)
            }
        }
    }
}

impl From<CacheError> for ConsoleError {
    fn from(e: CacheError) -> Self {
        ConsoleError::storage(e.to_string()).with_source(e)
    }
}

impl From<futures::future::Aborted> for ConsoleError {
    fn from(_: futures::future::Aborted) -> Self {
        ConsoleError::cancelled("Request cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_trace() {
        let err = ConsoleError::business(500, "boom")
            .in_op("http.request")
            .in_op_with("table.fetch", "/articles");
        assert_eq!(
            err.to_string(),
            "[BUSINESS_ERROR] boom | trace: http.request -> table.fetch(/articles)"
        );
    }

    #[test]
    fn transport_errors_map_to_user_messages() {
        let e: ConsoleError = TransportError::Timeout(10_000).into();
        assert_eq!(e.kind, ConsoleErrorKind::Timeout);
        assert_eq!(e.message(), "API Timeout");
        assert!(std::error::Error::source(&e).is_some());

        let e: ConsoleError = TransportError::Network("refused".into()).into();
        assert_eq!(e.message(), "Network Error");
    }

    #[test]
    fn retryable_kinds() {
        assert!(ConsoleErrorKind::Timeout.is_retryable());
        assert!(ConsoleErrorKind::Status(502).is_retryable());
        assert!(!ConsoleErrorKind::Status(401).is_retryable());
        assert!(!ConsoleErrorKind::Cancelled.is_retryable());
        assert!(!ConsoleErrorKind::Business(7).is_retryable());
    }
}
