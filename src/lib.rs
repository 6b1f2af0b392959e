//! CMS 管理后台引擎
//!
//! 不含界面渲染：负责表格数据编排、基于权限的路由、HTTP 客户端、会话与认证缓存。
//! 宿主通过 `AppContext` 接入传输层、存储与提示。

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod notify;
pub mod permission;
pub mod request;
pub mod router;
pub mod session;
pub mod storage;
pub mod table;

pub use cms_console_shared as shared;

pub use config::ConsoleConfig;
pub use context::{AppContext, AppContextBuilder};
pub use error::{ConsoleError, ConsoleErrorKind, ConsoleResult};
pub use http::{DefHttp, ErrorMessageMode, RequestConfig, RequestOptions};
pub use notify::{Notifier, TracingNotifier};
pub use permission::{PermissionMode, PermissionStore};
pub use request::{ReqwestTransport, Transport};
pub use session::{SessionEvent, SessionPhase, SessionStore};
pub use table::{BasicTable, BasicTableProps};
