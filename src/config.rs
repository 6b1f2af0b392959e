//! 运行时配置 (Runtime Configuration)
//!
//! 所有字段都有默认值；`from_env` 在默认值之上覆盖环境变量。

use serde::{Deserialize, Serialize};

use crate::http::RequestOptions;
use crate::permission::PermissionMode;
use crate::table::FetchSetting;

/// 这些是默认值，环境变量或配置文件中没有定义时使用
const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_URL_PREFIX: &str = "/api/v1";
const DEFAULT_AUTH_SCHEME: &str = "Bearer";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SUCCESS_CODE: i64 = 0;
const DEFAULT_TIMEOUT_CODE: i64 = 401;

const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_CACHE_SECS: u64 = 60 * 60 * 24 * 7;
const DEFAULT_AES_KEY: &str = "_11111000001111@";
const DEFAULT_AES_IV: &str = "@11111000001111_";

pub const ENV_API_URL: &str = "CMS_API_URL";
pub const ENV_URL_PREFIX: &str = "CMS_URL_PREFIX";
pub const ENV_AUTH_SCHEME: &str = "CMS_AUTH_SCHEME";
pub const ENV_TIMEOUT_MS: &str = "CMS_TIMEOUT_MS";
pub const ENV_PERMISSION_MODE: &str = "CMS_PERMISSION_MODE";
pub const ENV_CACHE_ENCRYPTION: &str = "CMS_CACHE_ENCRYPTION";

// =========================================================
// 分组配置
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub api_url: String,
    pub url_prefix: String,
    pub authentication_scheme: String,
    pub timeout_ms: u64,
    /// 信封中表示成功的 code
    pub success_code: i64,
    /// 信封中表示会话超时的 code，收到后强制登出
    pub timeout_code: i64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            authentication_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            success_code: DEFAULT_SUCCESS_CODE,
            timeout_code: DEFAULT_TIMEOUT_CODE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub fetch_setting: FetchSetting,
    pub default_page_size: u64,
    pub page_size_options: Vec<u64>,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            fetch_setting: FetchSetting::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 20, 50, 100],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable_encryption: bool,
    /// AES-128 密钥，必须 16 字节
    pub aes_key: String,
    /// AES-128 向量，必须 16 字节
    pub aes_iv: String,
    pub default_cache_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_encryption: false,
            aes_key: DEFAULT_AES_KEY.to_string(),
            aes_iv: DEFAULT_AES_IV.to_string(),
            default_cache_secs: DEFAULT_CACHE_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub login: String,
    pub home: String,
    pub root: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/general/dashboard".to_string(),
            root: "/".to_string(),
        }
    }
}

// =========================================================
// 顶层配置
// =========================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub http: HttpConfig,
    /// 每个请求的默认选项，可被单次请求覆盖
    pub request: RequestOptions,
    pub table: TableSettings,
    pub cache: CacheConfig,
    pub permission_mode: PermissionMode,
    pub paths: PathConfig,
}

impl ConsoleConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意来源读取（测试或宿主注入）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match lookup(ENV_API_URL) {
            Some(v) => config.http.api_url = v,
            None => tracing::debug!("[Config] {} not set, using {}", ENV_API_URL, DEFAULT_API_URL),
        }
        match lookup(ENV_URL_PREFIX) {
            Some(v) => config.http.url_prefix = v,
            None => tracing::debug!(
                "[Config] {} not set, using {}",
                ENV_URL_PREFIX,
                DEFAULT_URL_PREFIX
            ),
        }
        if let Some(v) = lookup(ENV_AUTH_SCHEME) {
            config.http.authentication_scheme = v;
        }
        if let Some(v) = lookup(ENV_TIMEOUT_MS) {
            match v.parse::<u64>() {
                Ok(ms) => config.http.timeout_ms = ms,
                Err(_) => tracing::warn!(
                    "[Config] Invalid {}={:?}, using {}",
                    ENV_TIMEOUT_MS,
                    v,
                    DEFAULT_TIMEOUT_MS
                ),
            }
        }
        if let Some(v) = lookup(ENV_PERMISSION_MODE) {
            match v.to_ascii_lowercase().as_str() {
                "static" | "route_mapping" => config.permission_mode = PermissionMode::Static,
                "dynamic" | "back" => config.permission_mode = PermissionMode::Dynamic,
                other => tracing::warn!("[Config] Unknown permission mode {:?}, using dynamic", other),
            }
        }
        if let Some(v) = lookup(ENV_CACHE_ENCRYPTION) {
            config.cache.enable_encryption = matches!(v.as_str(), "1" | "true" | "TRUE" | "yes");
        }

        config
    }
}
