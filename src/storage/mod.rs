//! 本地存储模块
//!
//! `KeyValueStore` 抽象宿主的持久化存储（浏览器 LocalStorage、文件、内存），
//! `AuthCache` 在其上实现带过期时间、可选加密的认证缓存。

mod cipher;

pub use cipher::AesCipher;

use cms_console_shared::Timestamp;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::ConsoleResult;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cipher key and iv must be 16 bytes, got {0}")]
    InvalidKey(usize),
    #[error("decrypt failed: {0}")]
    Decrypt(String),
    #[error("store rejected write for key {0}")]
    WriteRejected(String),
}

// =========================================================
// 键值存储抽象
// =========================================================

/// 宿主提供的字符串键值存储
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    /// 返回是否写入成功
    fn set(&self, key: &str, value: &str) -> bool;

    /// 返回是否删除成功
    fn remove(&self, key: &str) -> bool;

    fn clear(&self);
}

/// 内存存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.items.borrow_mut().remove(key).is_some()
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

// =========================================================
// 认证缓存
// =========================================================

/// 持久化条目格式 `{value, time, expire}`
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    time: i64,
    /// None 表示永不过期
    expire: Option<i64>,
}

pub struct AuthCache {
    store: Rc<dyn KeyValueStore>,
    cipher: Option<AesCipher>,
    default_ttl: Option<Duration>,
}

impl AuthCache {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cipher: None,
            default_ttl: None,
        }
    }

    pub fn from_config(store: Rc<dyn KeyValueStore>, config: &CacheConfig) -> ConsoleResult<Self> {
        let cipher = if config.enable_encryption {
            Some(AesCipher::new(&config.aes_key, &config.aes_iv)?)
        } else {
            None
        };
        Ok(Self {
            store,
            cipher,
            default_ttl: Some(Duration::from_secs(config.default_cache_secs)),
        })
    }

    pub fn with_cipher(mut self, cipher: AesCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// 写入缓存，`ttl` 为 None 时使用默认过期时间
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> ConsoleResult<()> {
        let now = Timestamp::now();
        let expire = ttl.or(self.default_ttl).map(|d| (now + d).as_millis());
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            time: now.as_millis(),
            expire,
        };
        let mut raw = serde_json::to_string(&entry)?;
        if let Some(cipher) = &self.cipher {
            raw = cipher.encrypt(&raw)?;
        }
        if !self.store.set(key, &raw) {
            return Err(CacheError::WriteRejected(key.to_string()).into());
        }
        Ok(())
    }

    /// 读取缓存；过期、解密失败、格式错误都视为不存在并清除该条目
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        let plain = match &self.cipher {
            Some(cipher) => match cipher.decrypt(&raw) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("[Cache] Drop unreadable entry {}: {}", key, e);
                    self.store.remove(key);
                    return None;
                }
            },
            None => raw,
        };

        let entry: CacheEntry = match serde_json::from_str(&plain) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("[Cache] Drop malformed entry {}: {}", key, e);
                self.store.remove(key);
                return None;
            }
        };

        if let Some(expire) = entry.expire {
            if expire <= Timestamp::now().as_millis() {
                tracing::debug!("[Cache] Entry {} expired", key);
                self.store.remove(key);
                return None;
            }
        }

        serde_json::from_value(entry.value).ok()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.store.remove(key)
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}
