//! 重复请求取消
//!
//! 同一 `method&url` 的新请求会中止仍在进行中的旧请求。

use futures::future::{AbortHandle, AbortRegistration};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use cms_console_shared::HttpMethod;

pub fn pending_key(method: HttpMethod, url: &str) -> String {
    format!("{}&{}", method.as_str(), url)
}

#[derive(Debug, Default)]
pub struct RequestCanceler {
    pending: RefCell<HashMap<String, (u64, AbortHandle)>>,
    next_id: Cell<u64>,
}

impl RequestCanceler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记请求，返回 (id, 中止注册)；同 key 的旧请求被中止
    pub fn add_pending(&self, key: &str) -> (u64, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let previous = self
            .pending
            .borrow_mut()
            .insert(key.to_string(), (id, handle));
        if let Some((_, old)) = previous {
            tracing::debug!("[Http] Cancel duplicate request {}", key);
            old.abort();
        }
        (id, registration)
    }

    /// 请求结束；只移除自己登记的条目，避免误删后来者
    pub fn finish(&self, key: &str, id: u64) {
        let mut pending = self.pending.borrow_mut();
        if pending.get(key).is_some_and(|(owner, _)| *owner == id) {
            pending.remove(key);
        }
    }

    pub fn remove_all_pending(&self) {
        let drained: Vec<_> = self.pending.borrow_mut().drain().collect();
        if !drained.is_empty() {
            tracing::debug!("[Http] Cancel {} pending requests", drained.len());
        }
        for (_, (_, handle)) in drained {
            handle.abort();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::Abortable;

    #[tokio::test]
    async fn newer_request_aborts_older() {
        let canceler = RequestCanceler::new();
        let key = pending_key(HttpMethod::Get, "/api/v1/articles");

        let (first_id, first) = canceler.add_pending(&key);
        let (second_id, second) = canceler.add_pending(&key);

        assert!(Abortable::new(async {}, first).await.is_err());
        assert!(Abortable::new(async {}, second).await.is_ok());

        // 旧请求结束不影响新请求的登记
        canceler.finish(&key, first_id);
        assert_eq!(canceler.pending_count(), 1);
        canceler.finish(&key, second_id);
        assert_eq!(canceler.pending_count(), 0);
    }

    #[tokio::test]
    async fn remove_all_aborts_everything() {
        let canceler = RequestCanceler::new();
        let (_, a) = canceler.add_pending("GET&/a");
        let (_, b) = canceler.add_pending("POST&/b");
        canceler.remove_all_pending();

        assert!(Abortable::new(async {}, a).await.is_err());
        assert!(Abortable::new(async {}, b).await.is_err());
        assert_eq!(canceler.pending_count(), 0);
    }
}
