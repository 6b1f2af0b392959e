//! 对象存储：上传凭证、文件列表、删除、直传

use cms_console_shared::models::{FileListParams, StorageKeyParams};
use serde_json::Value;

use crate::error::ConsoleResult;
use crate::http::{DefHttp, RequestConfig, UploadFileParams, UploadProgress};

const UPLOAD_TOKEN: &str = "/storage/upload-token";
const FILES: &str = "/storage/files";
const DELETE_FILE: &str = "/storage/files/delete";
const UPLOAD: &str = "/storage/upload";

/// 客户端直传所需的凭证（七牛等驱动）
pub async fn get_upload_token(http: &DefHttp, params: &StorageKeyParams) -> ConsoleResult<Value> {
    http.post(UPLOAD_TOKEN, serde_json::to_value(params)?).await
}

/// 文件列表；响应形状随驱动不同，保持未类型化
pub async fn get_file_list(http: &DefHttp, params: &FileListParams) -> ConsoleResult<Value> {
    let config = RequestConfig::get(FILES).params(serde_json::to_value(params)?);
    http.request_value(config, None).await
}

pub async fn delete_file(http: &DefHttp, params: &StorageKeyParams) -> ConsoleResult<Value> {
    http.post(DELETE_FILE, serde_json::to_value(params)?).await
}

pub async fn upload(
    http: &DefHttp,
    params: UploadFileParams,
    on_progress: Option<&dyn Fn(UploadProgress)>,
) -> ConsoleResult<Value> {
    http.upload_file(UPLOAD, params, on_progress).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::notify::RecordingNotifier;
    use crate::request::{HttpBody, MockTransport};
    use crate::session::SessionStore;
    use crate::storage::{AuthCache, MemoryStore};
    use cms_console_shared::HttpMethod;
    use serde_json::json;
    use std::rc::Rc;

    fn http(transport: Rc<MockTransport>) -> DefHttp {
        DefHttp::new(
            transport,
            Rc::new(SessionStore::new(AuthCache::new(Rc::new(MemoryStore::new())))),
            Rc::new(RecordingNotifier::default()),
            Rc::new(ConsoleConfig::default()),
        )
    }

    #[tokio::test]
    async fn file_list_sends_only_given_params() {
        let transport = Rc::new(MockTransport::new());
        transport.ok(HttpMethod::Get, "/api/v1/storage/files", json!({"items": []}));
        let params = FileListParams {
            prefix: Some("img/".into()),
            driver: Some("qiniu".into()),
            ..Default::default()
        };
        get_file_list(&http(transport.clone()), &params).await.unwrap();

        let url = transport.last_request().unwrap().url;
        assert!(url.contains("prefix=img%2F") && url.contains("driver=qiniu"));
        assert!(!url.contains("limit"));
    }

    #[tokio::test]
    async fn delete_posts_key() {
        let transport = Rc::new(MockTransport::new());
        transport.ok(HttpMethod::Post, "/api/v1/storage/files/delete", json!(null));
        let params = StorageKeyParams {
            key: "img/a.png".into(),
            driver: None,
        };
        delete_file(&http(transport.clone()), &params).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap().body,
            HttpBody::Json(json!({"key": "img/a.png"}))
        );
    }
}
