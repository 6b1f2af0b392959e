//! 登录与当前用户

use cms_console_shared::{LoginParams, LoginResult, UserInfo};
use serde_json::Value;

use crate::error::ConsoleResult;
use crate::http::{DefHttp, ErrorMessageMode, RequestConfig};

const LOGIN: &str = "/auth/login";
const CURRENT_USER: &str = "/auth/current";

/// 登录请求不携带 token，参数作为 body 发送
pub async fn login_api(
    http: &DefHttp,
    params: &LoginParams,
    mode: ErrorMessageMode,
) -> ConsoleResult<LoginResult> {
    let options = http.options().with_error_mode(mode).without_token();
    let config = RequestConfig::post(LOGIN).params(serde_json::to_value(params)?);
    http.request(config, Some(options)).await
}

pub async fn get_user_info_api(http: &DefHttp) -> ConsoleResult<UserInfo> {
    http.get(CURRENT_USER, None::<Value>).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::notify::RecordingNotifier;
    use crate::request::{HttpBody, MockTransport};
    use crate::session::SessionStore;
    use crate::storage::{AuthCache, MemoryStore};
    use cms_console_shared::{HEADER_AUTHORIZATION, HttpMethod};
    use serde_json::json;
    use std::rc::Rc;

    #[tokio::test]
    async fn login_posts_credentials_without_token() {
        let transport = Rc::new(MockTransport::new());
        let session = Rc::new(SessionStore::new(AuthCache::new(Rc::new(MemoryStore::new()))));
        session.set_token(Some("stale".into()));
        let http = DefHttp::new(
            transport.clone(),
            session,
            Rc::new(RecordingNotifier::default()),
            Rc::new(ConsoleConfig::default()),
        );
        transport.ok(HttpMethod::Post, "/api/v1/auth/login", json!({"token": "fresh"}));

        let params = LoginParams {
            email: "admin@example.com".into(),
            password: "secret".into(),
        };
        let result = login_api(&http, &params, ErrorMessageMode::None).await.unwrap();
        assert_eq!(result.token, "fresh");

        let sent = transport.last_request().unwrap();
        assert!(sent.header(HEADER_AUTHORIZATION).is_none());
        assert_eq!(
            sent.body,
            HttpBody::Json(json!({"email": "admin@example.com", "password": "secret"}))
        );
    }
}
