use super::*;
use crate::error::ConsoleErrorKind;
use crate::notify::RecordingNotifier;
use crate::request::{HttpBody, MockReply, MockTransport};
use crate::session::SessionEvent;
use crate::storage::{AuthCache, MemoryStore};
use cms_console_shared::HEADER_AUTHORIZATION;
use serde_json::json;
use std::cell::Cell;

struct Harness {
    transport: Rc<MockTransport>,
    session: Rc<SessionStore>,
    notifier: Rc<RecordingNotifier>,
    http: DefHttp,
}

fn harness() -> Harness {
    let transport = Rc::new(MockTransport::new());
    let session = Rc::new(SessionStore::new(AuthCache::new(Rc::new(MemoryStore::new()))));
    let notifier = Rc::new(RecordingNotifier::default());
    let mut config = ConsoleConfig::default();
    config.request.retry.wait_ms = 1;
    let http = DefHttp::new(
        transport.clone(),
        session.clone(),
        notifier.clone(),
        Rc::new(config),
    );
    Harness {
        transport,
        session,
        notifier,
        http,
    }
}

fn logout_counter(session: &SessionStore) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    session.subscribe(move |e| {
        if *e == SessionEvent::LoggedOut {
            c.set(c.get() + 1);
        }
    });
    count
}

// =========================================================
// 信封与鉴权
// =========================================================

#[tokio::test]
async fn unwraps_envelope_and_sends_bearer() {
    let h = harness();
    h.session.set_token(Some("tk".into()));
    h.transport
        .ok(HttpMethod::Get, "/api/v1/auth/current", json!({"username": "root"}));

    let info: cms_console_shared::UserInfo = h.http.get("/auth/current", None).await.unwrap();
    assert_eq!(info.username, "root");

    let sent = h.transport.last_request().unwrap();
    assert_eq!(sent.header(HEADER_AUTHORIZATION), Some("Bearer tk"));
    assert!(sent.url.contains("_t="));
    assert_eq!(h.notifier.total(), 0);
}

#[tokio::test]
async fn status_401_logs_out_exactly_once() {
    for mode in [ErrorMessageMode::None, ErrorMessageMode::Message, ErrorMessageMode::Modal] {
        let h = harness();
        h.session.set_token(Some("expired".into()));
        let logouts = logout_counter(&h.session);
        h.transport.reply(
            HttpMethod::Get,
            "/api/v1/articles",
            MockReply::Response(401, json!({"message": "token expired"})),
        );

        let opts = h.http.options().with_error_mode(mode);
        let err = h
            .http
            .request_value(RequestConfig::get("/articles"), Some(opts))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ConsoleErrorKind::Unauthorized);
        assert_eq!(logouts.get(), 1);
        assert!(h.session.get_token().is_none());
        // 401 不重试
        assert_eq!(h.transport.count(HttpMethod::Get, "/api/v1/articles"), 1);
        match mode {
            ErrorMessageMode::None => assert_eq!(h.notifier.total(), 0),
            ErrorMessageMode::Message => {
                assert_eq!(*h.notifier.messages.borrow(), vec!["token expired".to_string()])
            }
            ErrorMessageMode::Modal => {
                assert!(h.notifier.messages.borrow().is_empty());
                assert_eq!(h.notifier.dialogs.borrow().len(), 1);
            }
        }
    }
}

#[tokio::test]
async fn envelope_timeout_code_forces_logout() {
    let h = harness();
    h.session.set_token(Some("tk".into()));
    let logouts = logout_counter(&h.session);
    h.transport.reply(
        HttpMethod::Post,
        "/api/v1/news",
        MockReply::Response(200, json!({"code": 401, "message": "session expired"})),
    );

    let err = h.http.post::<Value>("/news", json!({"title": "x"})).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Timeout");
    assert_eq!(logouts.get(), 1);
}

#[tokio::test]
async fn business_error_surfaces_backend_message() {
    let h = harness();
    h.transport.reply(
        HttpMethod::Get,
        "/api/v1/banners",
        MockReply::Response(200, json!({"code": 10002, "type": "error", "message": "banner disabled"})),
    );

    let err = h.http.get::<Value>("/banners", None).await.unwrap_err();
    assert_eq!(err.kind, ConsoleErrorKind::Business(10002));
    assert_eq!(err.message(), "banner disabled");
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/v1/banners"), 1);
    assert_eq!(h.notifier.total(), 1);
}

#[tokio::test]
async fn modal_mode_opens_dialog() {
    let h = harness();
    h.transport.reply(
        HttpMethod::Delete,
        "/api/v1/pages/3",
        MockReply::Response(200, json!({"code": 1, "message": "in use"})),
    );
    let opts = h.http.options().with_error_mode(ErrorMessageMode::Modal);
    let _ = h
        .http
        .request_value(RequestConfig::delete("/pages/3"), Some(opts))
        .await;
    assert!(h.notifier.messages.borrow().is_empty());
    assert_eq!(h.notifier.dialogs.borrow()[0].1, "in use");
}

#[tokio::test]
async fn raw_body_when_transform_disabled() {
    let h = harness();
    h.transport.reply(
        HttpMethod::Get,
        "/api/v1/system/info",
        MockReply::Response(200, json!({"cpu": {"cores": 4}})),
    );
    let mut opts = h.http.options();
    opts.is_transform_response = false;
    let v = h
        .http
        .request_value(RequestConfig::get("/system/info"), Some(opts))
        .await
        .unwrap();
    assert_eq!(v["cpu"]["cores"], 4);

    let native = h
        .http
        .request_native(RequestConfig::get("/system/info"), None)
        .await
        .unwrap();
    assert_eq!(native.status, 200);
}

// =========================================================
// 重试
// =========================================================

#[tokio::test]
async fn get_retries_transient_failures_then_succeeds() {
    let h = harness();
    h.transport
        .reply(HttpMethod::Get, "/api/v1/news", MockReply::Timeout);
    h.transport
        .reply(HttpMethod::Get, "/api/v1/news", MockReply::Network);
    h.transport.ok(HttpMethod::Get, "/api/v1/news", json!([]));

    let items: Vec<Value> = h.http.get("/news", None).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/v1/news"), 3);
    assert_eq!(h.notifier.total(), 0);
}

#[tokio::test]
async fn retry_is_bounded_and_notifies_once() {
    let h = harness();
    h.transport
        .reply(HttpMethod::Get, "/api/v1/products", MockReply::Timeout);

    let err = h.http.get::<Value>("/products", None).await.unwrap_err();
    assert_eq!(err.kind, ConsoleErrorKind::Timeout);
    assert_eq!(err.message(), "API Timeout");
    // 首次 + 5 次重试
    assert_eq!(h.transport.count(HttpMethod::Get, "/api/v1/products"), 6);
    assert_eq!(*h.notifier.messages.borrow(), vec!["API Timeout".to_string()]);
}

#[tokio::test]
async fn mutations_are_never_retried() {
    let h = harness();
    h.transport
        .reply(HttpMethod::Post, "/api/v1/products", MockReply::Network);

    let err = h.http.post::<Value>("/products", json!({"name": "x"})).await.unwrap_err();
    assert_eq!(err.message(), "Network Error");
    assert_eq!(h.transport.count(HttpMethod::Post, "/api/v1/products"), 1);
}

// =========================================================
// 取消
// =========================================================

#[tokio::test]
async fn duplicate_request_cancels_older_silently() {
    let h = harness();
    h.transport.set_yields(2);
    h.transport.ok(HttpMethod::Get, "/api/v1/articles", json!({"items": []}));

    let first = h
        .http
        .request_value(RequestConfig::get("/articles").params(json!({"page": 1})), None);
    let second = h
        .http
        .request_value(RequestConfig::get("/articles").params(json!({"page": 2})), None);
    let (first, second) = futures::join!(first, second);

    assert!(first.unwrap_err().is_cancelled());
    assert!(second.is_ok());
    assert_eq!(h.notifier.total(), 0);
    assert_eq!(h.http.canceler().pending_count(), 0);
}

#[tokio::test]
async fn ignore_cancel_token_opts_out_of_dedup() {
    let h = harness();
    h.transport.set_yields(2);
    h.transport.ok(HttpMethod::Get, "/api/v1/articles", json!(1));

    let opts = h.http.options().ignore_cancel();
    let (a, b) = futures::join!(
        h.http
            .request_value(RequestConfig::get("/articles"), Some(opts.clone())),
        h.http.request_value(RequestConfig::get("/articles"), Some(opts)),
    );
    assert!(a.is_ok() && b.is_ok());
}

// =========================================================
// 上传
// =========================================================

#[tokio::test]
async fn upload_sends_multipart_and_reports_progress() {
    let h = harness();
    h.transport
        .ok(HttpMethod::Post, "/api/v1/storage/upload", json!({"key": "img/a.png"}));

    let progress = std::cell::RefCell::new(Vec::new());
    let on_progress = |p: UploadProgress| progress.borrow_mut().push((p.loaded, p.total));
    let params = UploadFileParams {
        file: Some(UploadFile {
            file_name: "a.png".into(),
            content_type: "image/png".into(),
            bytes: vec![0u8; 10],
        }),
        prefix: Some("img/".into()),
        quality: Some(80),
        ..Default::default()
    };

    let v = h
        .http
        .upload_file("/storage/upload", params, Some(&on_progress))
        .await
        .unwrap();
    assert_eq!(v["key"], "img/a.png");
    assert_eq!(*progress.borrow(), vec![(0, 10), (10, 10)]);

    let sent = h.transport.last_request().unwrap();
    match sent.body {
        HttpBody::Multipart(fields) => {
            let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["file", "prefix", "quality"]);
        }
        other => panic!("expected multipart body, got {:?}", other),
    }
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let h = harness();
    let err = h
        .http
        .upload_file("/storage/upload", UploadFileParams::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ConsoleErrorKind::InvalidInput);
    assert!(h.transport.requests.borrow().is_empty());
}
