//! 请求/响应转换
//!
//! 请求前整理 url、参数与请求头；响应后检查状态码并拆信封。

use cms_console_shared::{
    ApiEnvelope, CONTENT_TYPE_JSON, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HttpMethod,
    Timestamp,
};
use serde_json::{Map, Value};

use crate::config::HttpConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::request::{HttpRequest, HttpResponse};

use super::cancel::pending_key;
use super::options::{RequestConfig, RequestOptions};

const TIMESTAMP_PARAM: &str = "_t";
pub const REQUEST_FAILED_MESSAGE: &str = "API Request Failed";

/// 准备好的请求
pub struct PreparedRequest {
    /// 去重用的 `method&url`（不含 query）
    pub key: String,
    pub request: HttpRequest,
}

/// 拼接前缀与 api 地址；绝对 url 保持不变
pub fn shape_url(url: &str, options: &RequestOptions, http: &HttpConfig) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let mut shaped = url.to_string();
    if options.join_prefix {
        let prefix = options.url_prefix.as_deref().unwrap_or(&http.url_prefix);
        shaped = format!("{}{}", prefix, shaped);
    }
    let api_url = options.api_url.as_deref().unwrap_or(&http.api_url);
    if !api_url.is_empty() {
        shaped = format!("{}{}", api_url.trim_end_matches('/'), shaped);
    }
    shaped
}

/// 对象参数编码为 query；null 跳过，嵌套值按 JSON 编码
pub fn encode_query(params: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::String(s) => {
                serializer.append_pair(key, s);
            }
            Value::Number(_) | Value::Bool(_) => {
                serializer.append_pair(key, &value.to_string());
            }
            other => {
                serializer.append_pair(key, &other.to_string());
            }
        }
    }
    serializer.finish()
}

pub fn append_query(url: &str, params: &Map<String, Value>) -> String {
    let query = encode_query(params);
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, query)
}

fn is_non_empty(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// 请求前处理
///
/// - GET：params 作为 query，可追加 `_t`
/// - 其他：有 data 时 data 为 body、params 为 query；否则 params 作为 body
pub fn before_request(
    config: RequestConfig,
    options: &RequestOptions,
    http: &HttpConfig,
    token: Option<&str>,
) -> ConsoleResult<PreparedRequest> {
    let url = shape_url(&config.url, options, http);
    let key = pending_key(config.method, &url);

    let as_object = |v: Option<Value>| -> ConsoleResult<Map<String, Value>> {
        match v {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(ConsoleError::invalid_input(format!(
                "request params must be an object, got {}",
                other
            ))
            .in_op_with("http.before_request", url.clone())),
        }
    };

    let mut final_url = url.clone();
    let mut body = None;

    if config.method == HttpMethod::Get {
        let mut params = as_object(config.params)?;
        if options.join_time {
            params.insert(
                TIMESTAMP_PARAM.to_string(),
                Value::from(Timestamp::now().as_millis()),
            );
        }
        final_url = append_query(&final_url, &params);
    } else if config.multipart.is_none() {
        let (query, payload) = if is_non_empty(&config.data) {
            (as_object(config.params)?, config.data)
        } else {
            (Map::new(), config.params)
        };
        if options.join_params_to_url {
            let mut merged = query.clone();
            if let Some(Value::Object(data)) = &payload {
                merged.extend(data.clone());
            }
            final_url = append_query(&final_url, &merged);
        } else {
            final_url = append_query(&final_url, &query);
        }
        body = payload;
    }

    let mut request = HttpRequest::new(&final_url, config.method);
    if config.multipart.is_none() {
        request = request.with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
    }
    for (k, v) in &config.headers {
        request = request.with_header(k, v);
    }
    if options.with_token {
        if let Some(token) = token {
            let value = if http.authentication_scheme.is_empty() {
                token.to_string()
            } else {
                format!("{} {}", http.authentication_scheme, token)
            };
            request = request.with_header(HEADER_AUTHORIZATION, &value);
        }
    }
    if let Some(fields) = config.multipart {
        request = request.with_multipart(fields);
    } else if let Some(body) = body {
        request = request.with_body(body);
    }
    if let Some(timeout) = config.timeout {
        request = request.with_timeout(timeout);
    }

    Ok(PreparedRequest { key, request })
}

/// 非 2xx 状态码 -> 错误
///
/// 400 使用后端消息；401 为未授权（调用方负责登出）；其他使用状态码文本。
pub fn check_status(response: &HttpResponse) -> ConsoleResult<()> {
    if response.is_success() {
        return Ok(());
    }
    let backend_message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.pointer("/error/message")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|m| !m.is_empty());

    let err = match response.status {
        400 => ConsoleError::status(
            400,
            backend_message.unwrap_or_else(|| "Bad Request".to_string()),
        ),
        401 => ConsoleError::unauthorized(backend_message.unwrap_or_else(|| "401".to_string())),
        code => ConsoleError::status(code, status_text(code)),
    };
    Err(err.in_op_with("http.check_status", response.status.to_string()))
}

fn status_text(code: u16) -> String {
    let text = match code {
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return format!("Request failed with status {}", code),
    };
    format!("{} ({})", text, code)
}

/// 拆信封：成功码返回 `data`，超时码视为会话失效，其他为业务错误
pub fn transform_envelope(body: &str, http: &HttpConfig) -> ConsoleResult<Value> {
    let envelope: ApiEnvelope<Value> = serde_json::from_str(body).map_err(|e| {
        ConsoleError::transform(REQUEST_FAILED_MESSAGE)
            .with_source(e)
            .in_op("http.transform_envelope")
    })?;

    if envelope.code == http.success_code {
        return Ok(envelope.data.unwrap_or(Value::Null));
    }
    if envelope.code == http.timeout_code {
        return Err(ConsoleError::unauthorized("Timeout").in_op("http.transform_envelope"));
    }
    let message = if envelope.message.is_empty() {
        REQUEST_FAILED_MESSAGE.to_string()
    } else {
        envelope.message
    };
    Err(ConsoleError::business(envelope.code, message).in_op("http.transform_envelope"))
}
