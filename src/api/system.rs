//! 系统信息与操作日志

use cms_console_shared::models::{OperationLogModel, SystemInfo};
use cms_console_shared::{BasicFetchResult, BasicPageParams};
use serde_json::Value;

use crate::error::ConsoleResult;
use crate::http::DefHttp;

const SYSTEM_INFO: &str = "/system/info";
const LOGS: &str = "/logs";

pub async fn get_system_info(http: &DefHttp) -> ConsoleResult<SystemInfo> {
    http.get(SYSTEM_INFO, None).await
}

/// 操作日志分页；`filters` 中的键与分页参数合并
pub async fn get_operation_logs(
    http: &DefHttp,
    page: BasicPageParams,
    filters: Option<Value>,
) -> ConsoleResult<BasicFetchResult<OperationLogModel>> {
    let mut params = serde_json::to_value(page)?;
    if let (Some(Value::Object(extra)), Some(obj)) = (filters, params.as_object_mut()) {
        obj.extend(extra);
    }
    http.get(LOGS, Some(params)).await
}
