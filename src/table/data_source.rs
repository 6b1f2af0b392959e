//! 表格数据源
//!
//! 合并参数、执行请求前后管道、解析结果、维护分页并发出事件。
//! 同一表格的并发请求不排队，旧请求只会被 HTTP 层的去重取消。

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{ConsoleError, ConsoleResult};

use super::pagination::{Pagination, PaginationPatch, page_count};
use super::props::{
    AfterFetch, BeforeFetch, FetchParams, FetchSetting, FilterFn, ROW_KEY, Row, SortFn, SortState,
    TableApi,
};

/// 请求结果事件
#[derive(Debug, Clone)]
pub enum FetchEvent {
    Success { items: Vec<Row>, total: u64 },
    Error(ConsoleError),
}

type Listener = Rc<dyn Fn(&FetchEvent)>;

/// 进行中的请求计数，离开作用域时归还
struct LoadingGuard<'a>(&'a Cell<usize>);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

#[derive(Default)]
struct DataState {
    rows: Vec<Row>,
    raw: Value,
    sort_info: Map<String, Value>,
    filter_info: Map<String, Value>,
}

pub struct DataSource {
    api: Option<Rc<dyn TableApi>>,
    fetch_setting: FetchSetting,
    search_info: Map<String, Value>,
    before_fetch: Vec<Rc<dyn BeforeFetch>>,
    after_fetch: Vec<Rc<dyn AfterFetch>>,
    sort_fn: SortFn,
    filter_fn: FilterFn,
    row_key: Option<String>,
    auto_create_key: bool,
    pagination: RefCell<Pagination>,
    state: RefCell<DataState>,
    loading: Cell<usize>,
    listeners: RefCell<Vec<Listener>>,
}

pub(crate) struct DataSourceParts {
    pub api: Option<Rc<dyn TableApi>>,
    pub data: Vec<Row>,
    pub fetch_setting: FetchSetting,
    pub search_info: Map<String, Value>,
    pub before_fetch: Vec<Rc<dyn BeforeFetch>>,
    pub after_fetch: Vec<Rc<dyn AfterFetch>>,
    pub sort_fn: SortFn,
    pub filter_fn: FilterFn,
    pub row_key: Option<String>,
    pub auto_create_key: bool,
    pub pagination: Pagination,
}

impl DataSource {
    pub(crate) fn from_parts(parts: DataSourceParts) -> Self {
        Self {
            api: parts.api,
            fetch_setting: parts.fetch_setting,
            search_info: parts.search_info,
            before_fetch: parts.before_fetch,
            after_fetch: parts.after_fetch,
            sort_fn: parts.sort_fn,
            filter_fn: parts.filter_fn,
            row_key: parts.row_key,
            auto_create_key: parts.auto_create_key,
            pagination: RefCell::new(parts.pagination),
            state: RefCell::new(DataState {
                rows: parts.data,
                ..Default::default()
            }),
            loading: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn pagination(&self) -> &RefCell<Pagination> {
        &self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get() > 0
    }

    pub fn subscribe(&self, listener: impl Fn(&FetchEvent) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn emit(&self, event: FetchEvent) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&event);
        }
    }

    // =========================================================
    // 请求
    // =========================================================

    /// 未配置 api 时直接返回
    pub async fn fetch(&self, opt: FetchParams) -> ConsoleResult<()> {
        let Some(api) = self.api.clone() else {
            return Ok(());
        };
        let _loading = LoadingGuard::new(&self.loading);

        match self.fetch_inner(api.as_ref(), opt).await {
            Ok((items, total)) => {
                self.emit(FetchEvent::Success { items, total });
                Ok(())
            }
            Err(e) => {
                self.state.borrow_mut().rows.clear();
                self.pagination.borrow_mut().set_pagination(PaginationPatch {
                    item_count: Some(0),
                    ..Default::default()
                });
                if e.is_cancelled() {
                    tracing::debug!("[Table] Fetch superseded");
                } else {
                    tracing::warn!("[Table] Fetch failed: {}", e);
                    self.emit(FetchEvent::Error(e.clone()));
                }
                Err(e.in_op("table.fetch"))
            }
        }
    }

    pub async fn reload(&self, opt: FetchParams) -> ConsoleResult<()> {
        self.fetch(opt).await
    }

    async fn fetch_inner(&self, api: &dyn TableApi, opt: FetchParams) -> ConsoleResult<(Vec<Row>, u64)> {
        let mut requested_page = opt.page;
        let mut corrected = false;

        loop {
            let (paginated, page, page_size) = {
                let pagination = self.pagination.borrow();
                let (page, size) = pagination.page_and_size();
                (pagination.get_pagination_info().is_some(), page, size)
            };
            let page = requested_page.unwrap_or(page);

            let params = self.build_params(paginated, page, page_size, &opt);
            let params = self.run_before_fetch(params).await?;

            let response = api.fetch(params).await?;
            self.state.borrow_mut().raw = response.clone();
            let (mut items, total) = extract_result(response, &self.fetch_setting)?;

            // 分页关闭或隐藏时请求不带页码，不做纠正
            if paginated && total > 0 {
                let last_page = page_count(total, page_size);
                if page > last_page {
                    if corrected {
                        tracing::warn!("[Table] Page {} still beyond {} pages", page, last_page);
                    } else {
                        tracing::debug!("[Table] Page {} beyond {} pages, refetch", page, last_page);
                        self.pagination
                            .borrow_mut()
                            .set_pagination(PaginationPatch::page(last_page));
                        requested_page = None;
                        corrected = true;
                        continue;
                    }
                }
            }

            items = self.run_after_fetch(items).await?;
            self.state.borrow_mut().rows = items.clone();

            let mut pagination = self.pagination.borrow_mut();
            pagination.set_pagination(PaginationPatch {
                item_count: Some(total),
                ..Default::default()
            });
            if let Some(page) = requested_page {
                pagination.set_pagination(PaginationPatch::page(page));
            }
            pagination.clamp_page();
            return Ok((items, total));
        }
    }

    /// 优先级递增：分页 -> 静态搜索 -> 排序 -> 筛选 -> 本次搜索 -> 本次排序 -> 本次筛选
    fn build_params(&self, paginated: bool, page: u64, page_size: u64, opt: &FetchParams) -> Map<String, Value> {
        let mut params = Map::new();
        if paginated {
            params.insert(self.fetch_setting.page_field.clone(), Value::from(page));
            params.insert(self.fetch_setting.size_field.clone(), Value::from(page_size));
        }
        let state = self.state.borrow();
        let layers = [
            Some(&self.search_info),
            Some(&state.sort_info),
            Some(&state.filter_info),
            opt.search_info.as_ref(),
            opt.sort_info.as_ref(),
            opt.filter_info.as_ref(),
        ];
        for layer in layers.into_iter().flatten() {
            deep_merge(&mut params, layer);
        }
        params
    }

    async fn run_before_fetch(&self, mut params: Map<String, Value>) -> ConsoleResult<Map<String, Value>> {
        for stage in &self.before_fetch {
            if let Some(next) = stage.apply(&params).await? {
                if !next.is_empty() {
                    params = next;
                }
            }
        }
        Ok(params)
    }

    async fn run_after_fetch(&self, mut rows: Vec<Row>) -> ConsoleResult<Vec<Row>> {
        for stage in &self.after_fetch {
            if let Some(next) = stage.apply(&rows).await? {
                rows = next;
            }
        }
        Ok(rows)
    }

    /// 表头排序/筛选变化：更新保存的状态并重新请求
    pub async fn handle_table_change(
        &self,
        filters: Option<Map<String, Value>>,
        sorter: Option<SortState>,
    ) -> ConsoleResult<()> {
        let mut opt = FetchParams::default();
        {
            let mut state = self.state.borrow_mut();
            if let Some(sorter) = sorter {
                let info = (self.sort_fn)(&sorter);
                state.sort_info = info.clone();
                opt.sort_info = Some(info);
            }
            if let Some(filters) = filters {
                let info = (self.filter_fn)(&filters);
                state.filter_info = info.clone();
                opt.filter_info = Some(info);
            }
        }
        self.fetch(opt).await
    }

    // =========================================================
    // 数据读写
    // =========================================================

    fn auto_create_key(&self) -> bool {
        self.auto_create_key && self.row_key.is_none()
    }

    pub fn get_row_key(&self) -> Option<String> {
        if self.auto_create_key() {
            Some(ROW_KEY.to_string())
        } else {
            self.row_key.clone()
        }
    }

    /// 当前行；需要时懒生成行 key
    pub fn get_data_source(&self) -> Vec<Row> {
        let mut state = self.state.borrow_mut();
        if self.auto_create_key() {
            let missing = |row: Option<&Row>| row.is_some_and(|r| !has_row_key(r));
            if missing(state.rows.first()) || missing(state.rows.last()) {
                assign_row_keys(&mut state.rows);
            }
        }
        state.rows.clone()
    }

    pub fn get_raw_data_source(&self) -> Value {
        self.state.borrow().raw.clone()
    }

    pub fn set_table_data(&self, rows: Vec<Row>) {
        self.state.borrow_mut().rows = rows;
    }

    pub fn find_row_by_key(&self, key: &Value) -> Option<Row> {
        let field = self.get_row_key()?;
        self.state
            .borrow()
            .rows
            .iter()
            .find(|r| r.get(&field) == Some(key))
            .cloned()
    }

    /// 合并字段到匹配行，返回是否找到
    pub fn update_row_by_key(&self, key: &Value, patch: Map<String, Value>) -> bool {
        let Some(field) = self.get_row_key() else {
            return false;
        };
        let mut state = self.state.borrow_mut();
        match state.rows.iter_mut().find(|r| r.get(&field) == Some(key)) {
            Some(row) => {
                row.extend(patch);
                true
            }
            None => false,
        }
    }

    pub fn delete_row_by_key(&self, key: &Value) -> bool {
        let Some(field) = self.get_row_key() else {
            return false;
        };
        let mut state = self.state.borrow_mut();
        let before = state.rows.len();
        state.rows.retain(|r| r.get(&field) != Some(key));
        state.rows.len() != before
    }

    /// 插入行，`index` 越界或缺省时追加
    pub fn insert_row(&self, row: Row, index: Option<usize>) {
        let mut state = self.state.borrow_mut();
        let at = index.unwrap_or(state.rows.len()).min(state.rows.len());
        state.rows.insert(at, row);
    }
}

// =========================================================
// 辅助函数
// =========================================================

fn has_row_key(row: &Row) -> bool {
    row.get(ROW_KEY)
        .is_some_and(|v| !v.is_null() && v.as_str() != Some(""))
}

/// 为缺少 key 的行（含 children）生成 UUID；已有的 key 不变
pub fn assign_row_keys(rows: &mut [Row]) {
    for row in rows.iter_mut() {
        if !has_row_key(row) {
            row.insert(ROW_KEY.to_string(), Value::from(uuid::Uuid::new_v4().to_string()));
        }
        if let Some(Value::Array(children)) = row.get_mut("children") {
            for child in children.iter_mut() {
                if let Value::Object(child) = child {
                    assign_row_keys(std::slice::from_mut(child));
                }
            }
        }
    }
}

/// 对象递归合并，其余值覆盖
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) if target.get(key).is_some_and(Value::is_object) => {
                if let Some(Value::Object(existing)) = target.get_mut(key) {
                    deep_merge(existing, incoming);
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// 点号路径取值，如 `data.items`
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .try_fold(value, |v, segment| v.get(segment))
}

fn into_rows(values: Vec<Value>) -> ConsoleResult<Vec<Row>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Object(row) => Ok(row),
            other => Err(ConsoleError::transform(format!("table row must be an object, got {}", other))),
        })
        .collect()
}

/// 数组结果：全部行，总数为长度；对象结果：按字段路径取列表与总数
fn extract_result(response: Value, setting: &FetchSetting) -> ConsoleResult<(Vec<Row>, u64)> {
    match response {
        Value::Array(items) => {
            let total = items.len() as u64;
            Ok((into_rows(items)?, total))
        }
        Value::Object(_) => {
            let items = match get_path(&response, &setting.list_field) {
                Some(Value::Array(items)) => into_rows(items.clone())?,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(ConsoleError::transform(format!(
                        "field '{}' is not a list: {}",
                        setting.list_field, other
                    ))
                    .in_op("table.extract_result"));
                }
            };
            let total = get_path(&response, &setting.total_field)
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Ok((items, total))
        }
        Value::Null => Ok((Vec::new(), 0)),
        other => Err(ConsoleError::transform(format!("unexpected table result: {}", other))
            .in_op("table.extract_result")),
    }
}
