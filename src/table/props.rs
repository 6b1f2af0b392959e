//! 表格配置与数据源接口

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;

use crate::error::ConsoleResult;

use super::column::{BasicColumn, ColumnPatch};
use super::pagination::PaginationPatch;

/// 一行数据
pub type Row = Map<String, Value>;

/// 自动生成的行 key 字段
pub const ROW_KEY: &str = "row-key";

// =========================================================
// 字段映射 (Fetch Setting)
// =========================================================

/// 请求与响应的字段名；`list_field` / `total_field` 支持点号路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSetting {
    pub page_field: String,
    pub size_field: String,
    pub list_field: String,
    pub total_field: String,
}

impl Default for FetchSetting {
    fn default() -> Self {
        Self {
            page_field: "page".to_string(),
            size_field: "pageSize".to_string(),
            list_field: "items".to_string(),
            total_field: "count".to_string(),
        }
    }
}

// =========================================================
// 数据源与管道 (Api & Pipelines)
// =========================================================

/// 表格数据源：返回数组或含列表/总数的对象
#[async_trait::async_trait(?Send)]
pub trait TableApi {
    async fn fetch(&self, params: Map<String, Value>) -> ConsoleResult<Value>;
}

/// 请求前阶段：返回非空 map 时替换参数
#[async_trait::async_trait(?Send)]
pub trait BeforeFetch {
    async fn apply(&self, params: &Map<String, Value>) -> ConsoleResult<Option<Map<String, Value>>>;
}

/// 请求后阶段：返回 `Some` 时替换行
#[async_trait::async_trait(?Send)]
pub trait AfterFetch {
    async fn apply(&self, rows: &[Row]) -> ConsoleResult<Option<Vec<Row>>>;
}

struct ParamsFn<F>(F);

#[async_trait::async_trait(?Send)]
impl<F> BeforeFetch for ParamsFn<F>
where
    F: Fn(&Map<String, Value>) -> Option<Map<String, Value>>,
{
    async fn apply(&self, params: &Map<String, Value>) -> ConsoleResult<Option<Map<String, Value>>> {
        Ok((self.0)(params))
    }
}

struct RowsFn<F>(F);

#[async_trait::async_trait(?Send)]
impl<F> AfterFetch for RowsFn<F>
where
    F: Fn(&[Row]) -> Option<Vec<Row>>,
{
    async fn apply(&self, rows: &[Row]) -> ConsoleResult<Option<Vec<Row>>> {
        Ok((self.0)(rows))
    }
}

/// 同步闭包作为请求前阶段
pub fn map_params<F>(f: F) -> Rc<dyn BeforeFetch>
where
    F: Fn(&Map<String, Value>) -> Option<Map<String, Value>> + 'static,
{
    Rc::new(ParamsFn(f))
}

/// 同步闭包作为请求后阶段
pub fn map_rows<F>(f: F) -> Rc<dyn AfterFetch>
where
    F: Fn(&[Row]) -> Option<Vec<Row>> + 'static,
{
    Rc::new(RowsFn(f))
}

// =========================================================
// 排序与筛选
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascend,
    Descend,
}

/// 表头排序事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column_key: String,
    pub order: Option<SortOrder>,
}

pub type SortFn = Rc<dyn Fn(&SortState) -> Map<String, Value>>;
pub type FilterFn = Rc<dyn Fn(&Map<String, Value>) -> Map<String, Value>>;

/// `{columnKey, order: ASC|DESC}`；未排序时为空
pub fn default_sort_fn(sort: &SortState) -> Map<String, Value> {
    let mut info = Map::new();
    if let Some(order) = sort.order {
        if !sort.column_key.is_empty() {
            info.insert("columnKey".into(), Value::from(sort.column_key.clone()));
            let order = match order {
                SortOrder::Descend => "DESC",
                SortOrder::Ascend => "ASC",
            };
            info.insert("order".into(), Value::from(order));
        }
    }
    info
}

pub fn default_filter_fn(filters: &Map<String, Value>) -> Map<String, Value> {
    filters.clone()
}

/// 单次请求的覆盖参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchParams {
    pub page: Option<u64>,
    pub search_info: Option<Map<String, Value>>,
    pub sort_info: Option<Map<String, Value>>,
    pub filter_info: Option<Map<String, Value>>,
}

impl FetchParams {
    pub fn page(page: u64) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }
}

// =========================================================
// 表格属性 (Props)
// =========================================================

/// 分页开关
#[derive(Debug, Clone, PartialEq)]
pub enum PaginationProp {
    Disabled,
    Enabled(PaginationPatch),
}

impl Default for PaginationProp {
    fn default() -> Self {
        PaginationProp::Enabled(PaginationPatch::default())
    }
}

pub struct BasicTableProps {
    pub columns: Vec<BasicColumn>,
    pub api: Option<Rc<dyn TableApi>>,
    /// 没有 api 时直接展示的数据
    pub data: Vec<Row>,
    pub search_info: Map<String, Value>,
    /// 缺省时使用全局配置
    pub fetch_setting: Option<FetchSetting>,
    pub before_fetch: Vec<Rc<dyn BeforeFetch>>,
    pub after_fetch: Vec<Rc<dyn AfterFetch>>,
    pub pagination: PaginationProp,
    pub row_key: Option<String>,
    pub auto_create_key: bool,
    pub show_index_column: bool,
    pub index_column_props: Option<ColumnPatch>,
    pub action_column: Option<BasicColumn>,
    pub is_tree_table: bool,
    /// 挂载时立即请求
    pub immediate: bool,
    pub sort_fn: SortFn,
    pub filter_fn: FilterFn,
}

impl Default for BasicTableProps {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            api: None,
            data: Vec::new(),
            search_info: Map::new(),
            fetch_setting: None,
            before_fetch: Vec::new(),
            after_fetch: Vec::new(),
            pagination: PaginationProp::default(),
            row_key: None,
            auto_create_key: true,
            show_index_column: true,
            index_column_props: None,
            action_column: None,
            is_tree_table: false,
            immediate: true,
            sort_fn: Rc::new(default_sort_fn),
            filter_fn: Rc::new(default_filter_fn),
        }
    }
}

impl BasicTableProps {
    pub fn new(columns: Vec<BasicColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn api(mut self, api: Rc<dyn TableApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn data(mut self, rows: Vec<Row>) -> Self {
        self.data = rows;
        self
    }

    pub fn search_info(mut self, info: Map<String, Value>) -> Self {
        self.search_info = info;
        self
    }

    pub fn fetch_setting(mut self, setting: FetchSetting) -> Self {
        self.fetch_setting = Some(setting);
        self
    }

    pub fn before_fetch(mut self, stage: Rc<dyn BeforeFetch>) -> Self {
        self.before_fetch.push(stage);
        self
    }

    pub fn after_fetch(mut self, stage: Rc<dyn AfterFetch>) -> Self {
        self.after_fetch.push(stage);
        self
    }

    pub fn pagination(mut self, pagination: PaginationProp) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn row_key(mut self, key: impl Into<String>) -> Self {
        self.row_key = Some(key.into());
        self
    }

    pub fn show_index_column(mut self, show: bool) -> Self {
        self.show_index_column = show;
        self
    }

    pub fn action_column(mut self, column: BasicColumn) -> Self {
        self.action_column = Some(column);
        self
    }

    pub fn tree(mut self) -> Self {
        self.is_tree_table = true;
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn sort_fn(mut self, f: impl Fn(&SortState) -> Map<String, Value> + 'static) -> Self {
        self.sort_fn = Rc::new(f);
        self
    }

    pub fn filter_fn(mut self, f: impl Fn(&Map<String, Value>) -> Map<String, Value> + 'static) -> Self {
        self.filter_fn = Rc::new(f);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sort_maps_order() {
        let desc = SortState {
            column_key: "created_at".into(),
            order: Some(SortOrder::Descend),
        };
        let info = default_sort_fn(&desc);
        assert_eq!(info["columnKey"], "created_at");
        assert_eq!(info["order"], "DESC");

        let cleared = SortState {
            column_key: "created_at".into(),
            order: None,
        };
        assert!(default_sort_fn(&cleared).is_empty());
    }
}
