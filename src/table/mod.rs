//! 数据表格
//!
//! - `props`: 表格属性、数据源与管道接口
//! - `column`: 列组合
//! - `pagination`: 分页状态
//! - `data_source`: 请求编排与行数据

mod column;
mod data_source;
mod pagination;
mod props;


pub use column::{
    Align, BasicColumn, ColumnFlag, ColumnPatch, ColumnSet, Fixed, GetColumnsParams, IfShow,
    INDEX_COLUMN_KEY, INDEX_COLUMN_TITLE, RenderFn, SetColumns,
};
pub use data_source::{DataSource, FetchEvent, assign_row_keys, deep_merge, get_path};
pub use pagination::{Pagination, PaginationInfo, PaginationPatch, page_count};
pub use props::{
    AfterFetch, BasicTableProps, BeforeFetch, FetchParams, FetchSetting, FilterFn, PaginationProp,
    ROW_KEY, Row, SortFn, SortOrder, SortState, TableApi, default_filter_fn, default_sort_fn,
    map_params, map_rows,
};

use serde_json::{Map, Value};
use std::cell::RefCell;

use crate::config::TableSettings;
use crate::error::ConsoleResult;

use data_source::DataSourceParts;

/// 表格实例：列、分页与数据源的组合
pub struct BasicTable {
    columns: RefCell<ColumnSet>,
    data: DataSource,
    immediate: bool,
}

impl BasicTable {
    pub fn new(props: BasicTableProps, settings: &TableSettings) -> Self {
        let columns = ColumnSet::new(props.columns)
            .with_index_column(props.show_index_column, props.index_column_props)
            .with_action_column(props.action_column)
            .tree(props.is_tree_table);

        let pagination = match props.pagination {
            PaginationProp::Disabled => Pagination::new(false, PaginationPatch::default(), settings),
            PaginationProp::Enabled(initial) => Pagination::new(true, initial, settings),
        };

        let data = DataSource::from_parts(DataSourceParts {
            api: props.api,
            data: props.data,
            fetch_setting: props
                .fetch_setting
                .unwrap_or_else(|| settings.fetch_setting.clone()),
            search_info: props.search_info,
            before_fetch: props.before_fetch,
            after_fetch: props.after_fetch,
            sort_fn: props.sort_fn,
            filter_fn: props.filter_fn,
            row_key: props.row_key,
            auto_create_key: props.auto_create_key,
            pagination,
        });

        Self {
            columns: RefCell::new(columns),
            data,
            immediate: props.immediate,
        }
    }

    /// 挂载：`immediate` 时发起首次请求
    pub async fn mount(&self) -> ConsoleResult<()> {
        if self.immediate {
            self.data.fetch(FetchParams::default()).await?;
        }
        Ok(())
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data
    }

    // --- 数据 ---

    pub async fn fetch(&self, opt: FetchParams) -> ConsoleResult<()> {
        self.data.fetch(opt).await
    }

    pub async fn reload(&self, opt: FetchParams) -> ConsoleResult<()> {
        self.data.reload(opt).await
    }

    pub async fn handle_table_change(
        &self,
        filters: Option<Map<String, Value>>,
        sorter: Option<SortState>,
    ) -> ConsoleResult<()> {
        self.data.handle_table_change(filters, sorter).await
    }

    pub fn get_data_source(&self) -> Vec<Row> {
        self.data.get_data_source()
    }

    pub fn get_raw_data_source(&self) -> Value {
        self.data.get_raw_data_source()
    }

    pub fn set_table_data(&self, rows: Vec<Row>) {
        self.data.set_table_data(rows);
    }

    pub fn get_row_key(&self) -> Option<String> {
        self.data.get_row_key()
    }

    pub fn is_loading(&self) -> bool {
        self.data.is_loading()
    }

    pub fn subscribe(&self, listener: impl Fn(&FetchEvent) + 'static) {
        self.data.subscribe(listener);
    }

    // --- 分页 ---

    pub fn get_pagination_info(&self) -> Option<PaginationInfo> {
        self.data.pagination().borrow().get_pagination_info().cloned()
    }

    pub fn set_pagination(&self, patch: PaginationPatch) {
        self.data.pagination().borrow_mut().set_pagination(patch);
    }

    pub fn set_show_pagination(&self, show: bool) {
        self.data.pagination().borrow_mut().set_show_pagination(show);
    }

    pub fn get_show_pagination(&self) -> bool {
        self.data.pagination().borrow().get_show_pagination()
    }

    // --- 列 ---

    pub fn get_view_columns(&self) -> Vec<BasicColumn> {
        let pagination = self.get_pagination_info();
        self.columns.borrow().get_view_columns(pagination.as_ref())
    }

    pub fn get_columns(&self, opt: GetColumnsParams) -> Vec<BasicColumn> {
        let pagination = self.get_pagination_info();
        self.columns.borrow().get_columns(opt, pagination.as_ref())
    }

    pub fn set_columns(&self, columns: SetColumns) {
        self.columns.borrow_mut().set_columns(columns);
    }

    pub fn get_cache_columns(&self) -> Vec<BasicColumn> {
        self.columns.borrow().get_cache_columns().to_vec()
    }

    pub fn set_cache_column_by_field(&self, key: &str, patch: &ColumnPatch) {
        self.columns.borrow_mut().set_cache_column_by_field(key, patch);
    }
}
