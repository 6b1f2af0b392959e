//! 列组合
//!
//! 视图列 = 声明列 + 序号列 + 操作列，按 左固定 / 不固定 / 右固定 排序，
//! 操作列始终在最后。

use std::fmt;
use std::rc::Rc;

use super::pagination::PaginationInfo;
use super::props::Row;

pub const INDEX_COLUMN_KEY: &str = "index";
pub const INDEX_COLUMN_TITLE: &str = "No.";
const INDEX_COLUMN_WIDTH: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFlag {
    Index,
    Action,
    Default,
    Checkbox,
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixed {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

pub type RenderFn = Rc<dyn Fn(&Row, usize) -> String>;

/// 列可见性：静态值或按列计算
#[derive(Clone)]
pub enum IfShow {
    Static(bool),
    When(Rc<dyn Fn(&BasicColumn) -> bool>),
}

#[derive(Clone, Default)]
pub struct BasicColumn {
    pub key: String,
    pub title: String,
    pub width: Option<u32>,
    pub align: Option<Align>,
    pub fixed: Option<Fixed>,
    pub hidden: bool,
    pub if_show: Option<IfShow>,
    pub sortable: bool,
    pub filterable: bool,
    pub render: Option<RenderFn>,
    pub flag: Option<ColumnFlag>,
    pub ellipsis: bool,
}

impl BasicColumn {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn fixed(mut self, fixed: Fixed) -> Self {
        self.fixed = Some(fixed);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn if_show(mut self, show: bool) -> Self {
        self.if_show = Some(IfShow::Static(show));
        self
    }

    pub fn show_when(mut self, f: impl Fn(&BasicColumn) -> bool + 'static) -> Self {
        self.if_show = Some(IfShow::When(Rc::new(f)));
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn render(mut self, f: impl Fn(&Row, usize) -> String + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    pub fn flag(mut self, flag: ColumnFlag) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn ellipsis(mut self) -> Self {
        self.ellipsis = true;
        self
    }

    pub fn is_visible(&self) -> bool {
        match &self.if_show {
            None => true,
            Some(IfShow::Static(show)) => *show,
            Some(IfShow::When(f)) => f(self),
        }
    }

    fn is_flag(&self, flag: ColumnFlag) -> bool {
        self.flag == Some(flag)
    }

    /// 单元格文本：有 render 用 render，否则取同名字段
    pub fn render_cell(&self, row: &Row, row_index: usize) -> String {
        match &self.render {
            Some(render) => render(row, row_index),
            None => match row.get(&self.key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }
}

impl fmt::Debug for BasicColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicColumn")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("width", &self.width)
            .field("align", &self.align)
            .field("fixed", &self.fixed)
            .field("hidden", &self.hidden)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("flag", &self.flag)
            .field("ellipsis", &self.ellipsis)
            .finish_non_exhaustive()
    }
}

/// 比较描述字段；闭包只比较有无
impl PartialEq for BasicColumn {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.title == other.title
            && self.width == other.width
            && self.align == other.align
            && self.fixed == other.fixed
            && self.hidden == other.hidden
            && self.sortable == other.sortable
            && self.filterable == other.filterable
            && self.flag == other.flag
            && self.ellipsis == other.ellipsis
            && self.if_show.is_some() == other.if_show.is_some()
            && self.render.is_some() == other.render.is_some()
    }
}

/// 列的部分更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub align: Option<Align>,
    pub fixed: Option<Fixed>,
    pub hidden: Option<bool>,
    pub sortable: Option<bool>,
    pub filterable: Option<bool>,
    pub ellipsis: Option<bool>,
}

impl ColumnPatch {
    pub fn apply(&self, column: &mut BasicColumn) {
        if let Some(title) = &self.title {
            column.title = title.clone();
        }
        if self.width.is_some() {
            column.width = self.width;
        }
        if self.align.is_some() {
            column.align = self.align;
        }
        if self.fixed.is_some() {
            column.fixed = self.fixed;
        }
        if let Some(hidden) = self.hidden {
            column.hidden = hidden;
        }
        if let Some(sortable) = self.sortable {
            column.sortable = sortable;
        }
        if let Some(filterable) = self.filterable {
            column.filterable = filterable;
        }
        if let Some(ellipsis) = self.ellipsis {
            column.ellipsis = ellipsis;
        }
    }
}

/// `set_columns` 的两种形式
#[derive(Debug, Clone, PartialEq)]
pub enum SetColumns {
    /// 整体替换
    Full(Vec<BasicColumn>),
    /// 要显示的缓存列 key 及顺序，其余标记为隐藏
    Keys(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetColumnsParams {
    pub ignore_index: bool,
    pub ignore_action: bool,
    pub sort: bool,
}

// =========================================================
// ColumnSet
// =========================================================

#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<BasicColumn>,
    /// 声明列（不含序号/操作列），列选择器的依据
    cache_columns: Vec<BasicColumn>,
    show_index_column: bool,
    index_column_props: Option<ColumnPatch>,
    action_column: Option<BasicColumn>,
    is_tree_table: bool,
}

impl ColumnSet {
    pub fn new(columns: Vec<BasicColumn>) -> Self {
        let cache_columns = columns.iter().filter(|c| c.flag.is_none()).cloned().collect();
        Self {
            columns,
            cache_columns,
            show_index_column: true,
            ..Default::default()
        }
    }

    pub fn with_index_column(mut self, show: bool, props: Option<ColumnPatch>) -> Self {
        self.show_index_column = show;
        self.index_column_props = props;
        self
    }

    pub fn with_action_column(mut self, action: Option<BasicColumn>) -> Self {
        self.action_column = action;
        self
    }

    pub fn tree(mut self, is_tree_table: bool) -> Self {
        self.is_tree_table = is_tree_table;
        self
    }

    /// 声明列加上合成列，未排序、含隐藏列
    fn composed(&self, pagination: Option<&PaginationInfo>) -> Vec<BasicColumn> {
        let mut columns = self.columns.clone();
        self.handle_index_column(pagination, &mut columns);
        self.handle_action_column(&mut columns);
        columns
    }

    fn handle_index_column(&self, pagination: Option<&PaginationInfo>, columns: &mut Vec<BasicColumn>) {
        if self.is_tree_table || columns.is_empty() {
            return;
        }
        let existing = columns.iter().position(|c| c.is_flag(ColumnFlag::Index));
        if !self.show_index_column {
            if let Some(i) = existing {
                columns.remove(i);
            }
            return;
        }
        if existing.is_some() {
            return;
        }

        let fixed_left = columns.iter().any(|c| c.fixed == Some(Fixed::Left));
        let page = pagination.map(|p| (p.page.max(1), p.page_size));
        let mut index = BasicColumn::new(INDEX_COLUMN_KEY, INDEX_COLUMN_TITLE)
            .width(INDEX_COLUMN_WIDTH)
            .align(Align::Center)
            .render(move |_, row_index| match page {
                None => (row_index + 1).to_string(),
                Some((page, page_size)) => {
                    ((page - 1) * page_size + row_index as u64 + 1).to_string()
                }
            });
        if fixed_left {
            index.fixed = Some(Fixed::Left);
        }
        if let Some(props) = &self.index_column_props {
            props.apply(&mut index);
        }
        index.flag = Some(ColumnFlag::Index);
        columns.insert(0, index);
    }

    fn handle_action_column(&self, columns: &mut Vec<BasicColumn>) {
        let Some(action) = &self.action_column else {
            return;
        };
        if columns.iter().any(|c| c.is_flag(ColumnFlag::Action)) {
            return;
        }
        let mut action = action.clone();
        action.fixed = Some(Fixed::Right);
        action.flag = Some(ColumnFlag::Action);
        columns.push(action);
    }

    /// 渲染用的列
    pub fn get_view_columns(&self, pagination: Option<&PaginationInfo>) -> Vec<BasicColumn> {
        let mut seen_index = false;
        let mut action = None;
        let mut view = Vec::new();

        for column in sort_fixed_column(self.composed(pagination)) {
            if !column.is_visible() {
                continue;
            }
            match column.flag {
                Some(ColumnFlag::Index) if seen_index => continue,
                Some(ColumnFlag::Index) => seen_index = true,
                Some(ColumnFlag::Action) => {
                    if action.is_none() {
                        action = Some(column);
                    }
                    continue;
                }
                _ => {}
            }
            view.push(column);
        }
        // 序号列始终在最前，操作列始终在最后
        if let Some(i) = view.iter().position(|c| c.is_flag(ColumnFlag::Index)) {
            let index = view.remove(i);
            view.insert(0, index);
        }
        view.extend(action);
        view
    }

    pub fn set_columns(&mut self, columns: SetColumns) {
        match columns {
            SetColumns::Full(list) => self.columns = list,
            SetColumns::Keys(keys) => {
                let mut next: Vec<BasicColumn> = self
                    .cache_columns
                    .iter()
                    .map(|c| {
                        let mut c = c.clone();
                        c.hidden = !keys.contains(&c.key);
                        c
                    })
                    .collect();
                let cache_keys: Vec<&String> = self.cache_columns.iter().map(|c| &c.key).collect();
                if !cache_keys.iter().copied().eq(keys.iter()) {
                    // 隐藏列保持原相对顺序排在最后
                    next.sort_by_key(|c| keys.iter().position(|k| *k == c.key).unwrap_or(usize::MAX));
                }
                self.columns = next;
            }
        }
    }

    pub fn get_columns(&self, opt: GetColumnsParams, pagination: Option<&PaginationInfo>) -> Vec<BasicColumn> {
        let mut columns = self.composed(pagination);
        if opt.ignore_index {
            columns.retain(|c| !c.is_flag(ColumnFlag::Index));
        }
        if opt.ignore_action {
            columns.retain(|c| !c.is_flag(ColumnFlag::Action));
        }
        if opt.sort {
            columns = sort_fixed_column(columns);
        }
        columns
    }

    pub fn get_cache_columns(&self) -> &[BasicColumn] {
        &self.cache_columns
    }

    pub fn set_cache_column_by_field(&mut self, key: &str, patch: &ColumnPatch) {
        if let Some(column) = self.cache_columns.iter_mut().find(|c| c.key == key) {
            patch.apply(column);
        }
    }
}

/// 左固定、不固定、右固定；去掉隐藏列
fn sort_fixed_column(columns: Vec<BasicColumn>) -> Vec<BasicColumn> {
    let mut left = Vec::new();
    let mut middle = Vec::new();
    let mut right = Vec::new();
    for column in columns {
        match column.fixed {
            Some(Fixed::Left) => left.push(column),
            Some(Fixed::Right) => right.push(column),
            None => middle.push(column),
        }
    }
    left.into_iter()
        .chain(middle)
        .chain(right)
        .filter(|c| !c.hidden)
        .collect()
}
