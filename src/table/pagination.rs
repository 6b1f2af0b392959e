//! 分页状态

use crate::config::TableSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationInfo {
    pub page: u64,
    pub page_size: u64,
    pub page_sizes: Vec<u64>,
    pub item_count: u64,
    pub page_count: u64,
    pub show_size_picker: bool,
    pub show_quick_jumper: bool,
}

/// 分页的部分更新
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationPatch {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub item_count: Option<u64>,
}

impl PaginationPatch {
    pub fn page(page: u64) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }
}

/// `ceil(item_count / page_size)`
pub fn page_count(item_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    item_count.div_ceil(page_size)
}

#[derive(Debug, Clone)]
pub struct Pagination {
    enabled: bool,
    show: bool,
    info: PaginationInfo,
}

impl Pagination {
    pub fn new(enabled: bool, initial: PaginationPatch, settings: &TableSettings) -> Self {
        let mut pagination = Self {
            enabled,
            show: true,
            info: PaginationInfo {
                page: 1,
                page_size: settings.default_page_size,
                page_sizes: settings.page_size_options.clone(),
                item_count: 0,
                page_count: 0,
                show_size_picker: true,
                show_quick_jumper: true,
            },
        };
        pagination.set_pagination(initial);
        pagination
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 关闭或隐藏时为 `None`
    pub fn get_pagination_info(&self) -> Option<&PaginationInfo> {
        (self.enabled && self.show).then_some(&self.info)
    }

    /// 当前页与每页条数，关闭分页时仍可读取
    pub fn page_and_size(&self) -> (u64, u64) {
        (self.info.page, self.info.page_size)
    }

    /// 合并更新；`page_count` 随条数与每页条数重新计算
    pub fn set_pagination(&mut self, patch: PaginationPatch) {
        if let Some(page) = patch.page {
            self.info.page = page.max(1);
        }
        if let Some(size) = patch.page_size {
            self.info.page_size = size;
        }
        if let Some(count) = patch.item_count {
            self.info.item_count = count;
        }
        self.info.page_count = page_count(self.info.item_count, self.info.page_size);
    }

    /// 当前页超出总页数时退回最后一页（无数据时不动）
    pub fn clamp_page(&mut self) {
        if self.info.page_count > 0 && self.info.page > self.info.page_count {
            self.info.page = self.info.page_count;
        }
    }

    pub fn set_show_pagination(&mut self, show: bool) {
        self.show = show;
    }

    pub fn get_show_pagination(&self) -> bool {
        self.show
    }
}
