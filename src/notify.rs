//! 用户提示模块
//!
//! 引擎只决定"提示什么"，由宿主决定"怎么展示"。

use crate::http::ErrorMessageMode;

#[cfg(test)]
use std::cell::RefCell;

/// 用户提示接口
pub trait Notifier {
    /// 关闭所有已打开的提示（登出时调用）
    fn destroy_all(&self) {}
    /// 轻量消息提示
    fn message_error(&self, content: &str);
    /// 模态对话框
    fn dialog_error(&self, title: &str, content: &str);
}

/// 宿主没有提供界面时的默认实现，只写日志
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn message_error(&self, content: &str) {
        tracing::warn!("[Notify] {}", content);
    }

    fn dialog_error(&self, title: &str, content: &str) {
        tracing::error!("[Notify] {}: {}", title, content);
    }
}

/// 按错误提示模式分发
pub fn show_error(notifier: &dyn Notifier, mode: ErrorMessageMode, content: &str) {
    match mode {
        ErrorMessageMode::None => {}
        ErrorMessageMode::Message => notifier.message_error(content),
        ErrorMessageMode::Modal => notifier.dialog_error("Error", content),
    }
}

// =========================================================
// 测试工具: RecordingNotifier
// =========================================================

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub dialogs: RefCell<Vec<(String, String)>>,
    pub destroyed: std::cell::Cell<usize>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn total(&self) -> usize {
        self.messages.borrow().len() + self.dialogs.borrow().len()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn destroy_all(&self) {
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn message_error(&self, content: &str) {
        self.messages.borrow_mut().push(content.to_string());
    }

    fn dialog_error(&self, title: &str, content: &str) {
        self.dialogs
            .borrow_mut()
            .push((title.to_string(), content.to_string()));
    }
}
