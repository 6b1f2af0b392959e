//! 会话状态模块
//!
//! 管理 token、用户信息、角色与权限码。内存状态优先，缺失时回落到认证缓存，
//! 宿主重启后仍可恢复登录态。

use cms_console_shared::{
    PERMISSIONS_KEY, ROLES_KEY, TOKEN_KEY, Timestamp, USER_INFO_KEY, UserInfo, WILDCARD_PERMISSION,
};
use std::cell::RefCell;
use std::rc::Rc;

use crate::permission::PermissionStore;
use crate::storage::AuthCache;

/// 会话事件，供宿主和路由订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    SessionTimeout,
}

/// 导航所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// 没有 token
    Unauthenticated,
    /// 有 token，动态路由尚未安装
    Authenticated,
    /// 路由已按权限构建并安装
    RoutesBuilt,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub token: Option<String>,
    pub user_info: Option<UserInfo>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub session_timeout: bool,
    /// 0 表示本次会话尚未拉取过用户信息
    pub last_update_time: Timestamp,
}

type Listener = Rc<dyn Fn(&SessionEvent)>;

pub struct SessionStore {
    state: RefCell<UserState>,
    permission: PermissionStore,
    cache: AuthCache,
    listeners: RefCell<Vec<Listener>>,
}

impl SessionStore {
    pub fn new(cache: AuthCache) -> Self {
        Self {
            state: RefCell::new(UserState::default()),
            permission: PermissionStore::new(),
            cache,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn permission(&self) -> &PermissionStore {
        &self.permission
    }

    pub fn cache(&self) -> &AuthCache {
        &self.cache
    }

    pub fn snapshot(&self) -> UserState {
        self.state.borrow().clone()
    }

    // =========================================================
    // Getters (内存优先，回落缓存)
    // =========================================================

    pub fn get_token(&self) -> Option<String> {
        let token = self.state.borrow().token.clone();
        token.or_else(|| self.cache.get::<String>(TOKEN_KEY))
    }

    pub fn get_user_info(&self) -> Option<UserInfo> {
        let info = self.state.borrow().user_info.clone();
        info.or_else(|| self.cache.get::<UserInfo>(USER_INFO_KEY))
    }

    pub fn get_role_list(&self) -> Vec<String> {
        let roles = self.state.borrow().roles.clone();
        if !roles.is_empty() {
            return roles;
        }
        self.cache.get::<Vec<String>>(ROLES_KEY).unwrap_or_default()
    }

    pub fn get_permissions(&self) -> Vec<String> {
        let perms = self.state.borrow().permissions.clone();
        if !perms.is_empty() {
            return perms;
        }
        self.cache
            .get::<Vec<String>>(PERMISSIONS_KEY)
            .unwrap_or_default()
    }

    pub fn get_session_timeout(&self) -> bool {
        self.state.borrow().session_timeout
    }

    pub fn get_last_update_time(&self) -> Timestamp {
        self.state.borrow().last_update_time
    }

    // =========================================================
    // Actions
    // =========================================================

    /// None 清除 token（内存与缓存）
    pub fn set_token(&self, token: Option<String>) {
        self.state.borrow_mut().token = token.clone();
        self.persist(TOKEN_KEY, token.as_ref());
    }

    /// 写入用户信息并刷新最后更新时间
    pub fn set_user_info(&self, info: Option<UserInfo>) {
        {
            let mut state = self.state.borrow_mut();
            state.user_info = info.clone();
            state.last_update_time = Timestamp::now();
        }
        self.persist(USER_INFO_KEY, info.as_ref());
    }

    pub fn set_role_list(&self, roles: Vec<String>) {
        self.persist(ROLES_KEY, Some(&roles));
        self.state.borrow_mut().roles = roles;
    }

    pub fn set_permissions(&self, permissions: Vec<String>) {
        self.persist(PERMISSIONS_KEY, Some(&permissions));
        self.state.borrow_mut().permissions = permissions;
    }

    pub fn set_session_timeout(&self, timeout: bool) {
        self.state.borrow_mut().session_timeout = timeout;
        if timeout {
            self.emit(SessionEvent::SessionTimeout);
        }
    }

    /// 只清除内存状态，缓存保持不变
    pub fn reset_state(&self) {
        *self.state.borrow_mut() = UserState::default();
    }

    /// 登出：清除内存与缓存中的凭据，重置权限状态并通知订阅者
    pub fn logout(&self) {
        tracing::info!("[Session] Logout");
        self.reset_state();
        for key in [TOKEN_KEY, USER_INFO_KEY, ROLES_KEY, PERMISSIONS_KEY] {
            self.cache.remove(key);
        }
        self.permission.reset_state();
        self.emit(SessionEvent::LoggedOut);
    }

    pub(crate) fn notify_logged_in(&self) {
        self.emit(SessionEvent::LoggedIn);
    }

    // =========================================================
    // 派生状态
    // =========================================================

    pub fn phase(&self) -> SessionPhase {
        if self.get_token().is_none() {
            SessionPhase::Unauthenticated
        } else if self.permission.is_dynamic_added_route() {
            SessionPhase::RoutesBuilt
        } else {
            SessionPhase::Authenticated
        }
    }

    /// 元素级权限：持有任一所需权限码，或持有通配权限
    pub fn has_permission<S: AsRef<str>>(&self, required: &[S]) -> bool {
        has_permission(&self.get_permissions(), required)
    }

    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn emit(&self, event: SessionEvent) {
        // 监听器可能回调 SessionStore，先拷贝出来再调用
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&event);
        }
    }

    fn persist<T: serde::Serialize>(&self, key: &str, value: Option<&T>) {
        match value {
            Some(v) => {
                if let Err(e) = self.cache.set(key, v, None) {
                    tracing::warn!("[Session] Failed to persist {}: {}", key, e);
                }
            }
            None => {
                self.cache.remove(key);
            }
        }
    }
}

pub fn has_permission<S: AsRef<str>>(held: &[String], required: &[S]) -> bool {
    held.iter().any(|code| {
        code == WILDCARD_PERMISSION || required.iter().any(|r| r.as_ref() == code)
    })
}
