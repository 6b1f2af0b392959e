//! 应用上下文
//!
//! 会话、权限、HTTP 客户端和路由都挂在 `AppContext` 上，由宿主显式创建并传递，
//! 不使用全局单例。

use cms_console_shared::Resource;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::api::HttpTableApi;
use crate::auth;
use crate::config::ConsoleConfig;
use crate::error::ConsoleResult;
use crate::http::DefHttp;
use crate::notify::{Notifier, TracingNotifier};
use crate::request::Transport;
use crate::router::{Location, Menu, RouteModules, RouterService, ViewRegistry, get_menus, navigate};
use crate::session::{SessionEvent, SessionPhase, SessionStore};
use crate::storage::{AuthCache, KeyValueStore, MemoryStore};

pub struct AppContext {
    pub config: Rc<ConsoleConfig>,
    pub session: Rc<SessionStore>,
    pub http: Rc<DefHttp>,
    pub router: Rc<RefCell<RouterService>>,
    pub registry: Rc<ViewRegistry>,
    pub modules: Rc<RouteModules>,
    pub notifier: Rc<dyn Notifier>,
}

// =========================================================
// Builder
// =========================================================

pub struct AppContextBuilder {
    transport: Rc<dyn Transport>,
    store: Option<Rc<dyn KeyValueStore>>,
    notifier: Option<Rc<dyn Notifier>>,
    registry: Option<ViewRegistry>,
    modules: Option<RouteModules>,
    config: Option<ConsoleConfig>,
}

impl AppContextBuilder {
    pub fn store(mut self, store: Rc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Rc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(mut self, registry: ViewRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn modules(mut self, modules: RouteModules) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 缺省：内存缓存、日志提示、内置视图与模块、环境变量配置
    pub fn build(self) -> ConsoleResult<AppContext> {
        let config = Rc::new(self.config.unwrap_or_else(ConsoleConfig::from_env));
        let store = self
            .store
            .unwrap_or_else(|| Rc::new(MemoryStore::new()) as Rc<dyn KeyValueStore>);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Rc::new(TracingNotifier) as Rc<dyn Notifier>);

        let cache = AuthCache::from_config(store, &config.cache)
            .map_err(|e| e.in_op("context.build"))?;
        let session = Rc::new(SessionStore::new(cache));
        let http = Rc::new(DefHttp::new(
            self.transport,
            session.clone(),
            notifier.clone(),
            config.clone(),
        ));
        let router = Rc::new(RefCell::new(RouterService::with_basic_routes(&config.paths)));

        Ok(AppContext {
            config,
            session,
            http,
            router,
            registry: Rc::new(self.registry.unwrap_or_else(ViewRegistry::builtin)),
            modules: Rc::new(self.modules.unwrap_or_else(RouteModules::builtin)),
            notifier,
        })
    }
}

impl AppContext {
    pub fn builder(transport: Rc<dyn Transport>) -> AppContextBuilder {
        AppContextBuilder {
            transport,
            store: None,
            notifier: None,
            registry: None,
            modules: None,
            config: None,
        }
    }

    /// 启动：订阅登出事件，重置路由并把受保护页面送回登录页
    pub fn init(&self) {
        let router = self.router.clone();
        let login = self.config.paths.login.clone();

        self.session.subscribe(move |event| {
            if *event != SessionEvent::LoggedOut {
                return;
            }
            let Ok(mut router) = router.try_borrow_mut() else {
                tracing::warn!("[Router] Router busy during logout, skip reset");
                return;
            };
            let current = router.current_location().clone();
            let protected = !router.history().is_empty()
                && current.path != login
                && router.current_route().is_some_and(|r| !r.meta.ignore_auth);

            router.reset_routes();
            if protected {
                let mut query = BTreeMap::new();
                query.insert("redirect".to_string(), current.full_path.clone());
                tracing::info!("[Router] Session ended on {}, back to login", current.full_path);
                router.commit(Location::with_query(&login, query), true);
            }
        });
        tracing::info!(
            "[Router] Console initialized, {} static modules, {} views",
            self.modules.modules().len(),
            self.registry.len()
        );
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub async fn navigate(&self, target: &str) -> ConsoleResult<Location> {
        navigate(self, target, false).await
    }

    pub async fn replace(&self, target: &str) -> ConsoleResult<Location> {
        navigate(self, target, true).await
    }

    pub async fn logout(&self) -> ConsoleResult<()> {
        auth::logout(self).await
    }

    pub fn current_location(&self) -> Location {
        self.router.borrow().current_location().clone()
    }

    /// 侧栏菜单：后端菜单在前，其后是已安装路由能匹配的静态菜单
    pub fn get_menus(&self) -> Vec<Menu> {
        let permission = self.session.permission();
        let router = self.router.borrow();
        let mut menus = permission.back_menu_list();
        menus.extend(get_menus(&permission.static_menu_list(), router.get_routes()));
        menus
    }

    /// 某个资源的表格数据源
    pub fn table_api<R: Resource>(&self) -> HttpTableApi {
        HttpTableApi::for_resource::<R>(self.http.clone())
    }
}
