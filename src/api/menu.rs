//! 菜单树与角色菜单分配

use cms_console_shared::{MenuModel, RoleMenuAssignment};
use serde_json::Value;

use crate::error::ConsoleResult;
use crate::http::DefHttp;

const MENUS: &str = "/menus";

/// 后台菜单树，动态路由的来源
pub async fn get_menu_list(http: &DefHttp) -> ConsoleResult<Vec<MenuModel>> {
    http.get(MENUS, None).await
}

pub async fn create_menu(http: &DefHttp, menu: &MenuModel) -> ConsoleResult<Value> {
    http.post(MENUS, serde_json::to_value(menu)?).await
}

pub async fn update_menu(http: &DefHttp, id: i64, menu: &MenuModel) -> ConsoleResult<Value> {
    http.put(&format!("{}/{}", MENUS, id), serde_json::to_value(menu)?)
        .await
}

pub async fn delete_menu(http: &DefHttp, id: i64) -> ConsoleResult<Value> {
    http.delete(&format!("{}/{}", MENUS, id), None).await
}

fn role_menus_url(role_id: i64) -> String {
    format!("/roles/{}/menus", role_id)
}

/// 角色已分配的菜单 id
pub async fn get_role_menus(http: &DefHttp, role_id: i64) -> ConsoleResult<Vec<i64>> {
    http.get(&role_menus_url(role_id), None).await
}

pub async fn assign_role_menus(
    http: &DefHttp,
    role_id: i64,
    menu_ids: Vec<i64>,
) -> ConsoleResult<Value> {
    let body = serde_json::to_value(RoleMenuAssignment { menu_ids })?;
    http.put(&role_menus_url(role_id), body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::notify::RecordingNotifier;
    use crate::request::{HttpBody, MockTransport};
    use crate::session::SessionStore;
    use crate::storage::{AuthCache, MemoryStore};
    use cms_console_shared::{HttpMethod, MenuType};
    use serde_json::json;
    use std::rc::Rc;

    fn http(transport: Rc<MockTransport>) -> DefHttp {
        DefHttp::new(
            transport,
            Rc::new(SessionStore::new(AuthCache::new(Rc::new(MemoryStore::new())))),
            Rc::new(RecordingNotifier::default()),
            Rc::new(ConsoleConfig::default()),
        )
    }

    #[tokio::test]
    async fn menu_tree_is_typed() {
        let transport = Rc::new(MockTransport::new());
        transport.ok(
            HttpMethod::Get,
            "/api/v1/menus",
            json!([{
                "id": 1, "parent_id": 0, "name": "内容", "type": 1, "path": "/content",
                "children": [{"id": 2, "parent_id": 1, "name": "新闻", "type": 2,
                              "path": "news", "component": "/views/web/news/index.vue"}]
            }]),
        );
        let menus = get_menu_list(&http(transport)).await.unwrap();
        assert_eq!(menus[0].menu_type, MenuType::Directory);
        assert_eq!(menus[0].children[0].component, "/views/web/news/index.vue");
    }

    #[tokio::test]
    async fn assign_role_menus_puts_ids() {
        let transport = Rc::new(MockTransport::new());
        transport.ok(HttpMethod::Put, "/api/v1/roles/3/menus", json!(null));
        assign_role_menus(&http(transport.clone()), 3, vec![1, 2])
            .await
            .unwrap();
        assert_eq!(
            transport.last_request().unwrap().body,
            HttpBody::Json(json!({"menu_ids": [1, 2]}))
        );
    }
}
