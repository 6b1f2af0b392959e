use serde::{Deserialize, Serialize};

pub mod date;
pub mod models;
pub mod protocol;

pub use date::Timestamp;
pub use protocol::{ApiEnvelope, BasicFetchResult, BasicPageParams, HttpMethod, Resource, ResultType};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const TOKEN_KEY: &str = "TOKEN__";
pub const USER_INFO_KEY: &str = "USER__INFO__";
pub const ROLES_KEY: &str = "ROLES__KEY__";
pub const PERMISSIONS_KEY: &str = "PERMISSIONS__KEY__";
pub const LOCALE_KEY: &str = "LOCALE__";

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";

/// 拥有此权限码的用户通过所有元素级权限检查
pub const WILDCARD_PERMISSION: &str = "*:*:*";

// =========================================================
// 认证与用户 (Auth & Users)
// =========================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoginParams {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoginResult {
    pub token: String,
}

/// 当前登录用户 (`/auth/current`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UserModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RoleModel {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// 角色菜单分配请求 (`PUT /roles/{id}/menus`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RoleMenuAssignment {
    pub menu_ids: Vec<i64>,
}

// =========================================================
// 菜单模型 (Menu Model)
// =========================================================

/// 后端菜单节点类型，线上格式为整数 1/2/3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MenuType {
    Directory,
    Menu,
    Button,
}

impl TryFrom<u8> for MenuType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MenuType::Directory),
            2 => Ok(MenuType::Menu),
            3 => Ok(MenuType::Button),
            other => Err(format!("unknown menu type: {}", other)),
        }
    }
}

impl From<MenuType> for u8 {
    fn from(value: MenuType) -> Self {
        match value {
            MenuType::Directory => 1,
            MenuType::Menu => 2,
            MenuType::Button => 3,
        }
    }
}

/// 后端返回的菜单树节点 (`GET /menus`)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MenuModel {
    pub id: i64,
    #[serde(default)]
    pub parent_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub menu_type: MenuType,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_visible() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn menu_model_parses_numeric_type() {
        let menu: MenuModel = serde_json::from_value(json!({
            "id": 3,
            "parent_id": 1,
            "name": "Add user",
            "type": 3,
            "permission": "system:user:add"
        }))
        .unwrap();

        assert_eq!(menu.menu_type, MenuType::Button);
        assert!(menu.visible);
        assert!(menu.children.is_empty());
    }

    #[test]
    fn menu_model_rejects_unknown_type() {
        let parsed = serde_json::from_value::<MenuModel>(json!({
            "id": 1,
            "name": "x",
            "type": 9
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn user_info_tolerates_missing_permissions() {
        let info: UserInfo = serde_json::from_value(json!({
            "username": "root",
            "email": "root@example.com",
            "roles": ["admin"]
        }))
        .unwrap();
        assert_eq!(info.roles, vec!["admin".to_string()]);
        assert!(info.permissions.is_empty());
    }
}
