//! 账号领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::permission;

/// 授权账号
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub permission_level: i64,
    /// 1 = 激活，0 = 禁用
    pub status: i64,
    /// NULL 表示永不过期
    pub expires_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub login_count: i64,
}

/// 账号行与权限名称的联查结果
/// permission_name 来自 LEFT JOIN，目录中不存在的级别为 NULL
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountWithPermission {
    #[sqlx(flatten)]
    pub account: Account,
    pub permission_name: Option<String>,
}

/// 对外返回的账号视图，权限名称总是已解析的
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub account: Account,
    pub permission_name: String,
}

impl From<AccountWithPermission> for AccountView {
    fn from(row: AccountWithPermission) -> Self {
        let permission_name = row
            .permission_name
            .unwrap_or_else(|| permission::name_for(row.account.permission_level));
        Self { account: row.account, permission_name }
    }
}

/// 创建账号请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default = "default_permission_level")]
    pub permission_level: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_by: Option<String>,
}

fn default_permission_level() -> i64 {
    1
}

/// 稀疏更新补丁
///
/// 可空文本字段使用双层 Option 区分三种输入：
/// 字段缺失（保持不变）、显式 null（清空）、给定值（覆盖）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub permission_level: Option<i64>,
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
}

impl AccountPatch {
    /// 补丁中是否包含任何字段
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.permission_level.is_none()
            && self.status.is_none()
            && self.note.is_none()
    }
}

/// 区分字段缺失与显式 null：缺失由 serde default 给出外层 None，
/// null 经由该函数变为 Some(None)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// 授权检查的结果
///
/// "账号存在但被禁用/已过期" 与 "账号不存在" 都是未授权，
/// 但对可观测性而言是不同的结论，必须可区分
#[derive(Debug)]
pub enum AuthorizationOutcome {
    Authorized(Box<AccountView>),
    Unauthorized(UnauthorizedReason),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    Disabled,
    Expired,
}

impl UnauthorizedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthorizedReason::Disabled => "disabled",
            UnauthorizedReason::Expired => "expired",
        }
    }
}

/// 批量操作请求
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub action: String,
    pub usernames: Vec<String>,
}

/// 批量操作动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Delete,
    Disable,
    Enable,
}

impl BatchAction {
    /// 解析请求中的动作字符串，未知动作返回 None
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "delete" => Some(BatchAction::Delete),
            "disable" => Some(BatchAction::Disable),
            "enable" => Some(BatchAction::Enable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchAction::Delete => "delete",
            BatchAction::Disable => "disable",
            BatchAction::Enable => "enable",
        }
    }
}

/// 批量操作的单项结果
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    pub username: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemOutcome {
    pub fn success(username: &str) -> Self {
        Self {
            username: username.to_string(),
            status: "success".to_string(),
            result: Some(true),
            error: None,
        }
    }

    pub fn error(username: &str, message: impl Into<String>) -> Self {
        Self {
            username: username.to_string(),
            status: "error".to_string(),
            result: None,
            error: Some(message.into()),
        }
    }
}

/// 账号统计信息
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatistics {
    pub total_accounts: i64,
    pub active_accounts: i64,
    pub disabled_accounts: i64,
    pub permission_breakdown: PermissionBreakdown,
    pub recent_created: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionBreakdown {
    pub level_1: i64,
    pub level_2: i64,
    pub level_3: i64,
}
