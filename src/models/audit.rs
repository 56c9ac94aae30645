//! 审计领域模型
//! 登录历史与操作日志都是仅追加的记录，写入后不再修改

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 登录历史记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoginHistoryRecord {
    pub id: i64,
    /// 软引用：记录可以比对应账号活得更久
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// 1 = 成功，0 = 失败
    pub status: i64,
    pub error_message: Option<String>,
}

/// 登录历史与账号显示名的联查结果
/// 账号已删除时 display_name 为 NULL
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LoginHistoryWithName {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: LoginHistoryRecord,
    pub display_name: Option<String>,
}

/// 登录事件上报（由主应用调用）
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginEventRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default = "default_login_status")]
    pub status: i64,
    pub error_message: Option<String>,
}

fn default_login_status() -> i64 {
    1
}

/// 待写入的登录历史行
#[derive(Debug, Clone)]
pub struct NewLoginRecord {
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status: i64,
    pub error_message: Option<String>,
}

impl NewLoginRecord {
    pub fn is_success(&self) -> bool {
        self.status == 1
    }
}

/// 操作日志的存储行，details 为序列化后的 JSON 文本
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperationLogRow {
    pub id: i64,
    pub operator: String,
    pub operation: String,
    pub target_username: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 对外返回的操作日志条目，details 已还原为结构化 JSON
#[derive(Debug, Clone, Serialize)]
pub struct OperationLogEntry {
    pub id: i64,
    pub operator: String,
    pub operation: String,
    pub target_username: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<OperationLogRow> for OperationLogEntry {
    fn from(row: OperationLogRow) -> Self {
        let details = row
            .details
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or_else(|| serde_json::json!({}));

        Self {
            id: row.id,
            operator: row.operator,
            operation: row.operation,
            target_username: row.target_username,
            details,
            ip_address: row.ip_address,
            timestamp: row.timestamp,
        }
    }
}

/// 待写入的操作日志行
#[derive(Debug, Clone)]
pub struct NewOperationRecord {
    pub operator: String,
    pub operation: String,
    pub target_username: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}
