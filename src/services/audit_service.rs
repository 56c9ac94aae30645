//! 审计日志服务
//!
//! 在存储之上补全调用上下文的默认值（IP、User-Agent、事件时间），
//! 然后委托给审计仓库

use crate::{
    error::AppError,
    models::audit::{
        LoginEventRequest, LoginHistoryWithName, NewLoginRecord, NewOperationRecord,
        OperationLogEntry,
    },
    repository::audit_repo::AuditRepository,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

/// 管理操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    AddAccount,
    DeleteAccount,
    UpdateStatus,
    UpdateAccount,
    BatchDelete,
    BatchDisable,
    BatchEnable,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::AddAccount => "ADD_ACCOUNT",
            OperationKind::DeleteAccount => "DELETE_ACCOUNT",
            OperationKind::UpdateStatus => "UPDATE_STATUS",
            OperationKind::UpdateAccount => "UPDATE_ACCOUNT",
            OperationKind::BatchDelete => "BATCH_DELETE",
            OperationKind::BatchDisable => "BATCH_DISABLE",
            OperationKind::BatchEnable => "BATCH_ENABLE",
        }
    }
}

/// 调用上下文：操作者与来源信息
/// 事件未显式携带 IP/User-Agent 时以此处的值兜底
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub operator: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl OperationContext {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            ip_address: None,
            user_agent: None,
        }
    }
}

pub struct AuditService {
    db: SqlitePool,
}

impl AuditService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// 记录一条管理操作
    /// 每个账号变更操作恰好对应一条操作日志，这是硬性契约
    pub async fn log_operation(
        &self,
        ctx: &OperationContext,
        kind: OperationKind,
        target_username: Option<&str>,
        details: serde_json::Value,
    ) -> Result<i64, AppError> {
        let record = NewOperationRecord {
            operator: ctx.operator.clone(),
            operation: kind.as_str().to_string(),
            target_username: target_username.map(|s| s.to_string()),
            details,
            ip_address: ctx.ip_address.clone(),
            timestamp: Utc::now(),
        };

        let repo = AuditRepository::new(self.db.clone());
        let id = repo.insert_operation(&record).await?;

        tracing::debug!(
            operation = record.operation,
            target = record.target_username.as_deref().unwrap_or("-"),
            "Operation logged"
        );

        Ok(id)
    }

    /// 记录登录事件
    /// 成功事件会在存储层原子地更新账号的登录计数与最后登录时间
    pub async fn log_login(
        &self,
        event: LoginEventRequest,
        ctx: &OperationContext,
    ) -> Result<i64, AppError> {
        event.validate()?;

        let record = NewLoginRecord {
            username: event.username,
            login_time: Utc::now(),
            ip_address: event.ip_address.or_else(|| ctx.ip_address.clone()),
            user_agent: event.user_agent.or_else(|| ctx.user_agent.clone()),
            status: event.status,
            error_message: event.error_message,
        };

        let repo = AuditRepository::new(self.db.clone());
        repo.insert_login(&record).await
    }

    /// 查询登录历史
    pub async fn login_history(
        &self,
        username: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoginHistoryWithName>, AppError> {
        let repo = AuditRepository::new(self.db.clone());
        repo.login_history(username, limit, offset).await
    }

    /// 查询操作日志
    pub async fn operation_logs(
        &self,
        operator: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OperationLogEntry>, AppError> {
        let repo = AuditRepository::new(self.db.clone());
        repo.operation_logs(operator, limit, offset).await
    }
}
