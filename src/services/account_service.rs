//! 账号授权服务
//!
//! 授权存储操作的编排层：校验在存储之前完成，
//! 每个变更操作配对一条操作日志

use crate::{
    error::AppError,
    models::account::{
        AccountPatch, AccountStatistics, AccountView, AuthorizationOutcome, BatchAction,
        BatchItemOutcome, BatchRequest, CreateAccountRequest, PermissionBreakdown,
    },
    repository::account_repo::AccountRepository,
    services::audit_service::{AuditService, OperationContext, OperationKind},
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use validator::Validate;

pub struct AccountService {
    db: SqlitePool,
    audit: Arc<AuditService>,
}

impl AccountService {
    pub fn new(db: SqlitePool, audit: Arc<AuditService>) -> Self {
        Self { db, audit }
    }

    fn repo(&self) -> AccountRepository {
        AccountRepository::new(self.db.clone())
    }

    /// 列出全部账号（新建在前），权限名称已解析
    pub async fn list_accounts(&self) -> Result<Vec<AccountView>, AppError> {
        let rows = self.repo().list_with_permission().await?;
        Ok(rows.into_iter().map(AccountView::from).collect())
    }

    /// 按用户名获取账号（大小写不敏感）
    pub async fn get_account(&self, username: &str) -> Result<AccountView, AppError> {
        self.repo()
            .find_by_username(username)
            .await?
            .map(AccountView::from)
            .ok_or_else(|| AppError::NotFound(format!("账号不存在: {}", username)))
    }

    /// 新增授权账号，返回生成的 id 与用户名
    ///
    /// 预检查给出友好的冲突报告；并发下漏网的重复插入
    /// 由存储层唯一索引最终拒绝
    pub async fn add_account(
        &self,
        req: CreateAccountRequest,
        ctx: &OperationContext,
    ) -> Result<(i64, String), AppError> {
        req.validate()?;

        let repo = self.repo();

        if repo.find_by_username(&req.username).await?.is_some() {
            return Err(AppError::Conflict(format!("账号已存在: {}", req.username)));
        }

        let created_by = req
            .created_by
            .clone()
            .unwrap_or_else(|| ctx.operator.clone());

        let id = repo.insert(&req, &created_by, Utc::now()).await?;

        self.audit
            .log_operation(
                ctx,
                OperationKind::AddAccount,
                Some(&req.username),
                json!({
                    "username": req.username,
                    "display_name": req.display_name,
                    "email": req.email,
                    "permission_level": req.permission_level,
                    "expires_at": req.expires_at,
                    "note": req.note,
                    "created_by": created_by,
                }),
            )
            .await?;

        tracing::info!(username = %req.username, id, "Account created");

        Ok((id, req.username))
    }

    /// 删除授权账号
    /// 目标不存在时返回 NotFound，不产生变更也不写操作日志
    pub async fn delete_account(
        &self,
        username: &str,
        ctx: &OperationContext,
    ) -> Result<(), AppError> {
        let deleted = self.repo().delete_by_username(username).await?;

        if !deleted {
            return Err(AppError::NotFound(format!("账号不存在: {}", username)));
        }

        self.audit
            .log_operation(
                ctx,
                OperationKind::DeleteAccount,
                Some(username),
                json!({ "deleted_by": ctx.operator }),
            )
            .await?;

        tracing::info!(username = %username, "Account deleted");

        Ok(())
    }

    /// 更新账号状态（启用/禁用），只触碰 status 与 updated_at
    pub async fn update_status(
        &self,
        username: &str,
        status: i64,
        ctx: &OperationContext,
    ) -> Result<(), AppError> {
        if status != 0 && status != 1 {
            return Err(AppError::Validation(format!(
                "status must be 0 or 1, got {}",
                status
            )));
        }

        let updated = self.repo().update_status(username, status, Utc::now()).await?;

        if !updated {
            return Err(AppError::NotFound(format!("账号不存在: {}", username)));
        }

        self.audit
            .log_operation(
                ctx,
                OperationKind::UpdateStatus,
                Some(username),
                json!({ "new_status": status }),
            )
            .await?;

        Ok(())
    }

    /// 稀疏更新账号字段，返回更新后的账号
    pub async fn update_account(
        &self,
        username: &str,
        patch: AccountPatch,
        ctx: &OperationContext,
    ) -> Result<AccountView, AppError> {
        if patch.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }

        if let Some(status) = patch.status {
            if status != 0 && status != 1 {
                return Err(AppError::Validation(format!(
                    "status must be 0 or 1, got {}",
                    status
                )));
            }
        }

        let updated = self
            .repo()
            .update_fields(username, &patch, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("账号不存在: {}", username)))?;

        self.audit
            .log_operation(
                ctx,
                OperationKind::UpdateAccount,
                Some(username),
                Self::patch_details(&patch),
            )
            .await?;

        Ok(updated.into())
    }

    /// 授权检查
    /// 谓词在存储侧求值；"未授权"与"不存在"在结果中可区分
    pub async fn check_authorization(
        &self,
        username: &str,
    ) -> Result<AuthorizationOutcome, AppError> {
        self.repo().check_authorization(username).await
    }

    /// 批量操作
    ///
    /// 每个目标独立处理，单项失败不中断其余目标；
    /// 整个批次只写一条聚合操作日志，包含完整的目标列表与逐项结果
    pub async fn batch_apply(
        &self,
        req: BatchRequest,
        ctx: &OperationContext,
    ) -> Result<Vec<BatchItemOutcome>, AppError> {
        let action = BatchAction::parse(&req.action)
            .ok_or_else(|| AppError::Validation(format!("不支持的操作类型: {}", req.action)))?;

        if req.usernames.is_empty() {
            return Err(AppError::Validation("用户名列表不能为空".to_string()));
        }

        let repo = self.repo();
        let mut results = Vec::with_capacity(req.usernames.len());

        for username in &req.usernames {
            let applied = match action {
                BatchAction::Delete => repo.delete_by_username(username).await,
                BatchAction::Disable => repo.update_status(username, 0, Utc::now()).await,
                BatchAction::Enable => repo.update_status(username, 1, Utc::now()).await,
            };

            let outcome = match applied {
                Ok(true) => BatchItemOutcome::success(username),
                Ok(false) => BatchItemOutcome::error(username, format!("账号不存在: {}", username)),
                Err(e) => BatchItemOutcome::error(username, e.to_string()),
            };

            results.push(outcome);
        }

        let kind = match action {
            BatchAction::Delete => OperationKind::BatchDelete,
            BatchAction::Disable => OperationKind::BatchDisable,
            BatchAction::Enable => OperationKind::BatchEnable,
        };

        self.audit
            .log_operation(
                ctx,
                kind,
                Some(&req.usernames.join(", ")),
                json!({
                    "action": action.as_str(),
                    "usernames": req.usernames,
                    "results": results,
                }),
            )
            .await?;

        tracing::info!(
            action = action.as_str(),
            total = results.len(),
            failed = results.iter().filter(|r| r.status == "error").count(),
            "Batch operation completed"
        );

        Ok(results)
    }

    /// 账号统计信息
    pub async fn statistics(&self) -> Result<AccountStatistics, AppError> {
        let accounts = self.repo().list_with_permission().await?;
        let week_ago = Utc::now() - Duration::days(7);

        let total = accounts.len() as i64;
        let active = accounts.iter().filter(|a| a.account.status == 1).count() as i64;

        let by_level = |level: i64| {
            accounts
                .iter()
                .filter(|a| a.account.permission_level == level)
                .count() as i64
        };

        Ok(AccountStatistics {
            total_accounts: total,
            active_accounts: active,
            disabled_accounts: total - active,
            permission_breakdown: PermissionBreakdown {
                level_1: by_level(1),
                level_2: by_level(2),
                level_3: by_level(3),
            },
            recent_created: accounts
                .iter()
                .filter(|a| a.account.created_at > week_ago)
                .count() as i64,
        })
    }

    /// 补丁中实际出现的字段构成审计明细
    fn patch_details(patch: &AccountPatch) -> serde_json::Value {
        let mut changes = serde_json::Map::new();

        if let Some(display_name) = &patch.display_name {
            changes.insert("display_name".to_string(), json!(display_name));
        }
        if let Some(email) = &patch.email {
            changes.insert("email".to_string(), json!(email));
        }
        if let Some(permission_level) = patch.permission_level {
            changes.insert("permission_level".to_string(), json!(permission_level));
        }
        if let Some(status) = patch.status {
            changes.insert("status".to_string(), json!(status));
        }
        if let Some(note) = &patch.note {
            changes.insert("note".to_string(), json!(note));
        }

        serde_json::Value::Object(changes)
    }
}
