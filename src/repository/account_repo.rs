//! Account repository (授权存储的数据访问层)
//!
//! 所有账号状态都只存在于这里。任何调用方不得在操作之间缓存可变副本

use crate::{
    error::AppError,
    models::account::{
        AccountPatch, AccountWithPermission, AuthorizationOutcome, CreateAccountRequest,
        UnauthorizedReason,
    },
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// 授权检查的查询结果行，authorized 在 SQL 中计算
#[derive(sqlx::FromRow)]
struct AuthorizationRow {
    #[sqlx(flatten)]
    row: AccountWithPermission,
    authorized: i64,
}

pub struct AccountRepository {
    db: SqlitePool,
}

impl AccountRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// 列出全部账号，按创建时间倒序，并联查权限名称
    pub async fn list_with_permission(&self) -> Result<Vec<AccountWithPermission>, AppError> {
        let accounts = sqlx::query_as::<_, AccountWithPermission>(
            r#"
            SELECT a.*, p.name AS permission_name
            FROM authorized_accounts a
            LEFT JOIN permission_levels p ON a.permission_level = p.id
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(accounts)
    }

    /// 按用户名查找账号（大小写不敏感，由存储列的 NOCASE 排序规则保证）
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountWithPermission>, AppError> {
        let account = sqlx::query_as::<_, AccountWithPermission>(
            r#"
            SELECT a.*, p.name AS permission_name
            FROM authorized_accounts a
            LEFT JOIN permission_levels p ON a.permission_level = p.id
            WHERE a.username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// 插入新账号，返回生成的 id
    ///
    /// 唯一索引是并发重复写入下的最终裁决：
    /// 预检查漏掉的冲突在这里以 Conflict 形式浮出
    pub async fn insert(
        &self,
        req: &CreateAccountRequest,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO authorized_accounts
                (username, display_name, email, permission_level, status,
                 expires_at, note, created_by, created_at, updated_at, login_count)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8, ?8, 0)
            RETURNING id
            "#,
        )
        .bind(&req.username)
        .bind(req.display_name.as_deref())
        .bind(req.email.as_deref())
        .bind(req.permission_level)
        .bind(req.expires_at)
        .bind(req.note.as_deref())
        .bind(created_by)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| Self::map_unique_violation(e, &req.username))?;

        Ok(id)
    }

    /// 删除账号，返回是否确实删除了一行
    /// 重复删除是安全的：第二次返回 false
    pub async fn delete_by_username(&self, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM authorized_accounts WHERE username = ?1")
            .bind(username)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 更新账号状态并刷新 updated_at，不触碰其他字段
    pub async fn update_status(
        &self,
        username: &str,
        status: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE authorized_accounts
            SET status = ?2, updated_at = ?3
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .bind(status)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 稀疏更新：只合并补丁中出现的字段
    /// 字段缺失保持原值，显式 null 写入 NULL
    pub async fn update_fields(
        &self,
        username: &str,
        patch: &AccountPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<AccountWithPermission>, AppError> {
        let mut sets: Vec<&str> = Vec::new();

        if patch.display_name.is_some() {
            sets.push("display_name = ?");
        }
        if patch.email.is_some() {
            sets.push("email = ?");
        }
        if patch.permission_level.is_some() {
            sets.push("permission_level = ?");
        }
        if patch.status.is_some() {
            sets.push("status = ?");
        }
        if patch.note.is_some() {
            sets.push("note = ?");
        }
        sets.push("updated_at = ?");

        let sql = format!(
            "UPDATE authorized_accounts SET {} WHERE username = ?",
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql);

        if let Some(display_name) = &patch.display_name {
            query = query.bind(display_name.as_deref());
        }
        if let Some(email) = &patch.email {
            query = query.bind(email.as_deref());
        }
        if let Some(permission_level) = patch.permission_level {
            query = query.bind(permission_level);
        }
        if let Some(status) = patch.status {
            query = query.bind(status);
        }
        if let Some(note) = &patch.note {
            query = query.bind(note.as_deref());
        }

        let result = query.bind(now).bind(username).execute(&self.db).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_username(username).await
    }

    /// 授权检查
    ///
    /// 授权谓词直接在查询中求值，过期比较使用存储侧给定的 now，
    /// 到期时刻本身视为已过期（仅当 expires_at > now 时授权）
    pub async fn check_authorization_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationOutcome, AppError> {
        let row = sqlx::query_as::<_, AuthorizationRow>(
            r#"
            SELECT a.*, p.name AS permission_name,
                   CASE
                       WHEN a.status = 1 AND (a.expires_at IS NULL OR a.expires_at > ?2)
                       THEN 1 ELSE 0
                   END AS authorized
            FROM authorized_accounts a
            LEFT JOIN permission_levels p ON a.permission_level = p.id
            WHERE a.username = ?1
            "#,
        )
        .bind(username)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        let outcome = match row {
            None => AuthorizationOutcome::NotFound,
            Some(found) if found.authorized == 1 => {
                AuthorizationOutcome::Authorized(Box::new(found.row.into()))
            }
            Some(found) if found.row.account.status != 1 => {
                AuthorizationOutcome::Unauthorized(UnauthorizedReason::Disabled)
            }
            Some(_) => AuthorizationOutcome::Unauthorized(UnauthorizedReason::Expired),
        };

        Ok(outcome)
    }

    /// 以当前时间执行授权检查
    pub async fn check_authorization(
        &self,
        username: &str,
    ) -> Result<AuthorizationOutcome, AppError> {
        self.check_authorization_at(username, Utc::now()).await
    }

    /// 统计账号数量
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM authorized_accounts")
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    /// 唯一约束冲突映射为 Conflict，其余错误原样上抛
    fn map_unique_violation(e: sqlx::Error, username: &str) -> AppError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("账号已存在: {}", username))
            }
            _ => AppError::Storage(e),
        }
    }
}
