//! Audit repository (审计数据访问)
//!
//! 登录历史与操作日志仅追加，写入后永不更新或删除

use crate::{
    error::AppError,
    models::audit::{
        LoginHistoryWithName, NewLoginRecord, NewOperationRecord, OperationLogEntry,
        OperationLogRow,
    },
};
use sqlx::SqlitePool;

pub struct AuditRepository {
    db: SqlitePool,
}

impl AuditRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// 追加登录历史
    ///
    /// 成功事件在同一事务内原子地递增账号的 login_count 并写入
    /// last_login_at；计数器递增由存储层的 login_count + 1 保证。
    /// 没有匹配账号时历史行照常写入（账号与历史的生命周期彼此独立）
    pub async fn insert_login(&self, record: &NewLoginRecord) -> Result<i64, AppError> {
        let mut tx = self.db.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO login_history
                (username, login_time, ip_address, user_agent, status, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
        )
        .bind(&record.username)
        .bind(record.login_time)
        .bind(record.ip_address.as_deref())
        .bind(record.user_agent.as_deref())
        .bind(record.status)
        .bind(record.error_message.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        if record.is_success() {
            sqlx::query(
                r#"
                UPDATE authorized_accounts
                SET login_count = login_count + 1,
                    last_login_at = ?2
                WHERE username = ?1
                "#,
            )
            .bind(&record.username)
            .bind(record.login_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(id)
    }

    /// 追加操作日志，details 序列化为 JSON 文本存储
    pub async fn insert_operation(&self, record: &NewOperationRecord) -> Result<i64, AppError> {
        let details = serde_json::to_string(&record.details)
            .map_err(|e| AppError::Internal(format!("failed to serialize details: {}", e)))?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO operation_logs
                (operator, operation, target_username, details, ip_address, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
        )
        .bind(&record.operator)
        .bind(&record.operation)
        .bind(record.target_username.as_deref())
        .bind(&details)
        .bind(record.ip_address.as_deref())
        .bind(record.timestamp)
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    /// 查询登录历史，按登录时间倒序分页
    /// 账号已删除的记录 display_name 为 NULL，依旧可读
    pub async fn login_history(
        &self,
        username: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoginHistoryWithName>, AppError> {
        let mut sql = String::from(
            r#"
            SELECT lh.*, aa.display_name
            FROM login_history lh
            LEFT JOIN authorized_accounts aa ON lh.username = aa.username
            "#,
        );

        if username.is_some() {
            sql.push_str(" WHERE lh.username = ?");
        }

        sql.push_str(" ORDER BY lh.login_time DESC, lh.id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, LoginHistoryWithName>(&sql);

        if let Some(username) = username {
            query = query.bind(username);
        }

        let records = query.bind(limit).bind(offset).fetch_all(&self.db).await?;

        Ok(records)
    }

    /// 查询操作日志，按时间倒序分页
    /// details 在返回前还原为结构化 JSON
    pub async fn operation_logs(
        &self,
        operator: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OperationLogEntry>, AppError> {
        let mut sql = String::from("SELECT * FROM operation_logs");

        if operator.is_some() {
            sql.push_str(" WHERE operator = ?");
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, OperationLogRow>(&sql);

        if let Some(operator) = operator {
            query = query.bind(operator);
        }

        let rows = query.bind(limit).bind(offset).fetch_all(&self.db).await?;

        Ok(rows.into_iter().map(OperationLogEntry::from).collect())
    }
}
