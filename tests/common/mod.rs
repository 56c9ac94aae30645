//! 测试公共模块
//! 提供测试辅助函数和测试工具

#![allow(dead_code)]

use account_service::{
    config::{AppConfig, AuditConfig, DatabaseConfig, LoggingConfig, ServerConfig},
    middleware::AppState,
    services::{audit_service::OperationContext, AccountService, AuditService},
};
use secrecy::Secret;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
            trust_proxy: true,
        },
        database: DatabaseConfig {
            url: Secret::new("sqlite::memory:".to_string()),
            max_connections: 1,
            acquire_timeout_secs: 5,
            busy_timeout_ms: 1000,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        audit: AuditConfig {
            default_page_size: 50,
            max_page_size: 1000,
        },
    }
}

/// 初始化测试数据库
///
/// 单连接的内存库：所有调用方都看到同一份数据，
/// 迁移在此处执行一次
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// 创建测试应用状态
pub async fn create_test_app_state(pool: SqlitePool) -> Arc<AppState> {
    let audit_service = Arc::new(AuditService::new(pool.clone()));
    let account_service = Arc::new(AccountService::new(pool.clone(), audit_service.clone()));

    Arc::new(AppState {
        config: create_test_config(),
        db: pool,
        account_service,
        audit_service,
    })
}

/// 测试用审计上下文
pub fn test_context() -> OperationContext {
    OperationContext {
        operator: "test".to_string(),
        ip_address: Some("127.0.0.1".to_string()),
        user_agent: Some("test-agent".to_string()),
    }
}
