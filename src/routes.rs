//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::{handlers, middleware::AppState};

/// 请求体大小上限（1 MiB）
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // 健康检查
        .route("/api/health", get(handlers::health::health_check))
        .route("/api/ready", get(handlers::health::readiness_check))
        // 账号管理
        .route(
            "/api/accounts",
            get(handlers::account::list_accounts).post(handlers::account::create_account),
        )
        .route("/api/accounts/batch", post(handlers::account::batch_operation))
        .route(
            "/api/accounts/{username}",
            get(handlers::account::get_account)
                .put(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route(
            "/api/accounts/{username}/check",
            get(handlers::account::check_authorization),
        )
        .route(
            "/api/accounts/{username}/status",
            patch(handlers::account::update_status),
        )
        // 审计记录
        .route("/api/login-history", get(handlers::audit::login_history))
        .route("/api/operation-logs", get(handlers::audit::operation_logs))
        .route("/api/login-event", post(handlers::audit::login_event))
        // 统计与导出
        .route("/api/statistics", get(handlers::statistics::statistics))
        .route("/api/export/accounts", get(handlers::export::export_accounts))
        .route(
            "/api/export/login-history",
            get(handlers::export::export_login_history),
        )
        // 中间件
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}
