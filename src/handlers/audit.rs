//! 审计记录的 HTTP 处理器
//! 登录历史、操作日志查询与登录事件上报

use crate::{
    error::AppError,
    middleware::{self, AppState},
    models::audit::LoginEventRequest,
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginHistoryQuery {
    pub username: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OperationLogQuery {
    pub operator: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 分页参数解析：缺省取配置默认值，上限由配置裁剪
fn resolve_page(state: &AppState, limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit
        .unwrap_or(state.config.audit.default_page_size)
        .clamp(1, state.config.audit.max_page_size);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// 获取登录历史
pub async fn login_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginHistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = resolve_page(&state, query.limit, query.offset);

    let history = state
        .audit_service
        .login_history(query.username.as_deref(), limit, offset)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": history,
        "total": history.len(),
    })))
}

/// 获取操作日志
pub async fn operation_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OperationLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = resolve_page(&state, query.limit, query.offset);

    let logs = state
        .audit_service
        .operation_logs(query.operator.as_deref(), limit, offset)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": logs,
        "total": logs.len(),
    })))
}

/// 记录登录事件（供主应用调用）
pub async fn login_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<LoginEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    state.audit_service.log_login(event, &ctx).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "登录事件记录成功",
    })))
}
