//! 账号管理的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::{self, AppState},
    models::account::{AccountPatch, AuthorizationOutcome, BatchRequest, CreateAccountRequest},
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// 获取所有授权账号
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = state.account_service.list_accounts().await?;

    Ok(Json(json!({
        "status": "success",
        "data": accounts,
        "total": accounts.len(),
    })))
}

/// 获取单个账号
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.account_service.get_account(&username).await?;

    Ok(Json(json!({
        "status": "success",
        "data": account,
    })))
}

/// 添加授权账号
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    let (id, username) = state.account_service.add_account(req, &ctx).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "账号添加成功",
            "data": { "id": id, "username": username },
        })),
    ))
}

/// 删除授权账号
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    state.account_service.delete_account(&username, &ctx).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "账号删除成功",
    })))
}

/// 检查单个账号授权状态
///
/// 授权、未授权（禁用/过期）与不存在三种结论都以 200 返回，
/// 由 authorized 与 reason 字段区分
pub async fn check_authorization(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.account_service.check_authorization(&username).await?;

    let body = match outcome {
        AuthorizationOutcome::Authorized(account) => json!({
            "status": "success",
            "authorized": true,
            "data": account,
        }),
        AuthorizationOutcome::Unauthorized(reason) => json!({
            "status": "success",
            "authorized": false,
            "reason": reason.as_str(),
            "message": "账号未授权或已过期",
        }),
        AuthorizationOutcome::NotFound => json!({
            "status": "success",
            "authorized": false,
            "reason": "not_found",
            "message": "账号不存在",
        }),
    };

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<i64>,
}

/// 更新账号状态（启用/禁用）
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req
        .status
        .ok_or_else(|| AppError::Validation("状态参数不能为空".to_string()))?;

    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    state
        .account_service
        .update_status(&username, status, &ctx)
        .await?;

    let message = if status == 1 {
        "账号启用成功"
    } else {
        "账号禁用成功"
    };

    Ok(Json(json!({
        "status": "success",
        "message": message,
    })))
}

/// 更新账号信息（稀疏补丁）
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
    Json(patch): Json<AccountPatch>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    let account = state
        .account_service
        .update_account(&username, patch, &ctx)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "账号更新成功",
        "data": account,
    })))
}

/// 批量操作
pub async fn batch_operation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = middleware::operation_context(&headers, state.config.server.trust_proxy);
    let results = state.account_service.batch_apply(req, &ctx).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "批量操作完成",
        "data": results,
    })))
}
