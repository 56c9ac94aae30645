//! 统计信息处理器

use crate::{error::AppError, middleware::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// 账号统计信息
pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.account_service.statistics().await?;

    Ok(Json(json!({
        "status": "success",
        "data": stats,
    })))
}
