//! CSV 导出处理器
//!
//! 所有字段带引号、内嵌引号加倍；输出以 BOM 开头，
//! 保证含非 ASCII 文本时在电子表格工具中正常显示

use crate::{
    error::AppError,
    middleware::AppState,
    models::{account::AccountView, audit::LoginHistoryWithName},
};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const BOM: &str = "\u{feff}";

/// 导出账号列表
pub async fn export_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = state.account_service.list_accounts().await?;
    let csv = accounts_to_csv(&accounts);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"accounts.csv\"",
            ),
        ],
        csv,
    ))
}

/// 导出登录历史
pub async fn export_login_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let history = state
        .audit_service
        .login_history(None, state.config.audit.max_page_size, 0)
        .await?;
    let csv = login_history_to_csv(&history);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"login_history.csv\"",
            ),
        ],
        csv,
    ))
}

fn accounts_to_csv(accounts: &[AccountView]) -> String {
    let mut csv = String::from(BOM);
    csv.push_str("用户名,显示名,邮箱,权限级别,状态,创建时间,最后登录,登录次数,备注\n");

    for view in accounts {
        let account = &view.account;
        let row = [
            account.username.clone(),
            account.display_name.clone().unwrap_or_default(),
            account.email.clone().unwrap_or_default(),
            view.permission_name.clone(),
            status_label(account.status).to_string(),
            format_time(account.created_at),
            account
                .last_login_at
                .map(format_time)
                .unwrap_or_else(|| "从未登录".to_string()),
            account.login_count.to_string(),
            account.note.clone().unwrap_or_default(),
        ];
        push_row(&mut csv, &row);
    }

    csv
}

fn login_history_to_csv(history: &[LoginHistoryWithName]) -> String {
    let mut csv = String::from(BOM);
    csv.push_str("用户名,显示名,登录时间,IP地址,浏览器,状态,错误信息\n");

    for entry in history {
        let record = &entry.record;
        let row = [
            record.username.clone(),
            entry.display_name.clone().unwrap_or_default(),
            format_time(record.login_time),
            record.ip_address.clone().unwrap_or_default(),
            record.user_agent.clone().unwrap_or_default(),
            if record.status == 1 { "成功" } else { "失败" }.to_string(),
            record.error_message.clone().unwrap_or_default(),
        ];
        push_row(&mut csv, &row);
    }

    csv
}

fn status_label(status: i64) -> &'static str {
    if status == 1 {
        "激活"
    } else {
        "禁用"
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}

fn push_row(csv: &mut String, fields: &[String]) {
    let quoted: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
    csv.push_str(&quoted.join(","));
    csv.push('\n');
}

/// 单个字段转义：双引号加倍并整体加引号
fn csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Account;

    #[test]
    fn test_csv_field_quotes_everything() {
        assert_eq!(csv_field("alice"), "\"alice\"");
        assert_eq!(csv_field(""), "\"\"");
    }

    #[test]
    fn test_csv_field_doubles_embedded_quotes() {
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_accounts_csv_starts_with_bom() {
        let csv = accounts_to_csv(&[]);
        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains("用户名"));
    }

    #[test]
    fn test_accounts_csv_row_contents() {
        let now = Utc::now();
        let view = AccountView {
            account: Account {
                id: 1,
                username: "alice".to_string(),
                display_name: Some("Alice \"the admin\"".to_string()),
                email: None,
                permission_level: 3,
                status: 1,
                expires_at: None,
                note: None,
                created_by: Some("api".to_string()),
                created_at: now,
                updated_at: now,
                last_login_at: None,
                login_count: 0,
            },
            permission_name: "管理员".to_string(),
        };

        let csv = accounts_to_csv(&[view]);
        assert!(csv.contains("\"alice\""));
        assert!(csv.contains("\"Alice \"\"the admin\"\"\""));
        assert!(csv.contains("\"激活\""));
        assert!(csv.contains("\"从未登录\""));
    }
}
