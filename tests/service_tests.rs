//! 服务层测试
//! 校验、冲突处理、操作日志配对与批量操作的隔离语义

use account_service::error::AppError;
use account_service::models::account::{AccountPatch, BatchRequest, CreateAccountRequest};
use account_service::services::{AccountService, AuditService};
use sqlx::SqlitePool;
use std::sync::Arc;

mod common;
use common::{setup_test_db, test_context};

fn build_services(pool: SqlitePool) -> (AccountService, Arc<AuditService>) {
    let audit = Arc::new(AuditService::new(pool.clone()));
    (AccountService::new(pool, audit.clone()), audit)
}

fn create_request(username: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        username: username.to_string(),
        display_name: None,
        email: None,
        permission_level: 1,
        expires_at: None,
        note: None,
        created_by: None,
    }
}

#[tokio::test]
async fn test_add_account_rejects_empty_username() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);

    let err = service
        .add_account(create_request(""), &test_context())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_add_account_conflict_leaves_count_unchanged() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);

    service
        .add_account(create_request("alice"), &test_context())
        .await
        .unwrap();

    let err = service
        .add_account(create_request("ALICE"), &test_context())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let accounts = service.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
}

#[tokio::test]
async fn test_every_mutation_writes_exactly_one_operation_log() {
    let pool = setup_test_db().await;
    let (service, audit) = build_services(pool);
    let ctx = test_context();

    service
        .add_account(create_request("alice"), &ctx)
        .await
        .unwrap();
    service.update_status("alice", 0, &ctx).await.unwrap();
    service
        .update_account(
            "alice",
            AccountPatch {
                note: Some(Some("updated".to_string())),
                ..Default::default()
            },
            &ctx,
        )
        .await
        .unwrap();
    service.delete_account("alice", &ctx).await.unwrap();

    // 每个变更恰好一条日志，倒序返回
    let logs = audit.operation_logs(None, 50, 0).await.unwrap();
    let operations: Vec<&str> = logs.iter().map(|l| l.operation.as_str()).collect();
    assert_eq!(
        operations,
        vec![
            "DELETE_ACCOUNT",
            "UPDATE_ACCOUNT",
            "UPDATE_STATUS",
            "ADD_ACCOUNT"
        ]
    );

    for log in &logs {
        assert_eq!(log.operator, "test");
        assert_eq!(log.target_username.as_deref(), Some("alice"));
        assert_eq!(log.ip_address.as_deref(), Some("127.0.0.1"));
    }
}

#[tokio::test]
async fn test_delete_missing_account_writes_no_log() {
    let pool = setup_test_db().await;
    let (service, audit) = build_services(pool);

    let err = service
        .delete_account("ghost", &test_context())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let logs = audit.operation_logs(None, 50, 0).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn test_update_status_rejects_invalid_value() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);
    let ctx = test_context();

    service
        .add_account(create_request("alice"), &ctx)
        .await
        .unwrap();

    let err = service.update_status("alice", 2, &ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_update_account_rejects_empty_patch() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);
    let ctx = test_context();

    service
        .add_account(create_request("alice"), &ctx)
        .await
        .unwrap();

    let err = service
        .update_account("alice", AccountPatch::default(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_update_account_null_clears_field() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);
    let ctx = test_context();

    let mut req = create_request("alice");
    req.email = Some("alice@example.com".to_string());
    service.add_account(req, &ctx).await.unwrap();

    let patch: AccountPatch = serde_json::from_str(r#"{"email": null}"#).unwrap();
    let updated = service.update_account("alice", patch, &ctx).await.unwrap();
    assert!(updated.account.email.is_none());
}

#[tokio::test]
async fn test_batch_disable_isolates_missing_target() {
    let pool = setup_test_db().await;
    let (service, audit) = build_services(pool);
    let ctx = test_context();

    service.add_account(create_request("a"), &ctx).await.unwrap();
    service.add_account(create_request("b"), &ctx).await.unwrap();

    let results = service
        .batch_apply(
            BatchRequest {
                action: "disable".to_string(),
                usernames: vec!["a".to_string(), "nonexistent".to_string(), "b".to_string()],
            },
            &ctx,
        )
        .await
        .unwrap();

    // 逐项结果：成功、未找到、成功
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, "success");
    assert_eq!(results[1].status, "error");
    assert!(results[1].error.as_deref().unwrap().contains("nonexistent"));
    assert_eq!(results[2].status, "success");

    // a 与 b 确实被禁用
    let a = service.get_account("a").await.unwrap();
    let b = service.get_account("b").await.unwrap();
    assert_eq!(a.account.status, 0);
    assert_eq!(b.account.status, 0);

    // 恰好一条聚合日志，列出全部三个目标
    let logs = audit.operation_logs(None, 50, 0).await.unwrap();
    let batch_logs: Vec<_> = logs
        .iter()
        .filter(|l| l.operation == "BATCH_DISABLE")
        .collect();
    assert_eq!(batch_logs.len(), 1);

    let log = batch_logs[0];
    assert_eq!(log.target_username.as_deref(), Some("a, nonexistent, b"));
    assert_eq!(log.details["action"], "disable");
    assert_eq!(log.details["usernames"].as_array().unwrap().len(), 3);
    assert_eq!(log.details["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_batch_delete_and_enable() {
    let pool = setup_test_db().await;
    let (service, audit) = build_services(pool);
    let ctx = test_context();

    service.add_account(create_request("a"), &ctx).await.unwrap();
    service.add_account(create_request("b"), &ctx).await.unwrap();
    service.update_status("b", 0, &ctx).await.unwrap();

    let results = service
        .batch_apply(
            BatchRequest {
                action: "enable".to_string(),
                usernames: vec!["b".to_string()],
            },
            &ctx,
        )
        .await
        .unwrap();
    assert_eq!(results[0].status, "success");
    assert_eq!(service.get_account("b").await.unwrap().account.status, 1);

    let results = service
        .batch_apply(
            BatchRequest {
                action: "delete".to_string(),
                usernames: vec!["a".to_string(), "b".to_string()],
            },
            &ctx,
        )
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.status == "success"));
    assert!(service.list_accounts().await.unwrap().is_empty());

    let logs = audit.operation_logs(None, 50, 0).await.unwrap();
    assert_eq!(
        logs.iter().filter(|l| l.operation == "BATCH_DELETE").count(),
        1
    );
}

#[tokio::test]
async fn test_batch_rejects_unknown_action() {
    let pool = setup_test_db().await;
    let (service, audit) = build_services(pool);

    let err = service
        .batch_apply(
            BatchRequest {
                action: "promote".to_string(),
                usernames: vec!["a".to_string()],
            },
            &test_context(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let logs = audit.operation_logs(None, 50, 0).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn test_statistics() {
    let pool = setup_test_db().await;
    let (service, _) = build_services(pool);
    let ctx = test_context();

    let mut admin = create_request("admin1");
    admin.permission_level = 3;
    service.add_account(admin, &ctx).await.unwrap();
    service.add_account(create_request("u1"), &ctx).await.unwrap();
    service.add_account(create_request("u2"), &ctx).await.unwrap();
    service.update_status("u2", 0, &ctx).await.unwrap();

    let stats = service.statistics().await.unwrap();
    assert_eq!(stats.total_accounts, 3);
    assert_eq!(stats.active_accounts, 2);
    assert_eq!(stats.disabled_accounts, 1);
    assert_eq!(stats.permission_breakdown.level_1, 2);
    assert_eq!(stats.permission_breakdown.level_3, 1);
    assert_eq!(stats.recent_created, 3);
}
