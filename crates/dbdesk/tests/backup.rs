//! Dump and restore against the in-memory client.

mod common;

use common::{Call, MemoryClient, user_rows, users_columns, users_ctx};
use dbdesk::backup::{dump, restore};
use dbdesk::{AdminError, BackupOptions, ConnectionContext, Dialect, Row};
use serde_json::json;

fn tricky_row() -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(3));
    row.insert("name".into(), json!("O'Brien;\nDROP"));
    row.insert("status".into(), json!(null));
    row
}

#[tokio::test]
async fn dump_writes_structure_then_data() {
    let ctx = users_ctx(2);
    let sql = dump(&ctx, &[], BackupOptions::default()).await.unwrap();

    assert!(sql.starts_with("-- dbdesk SQL dump\n-- Database: shop\n-- Generated: "));
    assert!(sql.contains("SET FOREIGN_KEY_CHECKS = 0;\n"));
    assert!(sql.contains(
        "-- Table: users\nDROP TABLE IF EXISTS `users`;\nCREATE TABLE `users` (id int);\n"
    ));
    assert!(sql.contains(
        "INSERT INTO `users` (`id`, `name`, `status`) VALUES\n(1, 'user1', 'cancelled'),\n(2, 'user2', 'cancelled');\n"
    ));
    assert!(sql.trim_end().ends_with("SET FOREIGN_KEY_CHECKS = 1;"));
}

#[tokio::test]
async fn dump_data_only_skips_ddl() {
    let ctx = users_ctx(1);
    let options = BackupOptions {
        include_structure: false,
        include_data: true,
    };
    let sql = dump(&ctx, &["users".to_string()], options).await.unwrap();

    assert!(!sql.contains("CREATE TABLE"));
    assert!(sql.contains("INSERT INTO `users`"));
    assert!(!ctx.client.calls().iter().any(|c| matches!(c, Call::ShowCreate(_))));
}

#[tokio::test]
async fn dump_rejects_unknown_tables() {
    let ctx = users_ctx(1);
    let err = dump(&ctx, &["orders".to_string()], BackupOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::UnknownTable(ref t) if t == "orders"));
}

#[tokio::test]
async fn restore_replays_what_dump_wrote() {
    let source = users_ctx(0);
    source.client.set_rows("users", vec![tricky_row()]);
    let sql = dump(&source, &[], BackupOptions::default()).await.unwrap();

    let target = ConnectionContext::new(
        MemoryClient::new(Dialect::MySql).with_table("users", users_columns()),
        "copy",
    );
    let report = restore(&target, &sql).await.unwrap();

    assert_eq!(report.statements, 5);
    let committed = target.client.committed();
    assert_eq!(committed[0], "SET FOREIGN_KEY_CHECKS = 0");
    assert_eq!(committed[1], "DROP TABLE IF EXISTS `users`");
    assert_eq!(
        committed[3],
        "INSERT INTO `users` (`id`, `name`, `status`) VALUES\n(3, 'O\\'Brien;\nDROP', NULL)"
    );
    assert_eq!(committed[4], "SET FOREIGN_KEY_CHECKS = 1");
}

#[tokio::test]
async fn failed_restore_keeps_nothing() {
    let source = users_ctx(2);
    let sql = dump(&source, &[], BackupOptions::default()).await.unwrap();

    let client = MemoryClient::new(Dialect::MySql)
        .with_table("users", users_columns())
        .with_rows("users", user_rows(1))
        .failing_replay_at(2);
    let target = ConnectionContext::new(client, "copy");

    let err = restore(&target, &sql).await.unwrap_err();
    assert!(matches!(err, AdminError::DatabaseExecution { .. }));
    assert!(target.client.committed().is_empty());
}

#[tokio::test]
async fn empty_backup_is_rejected() {
    let ctx = users_ctx(0);
    let err = restore(&ctx, "-- nothing here\n\n").await.unwrap_err();

    assert!(matches!(err, AdminError::Validation(_)));
    assert!(ctx.client.calls().is_empty());
}

#[tokio::test]
async fn postgres_dump_has_no_mysql_session_settings() {
    let client = MemoryClient::new(Dialect::Postgres)
        .with_table("users", users_columns())
        .with_rows("users", user_rows(1));
    let ctx = ConnectionContext::new(client, "shop");
    let sql = dump(&ctx, &[], BackupOptions::default()).await.unwrap();

    assert!(!sql.contains("FOREIGN_KEY_CHECKS"));
    assert!(sql.contains(r#"INSERT INTO "users" ("id", "name", "status") VALUES"#));
}
