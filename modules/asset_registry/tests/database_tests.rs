//! Integration tests for transactions, batches, raw statements, omission and log routing

use asset_registry::contract::*;
use asset_registry::domain::{LogDefinition, LogEmit, LogEvent};
use asset_registry::{
    Batch, BatchOutput, Config, Database, LogLevel, RawStatement, Repository, Tables,
    TransactionOptions,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{seed_catalogue, setup, setup_with};

fn collect(db: &Database, level: LogLevel) -> Arc<Mutex<Vec<LogEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    db.on(level, move |event| sink.lock().push(event.clone()));
    seen
}

// ===== Connect =====

#[tokio::test]
async fn fresh_database_records_every_migration() {
    let db = setup().await;
    let rows = db
        .query_raw(RawStatement::plain(
            "SELECT version FROM seaql_migrations ORDER BY version",
        ))
        .await
        .unwrap();
    let versions: Vec<_> = rows
        .iter()
        .map(|row| row["version"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        versions,
        [
            "m20250301_000001_create_users",
            "m20250301_000002_create_catalogue",
            "m20250301_000003_create_procurement",
            "m20250301_000004_create_assets",
            "m20250301_000005_create_audit_logs",
        ]
    );
    assert_eq!(db.users().count(None).await.unwrap(), 0);
}

// ===== Transactions =====

#[tokio::test]
async fn committed_transaction_keeps_every_write() {
    let db = setup().await;

    let (category, sub) = db
        .transaction(|tx| {
            Box::pin(async move {
                let category = tx
                    .categories()
                    .create(NewCategory::new("Furniture", "furniture"))
                    .await?;
                let sub = tx
                    .sub_categories()
                    .create(NewSubCategory::new("Chairs", "chairs", category.id))
                    .await?;
                Ok((category, sub))
            })
        })
        .await
        .unwrap();

    assert_eq!(sub.category_id, category.id);
    assert_eq!(db.categories().count(None).await.unwrap(), 1);
    assert_eq!(db.sub_categories().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn failing_write_rolls_back_the_whole_transaction() {
    let db = setup().await;
    let catalogue = seed_catalogue(&db).await;
    let before = db.categories().find_many(FindManyArgs::new()).await.unwrap();

    let category_id = catalogue.electronics.id;
    let result: Result<(), RegistryError> = db
        .transaction(move |tx| {
            Box::pin(async move {
                tx.categories()
                    .update(
                        &CategoryKey::Id(category_id),
                        CategoryPatch {
                            description: Some(Some("changed".to_string())),
                            ..Default::default()
                        },
                    )
                    .await?;
                tx.categories()
                    .create(NewCategory::new("Tools", "tools"))
                    .await?;
                // Duplicate name
                tx.categories()
                    .create(NewCategory::new("Tools", "tools-2"))
                    .await?;
                Ok(())
            })
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::ConstraintViolation);
    let after = db.categories().find_many(FindManyArgs::new()).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn body_timeout_rolls_back() {
    let db = setup().await;
    let options = TransactionOptions::new(Duration::from_secs(2), Duration::from_millis(50));

    let result: Result<(), RegistryError> = db
        .transaction_with(options, |tx| {
            Box::pin(async move {
                tx.vendors().create(NewVendor::new("Slow Co")).await?;
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Transaction);
    assert_eq!(db.vendors().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn start_timeout_when_no_connection_frees_up() {
    // The in-memory pool has a single connection, held by the outer transaction
    let db = Arc::new(setup().await);
    let inner_db = db.clone();

    let inner = db
        .transaction(move |_tx| {
            Box::pin(async move {
                let options =
                    TransactionOptions::new(Duration::from_millis(100), Duration::from_secs(1));
                let inner: Result<(), RegistryError> = inner_db
                    .transaction_with(options, |_tx| Box::pin(async move { Ok(()) }))
                    .await;
                Ok(inner)
            })
        })
        .await
        .unwrap();

    assert_eq!(inner.unwrap_err().kind(), ErrorKind::Transaction);
}

#[tokio::test]
async fn defaults_come_from_config() {
    let config = Config {
        transaction_max_wait: Duration::from_secs(1),
        transaction_timeout: Duration::from_secs(3),
        ..Config::in_memory()
    };
    let db = setup_with(config).await;
    let defaults = db.transaction_defaults();
    assert_eq!(defaults.max_wait, Duration::from_secs(1));
    assert_eq!(defaults.timeout, Duration::from_secs(3));
    assert_eq!(defaults.isolation_level, None);
}

// ===== Batches =====

#[tokio::test]
async fn batch_outputs_follow_step_order() {
    let db = setup().await;
    let batch = Batch::new()
        .create::<Category>(NewCategory::new("Tools", "tools"))
        .create::<Vendor>(NewVendor::new("Acme"))
        .update::<Category>(
            CategoryKey::Slug("tools".to_string()),
            CategoryPatch {
                description: Some(Some("Hand tools".to_string())),
                ..Default::default()
            },
        )
        .delete_many::<Vendor>(Some(Filter::eq("name", "Nobody")));
    assert_eq!(batch.len(), 4);

    let outputs = db.batch(batch).await.unwrap();
    assert_eq!(outputs.len(), 4);
    match (&outputs[0], &outputs[1], &outputs[2], &outputs[3]) {
        (
            BatchOutput::Category(created),
            BatchOutput::Vendor(vendor),
            BatchOutput::Category(updated),
            BatchOutput::Count(0),
        ) => {
            assert_eq!(created.id, updated.id);
            assert_eq!(updated.description.as_deref(), Some("Hand tools"));
            assert_eq!(vendor.name, "Acme");
        }
        other => panic!("unexpected outputs {other:?}"),
    }
}

#[tokio::test]
async fn failing_batch_step_undoes_earlier_steps() {
    let db = setup().await;
    let batch = Batch::new()
        .create::<Category>(NewCategory::new("Tools", "tools"))
        .upsert::<Vendor>(
            uuid::Uuid::new_v4(),
            NewVendor::new("Acme"),
            VendorPatch::default(),
        )
        .delete::<Asset>(uuid::Uuid::new_v4());

    let err = db.batch(batch).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(db.categories().count(None).await.unwrap(), 0);
    assert_eq!(db.vendors().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let db = setup().await;
    let batch = Batch::new();
    assert!(batch.is_empty());
    assert!(db.batch(batch).await.unwrap().is_empty());
}

// ===== Raw statements =====

#[tokio::test]
async fn raw_statements_bind_values() {
    let db = setup().await;
    db.categories()
        .create(NewCategory::new("Tools", "tools"))
        .await
        .unwrap();
    db.categories()
        .create(NewCategory::new("Garden", "garden"))
        .await
        .unwrap();

    let changed = db
        .execute_raw(RawStatement::new(
            "UPDATE categories SET description = ? WHERE slug = ?",
            ["Hand tools", "tools"],
        ))
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let rows = db
        .query_raw(RawStatement::new(
            "SELECT name, description FROM categories WHERE slug = ?",
            ["tools"],
        ))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Tools"));
    assert_eq!(rows[0]["description"], json!("Hand tools"));

    let table = "categories";
    let rows = db
        .query_raw_unsafe(
            format!("SELECT slug FROM {table} ORDER BY slug"),
            Vec::new(),
        )
        .await
        .unwrap();
    let slugs: Vec<_> = rows.iter().map(|row| row["slug"].clone()).collect();
    assert_eq!(slugs, [json!("garden"), json!("tools")]);

    let removed = db
        .execute_raw_unsafe(
            format!("DELETE FROM {table} WHERE slug = ?"),
            vec!["garden".into()],
        )
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(db.categories().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn raw_statements_run_inside_transactions() {
    let db = setup().await;
    let result: Result<(), RegistryError> = db
        .transaction(|tx| {
            Box::pin(async move {
                tx.categories()
                    .create(NewCategory::new("Tools", "tools"))
                    .await?;
                tx.execute_raw(RawStatement::plain("UPDATE no_such_table SET x = 1"))
                    .await?;
                Ok(())
            })
        })
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Engine);
    assert_eq!(db.categories().count(None).await.unwrap(), 0);
}

// ===== Omission =====

#[tokio::test]
async fn configured_omissions_shape_results() {
    let config = Config {
        omit: HashMap::from([("user".to_string(), vec!["password".to_string()])]),
        ..Config::in_memory()
    };
    let db = setup_with(config).await;
    let user = db
        .users()
        .create(NewUser {
            username: "asha".to_string(),
            password: "secret-hash".to_string(),
            name: "Asha".to_string(),
            role: None,
        })
        .await
        .unwrap();
    // Typed results always carry every field
    assert_eq!(user.password, "secret-hash");

    let rows = db
        .users()
        .find_many_shaped(FindManyArgs::new(), Selection::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].contains_key("password"));
    assert_eq!(rows[0]["username"], json!("asha"));

    let rows = db
        .users()
        .find_many_shaped(FindManyArgs::new(), Selection::select(["id", "password"]))
        .await
        .unwrap();
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0]["password"], json!("secret-hash"));

    let err = db
        .users()
        .find_many_shaped(FindManyArgs::new(), Selection::omit(["shoe_size"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn bad_omission_config_fails_to_connect() {
    let config = Config {
        omit: HashMap::from([("user".to_string(), vec!["pin".to_string()])]),
        ..Config::in_memory()
    };
    let err = Database::connect(&config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ===== Log routing =====

#[tokio::test]
async fn events_reach_listeners_for_configured_levels() {
    let config = Config {
        log: vec![
            LogDefinition::new(LogLevel::Query, LogEmit::Event),
            LogDefinition::new(LogLevel::Error, LogEmit::Event),
        ],
        ..Config::in_memory()
    };
    let db = setup_with(config).await;
    let queries = collect(&db, LogLevel::Query);
    let errors = collect(&db, LogLevel::Error);
    let warnings = collect(&db, LogLevel::Warn);

    db.categories()
        .create(NewCategory::new("Tools", "tools"))
        .await
        .unwrap();
    assert!(queries
        .lock()
        .iter()
        .any(|event| event.message.contains("INSERT INTO") && !event.failed));

    db.categories()
        .create(NewCategory::new("Tools", "tools"))
        .await
        .unwrap_err();
    assert!(queries.lock().iter().any(|event| event.failed));
    {
        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].target.as_deref(), Some("category"));
        assert!(errors[0].message.starts_with("create failed"));
    }

    // Rollback warnings are not configured, so never delivered
    let _ = db
        .transaction(|_tx| {
            Box::pin(async move { Err::<(), _>(RegistryError::validation("abort")) })
        })
        .await;
    assert!(warnings.lock().is_empty());
}

#[tokio::test]
async fn rollbacks_emit_warnings_when_enabled() {
    let config = Config {
        log: vec![LogDefinition::new(LogLevel::Warn, LogEmit::Event)],
        ..Config::in_memory()
    };
    let db = setup_with(config).await;
    let warnings = collect(&db, LogLevel::Warn);

    let err = db
        .transaction(|_tx| {
            Box::pin(async move { Err::<(), _>(RegistryError::validation("abort")) })
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let warnings = warnings.lock();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("rolled back"));
}
