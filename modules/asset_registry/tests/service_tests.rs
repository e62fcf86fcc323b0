//! Integration tests for the domain service through the native client

use asset_registry::contract::*;
use asset_registry::{Database, NativeClient, RegistryStore, Repository, Service, Tables};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{laptop, laptop_fields, setup};

struct Harness {
    db: Arc<Database>,
    client: NativeClient,
}

async fn harness() -> Harness {
    let db = Arc::new(setup().await);
    let service = Arc::new(Service::new(db.clone()));
    Harness {
        db,
        client: NativeClient::new(service),
    }
}

async fn laptops(client: &NativeClient) -> SubCategory {
    let electronics = client
        .create_category(NewCategory::new("Electronics", "electronics"))
        .await
        .unwrap();
    client
        .create_sub_category(NewSubCategory {
            field_definitions: laptop_fields(),
            ..NewSubCategory::new("Laptops", "laptops", electronics.id)
        })
        .await
        .unwrap()
}

// ===== Catalogue and assets =====

#[tokio::test]
async fn sub_categories_need_valid_definitions_and_a_parent() {
    let h = harness().await;
    let category = h
        .client
        .create_category(NewCategory::new("Furniture", "furniture"))
        .await
        .unwrap();

    let err = h
        .client
        .create_sub_category(NewSubCategory {
            field_definitions: json!([{ "name": "colour", "kind": "rgb" }]),
            ..NewSubCategory::new("Chairs", "chairs", category.id)
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .client
        .create_sub_category(NewSubCategory::new("Chairs", "chairs", uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(h.db.sub_categories().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn assets_are_checked_against_their_sub_category() {
    let h = harness().await;
    let sub = laptops(&h.client).await;

    let asset = h.client.register_asset(laptop(sub.id, "SN-1", 16)).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Active);
    assert_eq!(h.client.get_asset(asset.id).await.unwrap(), asset);

    let missing_serial = NewAsset::new(sub.id, json!({ "ram_gb": 8 }));
    let err = h.client.register_asset(missing_serial).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let wrong_option = NewAsset::new(sub.id, json!({ "serial": "SN-2", "os": "beos" }));
    let err = h.client.register_asset(wrong_option).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .client
        .register_asset(laptop(uuid::Uuid::new_v4(), "SN-3", 8))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .client
        .register_asset(NewAsset {
            purchase_order_id: Some(uuid::Uuid::new_v4()),
            ..laptop(sub.id, "SN-4", 8)
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let listed = h.client.list_assets(sub.id).await.unwrap();
    assert_eq!(listed, vec![asset.clone()]);

    let trail = h.client.audit_trail(EntityKind::Asset, asset.id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, "CREATE");
    assert_eq!(
        trail[0].target(),
        AuditTarget::Known {
            kind: EntityKind::Asset,
            id: Some(asset.id)
        }
    );
}

#[tokio::test]
async fn get_asset_reports_missing_rows() {
    let h = harness().await;
    let err = h.client.get_asset(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ===== Procurement =====

#[tokio::test]
async fn vendor_snapshots_are_copied_once_and_never_synced() {
    let h = harness().await;
    let vendor = h
        .client
        .create_vendor(NewVendor {
            gstin: Some("29ABCDE1234F1Z5".to_string()),
            ..NewVendor::new("Acme Traders")
        })
        .await
        .unwrap();

    let copied = h
        .client
        .create_purchase_order(
            NewPurchaseOrder {
                vendor_id: Some(vendor.id),
                ..NewPurchaseOrder::new("PO-1", Utc::now(), 100.0)
            },
            vec![
                NewOrderLine::new("Laptop", 1, 80.0, 80.0),
                NewOrderLine::new("Mouse", 2, 10.0, 20.0),
            ],
        )
        .await
        .unwrap();
    assert_eq!(copied.order.vendor_name_snap.as_deref(), Some("Acme Traders"));
    assert_eq!(copied.order.gstin.as_deref(), Some("29ABCDE1234F1Z5"));
    let numbers: Vec<_> = copied.lines.iter().map(|l| l.sr_no).collect();
    assert_eq!(numbers, [1, 2]);
    assert!(copied
        .lines
        .iter()
        .all(|l| l.purchase_order_id == copied.order.id && l.received_qty == 0));

    let explicit = h
        .client
        .create_purchase_order(
            NewPurchaseOrder {
                vendor_id: Some(vendor.id),
                vendor_name_snap: Some("Acme (billing)".to_string()),
                ..NewPurchaseOrder::new("PO-2", Utc::now(), 0.0)
            },
            Vec::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        explicit.order.vendor_name_snap.as_deref(),
        Some("Acme (billing)")
    );
    assert_eq!(explicit.order.gstin.as_deref(), Some("29ABCDE1234F1Z5"));

    h.client
        .update_vendor(
            vendor.id,
            VendorPatch {
                name: Some("Acme Global".to_string()),
                gstin: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let reread = h
        .db
        .purchase_orders()
        .find_unique_or_throw(&PurchaseOrderKey::Id(copied.order.id))
        .await
        .unwrap();
    assert_eq!(reread.vendor_name_snap.as_deref(), Some("Acme Traders"));
    assert_eq!(reread.gstin.as_deref(), Some("29ABCDE1234F1Z5"));
}

#[tokio::test]
async fn purchase_orders_are_created_atomically() {
    let h = harness().await;

    let err = h
        .client
        .create_purchase_order(
            NewPurchaseOrder {
                vendor_id: Some(uuid::Uuid::new_v4()),
                ..NewPurchaseOrder::new("PO-1", Utc::now(), 10.0)
            },
            vec![NewOrderLine::new("Cable", 1, 10.0, 10.0)],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .client
        .create_purchase_order(
            NewPurchaseOrder::new("PO-1", Utc::now(), 10.0),
            vec![NewOrderLine::new("Cable", 0, 10.0, 0.0)],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.client
        .create_purchase_order(NewPurchaseOrder::new("PO-1", Utc::now(), 10.0), Vec::new())
        .await
        .unwrap();
    let err = h
        .client
        .create_purchase_order(
            NewPurchaseOrder::new("PO-1", Utc::now(), 10.0),
            vec![NewOrderLine::new("Cable", 1, 10.0, 10.0)],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    assert_eq!(h.db.purchase_orders().count(None).await.unwrap(), 1);
    assert_eq!(h.db.line_items().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn approval_is_recorded_once() {
    let h = harness().await;
    let po = h
        .client
        .create_purchase_order(NewPurchaseOrder::new("PO-9", Utc::now(), 5.0), Vec::new())
        .await
        .unwrap()
        .order;

    let err = h.client.approve_purchase_order(po.id, " ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let approved = h.client.approve_purchase_order(po.id, "ravi").await.unwrap();
    assert_eq!(approved.status, PurchaseOrderStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("ravi"));
    assert!(approved.approved_at.is_some());

    let err = h
        .client
        .approve_purchase_order(po.id, "ravi")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .client
        .approve_purchase_order(uuid::Uuid::new_v4(), "ravi")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let trail = h
        .client
        .audit_trail(EntityKind::PurchaseOrder, po.id)
        .await
        .unwrap();
    let actions: Vec<_> = trail.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(actions, ["APPROVE", "CREATE"]);
}

#[tokio::test]
async fn receiving_never_exceeds_the_ordered_quantity() {
    let h = harness().await;
    let created = h
        .client
        .create_purchase_order(
            NewPurchaseOrder::new("PO-3", Utc::now(), 50.0),
            vec![NewOrderLine::new("Chair", 5, 10.0, 50.0)],
        )
        .await
        .unwrap();
    let line = created.lines[0].id;

    assert_eq!(h.client.receive_line_item(line, 3).await.unwrap().received_qty, 3);
    let err = h.client.receive_line_item(line, 3).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.client.receive_line_item(line, 2).await.unwrap().received_qty, 5);

    let err = h.client.receive_line_item(line, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = h
        .client
        .receive_line_item(uuid::Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn spend_is_grouped_by_vendor() {
    let h = harness().await;
    let acme = h.client.create_vendor(NewVendor::new("Acme")).await.unwrap();
    let beta = h.client.create_vendor(NewVendor::new("Beta")).await.unwrap();

    for (number, vendor, amount) in [
        ("PO-1", Some(acme.id), 100.0),
        ("PO-2", Some(acme.id), 50.0),
        ("PO-3", Some(beta.id), 20.0),
        ("PO-4", None, 5.0),
    ] {
        h.client
            .create_purchase_order(
                NewPurchaseOrder {
                    vendor_id: vendor,
                    ..NewPurchaseOrder::new(number, Utc::now(), amount)
                },
                Vec::new(),
            )
            .await
            .unwrap();
    }

    let spend = h.client.spend_by_vendor().await.unwrap();
    assert_eq!(spend.len(), 3);
    let of = |vendor: Option<uuid::Uuid>| spend.iter().find(|s| s.vendor_id == vendor).unwrap();
    assert_eq!(of(Some(acme.id)).order_count, 2);
    assert_eq!(of(Some(acme.id)).total_amount, 150.0);
    assert_eq!(of(Some(beta.id)).total_amount, 20.0);
    assert_eq!(of(None).total_amount, 5.0);
}

// ===== Maintenance =====

#[tokio::test]
async fn asset_returns_to_service_when_all_records_close() {
    let h = harness().await;
    let sub = laptops(&h.client).await;
    let asset = h.client.register_asset(laptop(sub.id, "SN-9", 8)).await.unwrap();

    let report = |issue: &str| NewMaintenanceRecord {
        asset_id: asset.id,
        issue_type: issue.to_string(),
        description: format!("{issue} needs attention"),
        reported_by: Some("meera".to_string()),
        ..Default::default()
    };
    let battery = h.client.report_maintenance(report("battery")).await.unwrap();
    let screen = h.client.report_maintenance(report("screen")).await.unwrap();
    assert_eq!(battery.status, MaintenanceStatus::Pending);
    assert_eq!(
        h.client.get_asset(asset.id).await.unwrap().status,
        AssetStatus::InMaintenance
    );

    let closed = h
        .client
        .resolve_maintenance(battery.id, Some(1500.0))
        .await
        .unwrap();
    assert_eq!(closed.status, MaintenanceStatus::Completed);
    assert_eq!(closed.cost, 1500.0);
    assert!(closed.resolved_date.is_some());
    assert_eq!(
        h.client.get_asset(asset.id).await.unwrap().status,
        AssetStatus::InMaintenance
    );

    h.client.resolve_maintenance(screen.id, None).await.unwrap();
    assert_eq!(
        h.client.get_asset(asset.id).await.unwrap().status,
        AssetStatus::Active
    );

    let err = h
        .client
        .resolve_maintenance(screen.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .client
        .report_maintenance(NewMaintenanceRecord {
            asset_id: uuid::Uuid::new_v4(),
            ..report("fan")
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let trail = h
        .client
        .audit_trail(EntityKind::MaintenanceRecord, battery.id)
        .await
        .unwrap();
    let actions: Vec<_> = trail.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(actions, ["RESOLVE", "REPORT"]);
}

#[tokio::test]
async fn disposed_assets_cannot_enter_maintenance() {
    let h = harness().await;
    let sub = laptops(&h.client).await;
    let asset = h.client.register_asset(laptop(sub.id, "SN-5", 8)).await.unwrap();
    h.db.assets()
        .update(
            &asset.id,
            AssetPatch {
                status: Some(AssetStatus::Disposed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h
        .client
        .report_maintenance(NewMaintenanceRecord {
            asset_id: asset.id,
            issue_type: "screen".to_string(),
            description: "cracked".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.db.maintenance_records().count(None).await.unwrap(), 0);
}

// ===== Store abstraction =====

/// Register one laptop through any store the service runs on
async fn register_through<S: RegistryStore>(service: &Service<S>) -> Result<Asset, RegistryError> {
    let category = service
        .create_category(NewCategory::new("Electronics", "electronics"))
        .await?;
    let sub = service
        .create_sub_category(NewSubCategory {
            field_definitions: laptop_fields(),
            ..NewSubCategory::new("Laptops", "laptops", category.id)
        })
        .await?;
    service.register_asset(laptop(sub.id, "SN-7", 32)).await
}

#[tokio::test]
async fn service_runs_on_the_store_abstraction() {
    let db = Arc::new(setup().await);
    let service = Service::new(db.clone());

    let asset = register_through(&service).await.unwrap();
    assert_eq!(service.get_asset(asset.id).await.unwrap(), asset);
    assert_eq!(db.audit_logs().count(None).await.unwrap(), 3);
    assert_eq!(service.store().assets().count(None).await.unwrap(), 1);
}
