//! Common test utilities: in-memory databases and a small catalogue

#![allow(dead_code)]

use asset_registry::contract::*;
use asset_registry::{Config, Database, Repository, Tables};
use chrono::Utc;
use serde_json::json;

/// Fresh, migrated in-memory database
pub async fn setup() -> Database {
    setup_with(Config::in_memory()).await
}

pub async fn setup_with(config: Config) -> Database {
    Database::connect(&config)
        .await
        .expect("in-memory database should open")
}

/// Electronics → Laptops, with a small laptop property schema
pub struct Catalogue {
    pub electronics: Category,
    pub laptops: SubCategory,
}

pub fn laptop_fields() -> serde_json::Value {
    json!([
        { "name": "serial", "label": "Serial number", "kind": "text", "required": true },
        { "name": "ram_gb", "kind": "number" },
        { "name": "os", "kind": "select", "options": ["linux", "windows", "macos"] }
    ])
}

pub async fn seed_catalogue<T: Tables>(db: &T) -> Catalogue {
    let electronics = db
        .categories()
        .create(NewCategory::new("Electronics", "electronics"))
        .await
        .unwrap();
    let laptops = db
        .sub_categories()
        .create(NewSubCategory {
            field_definitions: laptop_fields(),
            ..NewSubCategory::new("Laptops", "laptops", electronics.id)
        })
        .await
        .unwrap();
    Catalogue {
        electronics,
        laptops,
    }
}

pub fn laptop(sub_category_id: uuid::Uuid, serial: &str, ram_gb: i64) -> NewAsset {
    NewAsset::new(
        sub_category_id,
        json!({ "serial": serial, "ram_gb": ram_gb, "os": "linux" }),
    )
}

pub fn order(po_number: &str, total_amount: f64) -> NewPurchaseOrder {
    NewPurchaseOrder::new(po_number, Utc::now(), total_amount)
}

pub fn line(purchase_order_id: uuid::Uuid, sr_no: i32, total_amount: f64) -> NewLineItem {
    NewLineItem {
        purchase_order_id,
        sr_no,
        product_name: format!("Item {sr_no}"),
        quantity: 1,
        unit_price: total_amount,
        total_amount,
        ..Default::default()
    }
}
