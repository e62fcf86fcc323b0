//! Contract models for the asset registry
//!
//! Plain records for the nine entities plus their create/update inputs and
//! unique keys. Opaque document columns (`properties`, `field_definitions`)
//! are exposed as `serde_json::Value`; they are only text in storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::RegistryError;

/// Entity-level metadata shared by every record type
pub trait Record: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Unique lookup key (`findUnique` argument)
    type Key: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;
    /// Payload accepted by `create`
    type Create: Send + 'static;
    /// Payload accepted by `update`; every field optional
    type Update: Default + Send + 'static;

    const KIND: EntityKind;

    fn id(&self) -> Uuid;
}

/// The nine schema entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Category,
    SubCategory,
    Asset,
    MaintenanceRecord,
    Vendor,
    PurchaseOrder,
    LineItem,
    AuditLog,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::User,
        EntityKind::Category,
        EntityKind::SubCategory,
        EntityKind::Asset,
        EntityKind::MaintenanceRecord,
        EntityKind::Vendor,
        EntityKind::PurchaseOrder,
        EntityKind::LineItem,
        EntityKind::AuditLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Category => "category",
            Self::SubCategory => "sub_category",
            Self::Asset => "asset",
            Self::MaintenanceRecord => "maintenance_record",
            Self::Vendor => "vendor",
            Self::PurchaseOrder => "purchase_order",
            Self::LineItem => "line_item",
            Self::AuditLog => "audit_log",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = RegistryError;

    /// Accepts the snake_case name as well as the PascalCase model name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().replace('_', "") == normalized)
            .ok_or_else(|| RegistryError::validation(format!("unknown entity type: {s}")))
    }
}

/// Generates `as_str`, `Display`, `FromStr` and `Default` for text-backed status enums
macro_rules! text_enum {
    ($name:ident, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RegistryError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(RegistryError::validation(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

text_enum!(Role, default = User, { User => "USER", Admin => "ADMIN" });

/// Lifecycle status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Active,
    InMaintenance,
    Retired,
    Disposed,
}

text_enum!(AssetStatus, default = Active, {
    Active => "ACTIVE",
    InMaintenance => "IN_MAINTENANCE",
    Retired => "RETIRED",
    Disposed => "DISPOSED",
});

/// Status of a maintenance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    Pending,
    InProgress,
    Completed,
}

text_enum!(MaintenanceStatus, default = Pending, {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
});

impl MaintenanceStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Status of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Received,
    Cancelled,
}

text_enum!(PurchaseOrderStatus, default = Draft, {
    Draft => "DRAFT",
    PendingApproval => "PENDING_APPROVAL",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Received => "RECEIVED",
    Cancelled => "CANCELLED",
});

// ===== User =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(Uuid),
    Username(String),
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Username(username) => write!(f, "username={username}"),
        }
    }
}

impl Record for User {
    type Key = UserKey;
    type Create = NewUser;
    type Update = UserPatch;
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== Category =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKey {
    Id(Uuid),
    Name(String),
    Slug(String),
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name(name) => write!(f, "name={name}"),
            Self::Slug(slug) => write!(f, "slug={slug}"),
        }
    }
}

impl Record for Category {
    type Key = CategoryKey;
    type Create = NewCategory;
    type Update = CategoryPatch;
    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== SubCategory =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    /// Schema of the `properties` document carried by assets of this sub-category
    pub field_definitions: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSubCategory {
    pub name: String,
    pub slug: String,
    pub category_id: Uuid,
    pub field_definitions: serde_json::Value,
}

impl NewSubCategory {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, category_id: Uuid) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            category_id,
            field_definitions: serde_json::Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubCategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<Uuid>,
    pub field_definitions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubCategoryKey {
    Id(Uuid),
    /// Slugs are unique within their category only
    CategorySlug { category_id: Uuid, slug: String },
}

impl fmt::Display for SubCategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::CategorySlug { category_id, slug } => {
                write!(f, "category_id={category_id},slug={slug}")
            }
        }
    }
}

impl Record for SubCategory {
    type Key = SubCategoryKey;
    type Create = NewSubCategory;
    type Update = SubCategoryPatch;
    const KIND: EntityKind = EntityKind::SubCategory;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== Asset =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: Uuid,
    pub sub_category_id: Uuid,
    pub properties: serde_json::Value,
    pub status: AssetStatus,
    pub purchase_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAsset {
    pub sub_category_id: Uuid,
    pub properties: serde_json::Value,
    pub status: Option<AssetStatus>,
    pub purchase_order_id: Option<Uuid>,
}

impl NewAsset {
    pub fn new(sub_category_id: Uuid, properties: serde_json::Value) -> Self {
        Self {
            sub_category_id,
            properties,
            status: None,
            purchase_order_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub sub_category_id: Option<Uuid>,
    pub properties: Option<serde_json::Value>,
    pub status: Option<AssetStatus>,
    pub purchase_order_id: Option<Option<Uuid>>,
}

impl Record for Asset {
    type Key = Uuid;
    type Create = NewAsset;
    type Update = AssetPatch;
    const KIND: EntityKind = EntityKind::Asset;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== MaintenanceRecord =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub issue_type: String,
    pub description: String,
    pub cost: f64,
    pub status: MaintenanceStatus,
    pub reported_by: Option<String>,
    pub resolved_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewMaintenanceRecord {
    pub asset_id: Uuid,
    pub issue_type: String,
    pub description: String,
    pub cost: Option<f64>,
    pub status: Option<MaintenanceStatus>,
    pub reported_by: Option<String>,
    pub resolved_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceRecordPatch {
    pub issue_type: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub status: Option<MaintenanceStatus>,
    pub reported_by: Option<Option<String>>,
    pub resolved_date: Option<Option<DateTime<Utc>>>,
}

impl Record for MaintenanceRecord {
    type Key = Uuid;
    type Create = NewMaintenanceRecord;
    type Update = MaintenanceRecordPatch;
    const KIND: EntityKind = EntityKind::MaintenanceRecord;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== Vendor =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub gstin: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    pub name: String,
    pub gstin: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewVendor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VendorPatch {
    pub name: Option<String>,
    pub gstin: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

impl Record for Vendor {
    type Key = Uuid;
    type Create = NewVendor;
    type Update = VendorPatch;
    const KIND: EntityKind = EntityKind::Vendor;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== PurchaseOrder =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub po_number: String,
    pub date: DateTime<Utc>,
    pub vendor_id: Option<Uuid>,
    /// Vendor name at the time the order was raised; never synced afterwards
    pub vendor_name_snap: Option<String>,
    /// Vendor GSTIN at the time the order was raised; never synced afterwards
    pub gstin: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub total_amount: f64,
    pub currency: String,
    pub status: PurchaseOrderStatus,
    pub requested_by: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub date: DateTime<Utc>,
    pub vendor_id: Option<Uuid>,
    pub vendor_name_snap: Option<String>,
    pub gstin: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub total_amount: f64,
    /// Defaults to `INR`
    pub currency: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
    pub requested_by: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub properties: Option<serde_json::Value>,
}

impl NewPurchaseOrder {
    pub fn new(po_number: impl Into<String>, date: DateTime<Utc>, total_amount: f64) -> Self {
        Self {
            po_number: po_number.into(),
            date,
            total_amount,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderPatch {
    pub po_number: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub vendor_id: Option<Option<Uuid>>,
    pub vendor_name_snap: Option<Option<String>>,
    pub gstin: Option<Option<String>>,
    pub billing_address: Option<Option<String>>,
    pub shipping_address: Option<Option<String>>,
    pub total_amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
    pub requested_by: Option<Option<String>>,
    pub requested_at: Option<Option<DateTime<Utc>>>,
    pub approved_by: Option<Option<String>>,
    pub approved_at: Option<Option<DateTime<Utc>>>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOrderKey {
    Id(Uuid),
    PoNumber(String),
}

impl fmt::Display for PurchaseOrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::PoNumber(number) => write!(f, "po_number={number}"),
        }
    }
}

impl Record for PurchaseOrder {
    type Key = PurchaseOrderKey;
    type Create = NewPurchaseOrder;
    type Update = PurchaseOrderPatch;
    const KIND: EntityKind = EntityKind::PurchaseOrder;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== LineItem =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub sr_no: i32,
    pub product_name: String,
    pub quantity: i32,
    pub uom: Option<String>,
    pub unit_price: f64,
    pub discount: f64,
    pub gst: f64,
    pub total_amount: f64,
    pub received_qty: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NewLineItem {
    pub purchase_order_id: Uuid,
    pub sr_no: i32,
    pub product_name: String,
    pub quantity: i32,
    pub uom: Option<String>,
    pub unit_price: f64,
    pub discount: Option<f64>,
    pub gst: Option<f64>,
    pub total_amount: f64,
    pub received_qty: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct LineItemPatch {
    pub sr_no: Option<i32>,
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub uom: Option<Option<String>>,
    pub unit_price: Option<f64>,
    pub discount: Option<f64>,
    pub gst: Option<f64>,
    pub total_amount: Option<f64>,
    pub received_qty: Option<i32>,
}

impl Record for LineItem {
    type Key = Uuid;
    type Create = NewLineItem;
    type Update = LineItemPatch;
    const KIND: EntityKind = EntityKind::LineItem;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== AuditLog =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAuditLog {
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<String>,
}

impl NewAuditLog {
    /// Audit entry pointing at a known entity
    pub fn for_entity(action: impl Into<String>, kind: EntityKind, id: Uuid) -> Self {
        Self {
            action: action.into(),
            entity_type: kind.as_str().to_string(),
            entity_id: Some(id.to_string()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditLogPatch {
    pub action: Option<String>,
    pub details: Option<Option<String>>,
}

/// Typed view over the loose `(entity_type, entity_id)` pair of an audit entry.
///
/// The pair is a reference by value only; the target row may no longer exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditTarget {
    Known { kind: EntityKind, id: Option<Uuid> },
    Other {
        entity_type: String,
        entity_id: Option<String>,
    },
}

impl AuditLog {
    pub fn target(&self) -> AuditTarget {
        let kind = self.entity_type.parse::<EntityKind>().ok();
        let id = match &self.entity_id {
            None => Some(None),
            Some(raw) => Uuid::parse_str(raw).ok().map(Some),
        };
        match (kind, id) {
            (Some(kind), Some(id)) => AuditTarget::Known { kind, id },
            _ => AuditTarget::Other {
                entity_type: self.entity_type.clone(),
                entity_id: self.entity_id.clone(),
            },
        }
    }
}

impl Record for AuditLog {
    type Key = Uuid;
    type Create = NewAuditLog;
    type Update = AuditLogPatch;
    const KIND: EntityKind = EntityKind::AuditLog;

    fn id(&self) -> Uuid {
        self.id
    }
}

// ===== Service payloads =====

/// Line of a purchase order raised together with the order
#[derive(Debug, Clone, Default)]
pub struct NewOrderLine {
    /// Assigned 1..n in input order when absent
    pub sr_no: Option<i32>,
    pub product_name: String,
    pub quantity: i32,
    pub uom: Option<String>,
    pub unit_price: f64,
    pub discount: Option<f64>,
    pub gst: Option<f64>,
    pub total_amount: f64,
}

impl NewOrderLine {
    pub fn new(
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: f64,
        total_amount: f64,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_amount,
            ..Default::default()
        }
    }
}

/// A purchase order with its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrderWithLines {
    pub order: PurchaseOrder,
    pub lines: Vec<LineItem>,
}

/// Purchase-order spend grouped by vendor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorSpend {
    /// `None` collects orders raised without a vendor
    pub vendor_id: Option<Uuid>,
    pub order_count: u64,
    pub total_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parses_both_spellings() {
        assert_eq!(
            "purchase_order".parse::<EntityKind>().ok(),
            Some(EntityKind::PurchaseOrder)
        );
        assert_eq!(
            "PurchaseOrder".parse::<EntityKind>().ok(),
            Some(EntityKind::PurchaseOrder)
        );
        assert!("Invoice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            AssetStatus::Active,
            AssetStatus::InMaintenance,
            AssetStatus::Retired,
            AssetStatus::Disposed,
        ] {
            assert_eq!(status.as_str().parse::<AssetStatus>().ok(), Some(status));
        }
        assert_eq!(AssetStatus::default(), AssetStatus::Active);
        assert_eq!(PurchaseOrderStatus::default().as_str(), "DRAFT");
        assert!("SHIPPED".parse::<PurchaseOrderStatus>().is_err());
    }

    fn audit(entity_type: &str, entity_id: Option<&str>) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            action: "CREATE".to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.map(str::to_string),
            details: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn audit_target_is_typed_for_known_entities() {
        let id = Uuid::new_v4();
        let log = audit("Asset", Some(&id.to_string()));
        assert_eq!(
            log.target(),
            AuditTarget::Known {
                kind: EntityKind::Asset,
                id: Some(id)
            }
        );
    }

    #[test]
    fn audit_target_keeps_unknown_pairs_untyped() {
        let log = audit("Invoice", Some("INV-7"));
        assert_eq!(
            log.target(),
            AuditTarget::Other {
                entity_type: "Invoice".to_string(),
                entity_id: Some("INV-7".to_string())
            }
        );

        // Known type with a non-uuid id stays untyped too
        let log = audit("asset", Some("not-a-uuid"));
        assert!(matches!(log.target(), AuditTarget::Other { .. }));
    }
}
