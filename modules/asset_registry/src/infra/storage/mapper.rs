//! Entity to record mappers
//!
//! Conversions between SeaORM models and contract records, plus the
//! per-entity metadata the generic repository is parameterised by.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, Condition, EntityTrait,
    FromQueryResult, IntoActiveModel, ModelTrait, Set,
};
use std::str::FromStr;
use uuid::Uuid;

use super::entity::{
    asset, audit_log, category, line_item, maintenance_record, purchase_order, sub_category,
    user, vendor,
};
use crate::contract::{
    Asset, AssetPatch, AuditLog, AuditLogPatch, Category, CategoryKey, CategoryPatch, EntityKind,
    LineItem, LineItemPatch, MaintenanceRecord, MaintenanceRecordPatch, NewAsset, NewAuditLog,
    NewCategory, NewLineItem, NewMaintenanceRecord, NewPurchaseOrder, NewSubCategory, NewUser,
    NewVendor, PurchaseOrder, PurchaseOrderKey, PurchaseOrderPatch, Record, RegistryError,
    SubCategory, SubCategoryKey, SubCategoryPatch, User, UserKey, UserPatch, Vendor, VendorPatch,
};

/// Storage metadata for a record type
pub trait Persisted: Record {
    type Entity: EntityTrait<
        Model = Self::Model,
        ActiveModel = Self::ActiveModel,
        Column = Self::Column,
    >;
    type Model: ModelTrait<Entity = Self::Entity>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Clone
        + Send
        + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;
    type Column: ColumnTrait;

    /// Convert a stored row; unreadable document or status text is an engine error
    fn from_model(model: Self::Model) -> Result<Self, RegistryError>;

    /// Build the insert for a create payload, assigning a fresh id
    fn new_active(data: Self::Create, now: DateTime<Utc>)
        -> Result<Self::ActiveModel, RegistryError>;

    /// Apply a partial update; bumps `updated_at` where the table has one
    fn apply_update(
        active: &mut Self::ActiveModel,
        data: Self::Update,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError>;

    /// Condition selecting the row a unique key names
    fn key_condition(key: &Self::Key) -> Condition;

    fn id_column() -> Self::Column;
}

fn patch<V>(slot: &mut ActiveValue<V>, value: Option<V>)
where
    V: Into<sea_orm::Value>,
{
    if let Some(value) = value {
        *slot = Set(value);
    }
}

fn parse_document(
    kind: EntityKind,
    column: &str,
    raw: &str,
) -> Result<serde_json::Value, RegistryError> {
    serde_json::from_str(raw).map_err(|e| {
        RegistryError::engine(format!("corrupt {column} on {kind}: {e}"))
    })
}

fn write_document(value: &serde_json::Value) -> Result<String, RegistryError> {
    serde_json::to_string(value)
        .map_err(|e| RegistryError::validation(format!("document is not serializable: {e}")))
}

fn parse_status<T: FromStr>(kind: EntityKind, raw: &str) -> Result<T, RegistryError> {
    raw.parse()
        .map_err(|_| RegistryError::engine(format!("corrupt status '{raw}' on {kind}")))
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ===== User =====

impl Persisted for User {
    type Entity = user::Entity;
    type Model = user::Model;
    type ActiveModel = user::ActiveModel;
    type Column = user::Column;

    fn from_model(model: user::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            username: model.username,
            password: model.password,
            name: model.name,
            role: parse_status(Self::KIND, &model.role)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(data: NewUser, now: DateTime<Utc>) -> Result<user::ActiveModel, RegistryError> {
        Ok(user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(data.username),
            password: Set(data.password),
            name: Set(data.name),
            role: Set(data.role.unwrap_or_default().as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut user::ActiveModel,
        data: UserPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.username, data.username);
        patch(&mut active.password, data.password);
        patch(&mut active.name, data.name);
        patch(&mut active.role, data.role.map(|r| r.as_str().to_string()));
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &UserKey) -> Condition {
        match key {
            UserKey::Id(id) => Condition::all().add(user::Column::Id.eq(*id)),
            UserKey::Username(username) => {
                Condition::all().add(user::Column::Username.eq(username.as_str()))
            }
        }
    }

    fn id_column() -> user::Column {
        user::Column::Id
    }
}

// ===== Category =====

impl Persisted for Category {
    type Entity = category::Entity;
    type Model = category::Model;
    type ActiveModel = category::ActiveModel;
    type Column = category::Column;

    fn from_model(model: category::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(
        data: NewCategory,
        now: DateTime<Utc>,
    ) -> Result<category::ActiveModel, RegistryError> {
        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            slug: Set(data.slug),
            description: Set(data.description),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut category::ActiveModel,
        data: CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.name, data.name);
        patch(&mut active.slug, data.slug);
        patch(&mut active.description, data.description);
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &CategoryKey) -> Condition {
        let expr = match key {
            CategoryKey::Id(id) => category::Column::Id.eq(*id),
            CategoryKey::Name(name) => category::Column::Name.eq(name.as_str()),
            CategoryKey::Slug(slug) => category::Column::Slug.eq(slug.as_str()),
        };
        Condition::all().add(expr)
    }

    fn id_column() -> category::Column {
        category::Column::Id
    }
}

// ===== SubCategory =====

impl Persisted for SubCategory {
    type Entity = sub_category::Entity;
    type Model = sub_category::Model;
    type ActiveModel = sub_category::ActiveModel;
    type Column = sub_category::Column;

    fn from_model(model: sub_category::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            category_id: model.category_id,
            field_definitions: parse_document(
                Self::KIND,
                "field_definitions",
                &model.field_definitions,
            )?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(
        data: NewSubCategory,
        now: DateTime<Utc>,
    ) -> Result<sub_category::ActiveModel, RegistryError> {
        let field_definitions = if data.field_definitions.is_null() {
            "[]".to_string()
        } else {
            write_document(&data.field_definitions)?
        };
        Ok(sub_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            slug: Set(data.slug),
            category_id: Set(data.category_id),
            field_definitions: Set(field_definitions),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut sub_category::ActiveModel,
        data: SubCategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.name, data.name);
        patch(&mut active.slug, data.slug);
        patch(&mut active.category_id, data.category_id);
        if let Some(defs) = data.field_definitions {
            active.field_definitions = Set(write_document(&defs)?);
        }
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &SubCategoryKey) -> Condition {
        match key {
            SubCategoryKey::Id(id) => Condition::all().add(sub_category::Column::Id.eq(*id)),
            SubCategoryKey::CategorySlug { category_id, slug } => Condition::all()
                .add(sub_category::Column::CategoryId.eq(*category_id))
                .add(sub_category::Column::Slug.eq(slug.as_str())),
        }
    }

    fn id_column() -> sub_category::Column {
        sub_category::Column::Id
    }
}

// ===== Asset =====

impl Persisted for Asset {
    type Entity = asset::Entity;
    type Model = asset::Model;
    type ActiveModel = asset::ActiveModel;
    type Column = asset::Column;

    fn from_model(model: asset::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            sub_category_id: model.sub_category_id,
            properties: parse_document(Self::KIND, "properties", &model.properties)?,
            status: parse_status(Self::KIND, &model.status)?,
            purchase_order_id: model.purchase_order_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(data: NewAsset, now: DateTime<Utc>) -> Result<asset::ActiveModel, RegistryError> {
        let properties = if data.properties.is_null() {
            empty_object()
        } else {
            data.properties
        };
        Ok(asset::ActiveModel {
            id: Set(Uuid::new_v4()),
            sub_category_id: Set(data.sub_category_id),
            properties: Set(write_document(&properties)?),
            status: Set(data.status.unwrap_or_default().as_str().to_string()),
            purchase_order_id: Set(data.purchase_order_id),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut asset::ActiveModel,
        data: AssetPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.sub_category_id, data.sub_category_id);
        if let Some(properties) = data.properties {
            active.properties = Set(write_document(&properties)?);
        }
        patch(&mut active.status, data.status.map(|s| s.as_str().to_string()));
        patch(&mut active.purchase_order_id, data.purchase_order_id);
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &Uuid) -> Condition {
        Condition::all().add(asset::Column::Id.eq(*key))
    }

    fn id_column() -> asset::Column {
        asset::Column::Id
    }
}

// ===== MaintenanceRecord =====

impl Persisted for MaintenanceRecord {
    type Entity = maintenance_record::Entity;
    type Model = maintenance_record::Model;
    type ActiveModel = maintenance_record::ActiveModel;
    type Column = maintenance_record::Column;

    fn from_model(model: maintenance_record::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            asset_id: model.asset_id,
            issue_type: model.issue_type,
            description: model.description,
            cost: model.cost,
            status: parse_status(Self::KIND, &model.status)?,
            reported_by: model.reported_by,
            resolved_date: model.resolved_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(
        data: NewMaintenanceRecord,
        now: DateTime<Utc>,
    ) -> Result<maintenance_record::ActiveModel, RegistryError> {
        Ok(maintenance_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            asset_id: Set(data.asset_id),
            issue_type: Set(data.issue_type),
            description: Set(data.description),
            cost: Set(data.cost.unwrap_or(0.0)),
            status: Set(data.status.unwrap_or_default().as_str().to_string()),
            reported_by: Set(data.reported_by),
            resolved_date: Set(data.resolved_date),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut maintenance_record::ActiveModel,
        data: MaintenanceRecordPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.issue_type, data.issue_type);
        patch(&mut active.description, data.description);
        patch(&mut active.cost, data.cost);
        patch(&mut active.status, data.status.map(|s| s.as_str().to_string()));
        patch(&mut active.reported_by, data.reported_by);
        patch(&mut active.resolved_date, data.resolved_date);
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &Uuid) -> Condition {
        Condition::all().add(maintenance_record::Column::Id.eq(*key))
    }

    fn id_column() -> maintenance_record::Column {
        maintenance_record::Column::Id
    }
}

// ===== Vendor =====

impl Persisted for Vendor {
    type Entity = vendor::Entity;
    type Model = vendor::Model;
    type ActiveModel = vendor::ActiveModel;
    type Column = vendor::Column;

    fn from_model(model: vendor::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            name: model.name,
            gstin: model.gstin,
            email: model.email,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(
        data: NewVendor,
        now: DateTime<Utc>,
    ) -> Result<vendor::ActiveModel, RegistryError> {
        Ok(vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(data.name),
            gstin: Set(data.gstin),
            email: Set(data.email),
            phone: Set(data.phone),
            address: Set(data.address),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut vendor::ActiveModel,
        data: VendorPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.name, data.name);
        patch(&mut active.gstin, data.gstin);
        patch(&mut active.email, data.email);
        patch(&mut active.phone, data.phone);
        patch(&mut active.address, data.address);
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &Uuid) -> Condition {
        Condition::all().add(vendor::Column::Id.eq(*key))
    }

    fn id_column() -> vendor::Column {
        vendor::Column::Id
    }
}

// ===== PurchaseOrder =====

impl Persisted for PurchaseOrder {
    type Entity = purchase_order::Entity;
    type Model = purchase_order::Model;
    type ActiveModel = purchase_order::ActiveModel;
    type Column = purchase_order::Column;

    fn from_model(model: purchase_order::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            po_number: model.po_number,
            date: model.date,
            vendor_id: model.vendor_id,
            vendor_name_snap: model.vendor_name_snap,
            gstin: model.gstin,
            billing_address: model.billing_address,
            shipping_address: model.shipping_address,
            total_amount: model.total_amount,
            currency: model.currency,
            status: parse_status(Self::KIND, &model.status)?,
            requested_by: model.requested_by,
            requested_at: model.requested_at,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            properties: parse_document(Self::KIND, "properties", &model.properties)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    fn new_active(
        data: NewPurchaseOrder,
        now: DateTime<Utc>,
    ) -> Result<purchase_order::ActiveModel, RegistryError> {
        let properties = data.properties.unwrap_or_else(empty_object);
        Ok(purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(data.po_number),
            date: Set(data.date),
            vendor_id: Set(data.vendor_id),
            vendor_name_snap: Set(data.vendor_name_snap),
            gstin: Set(data.gstin),
            billing_address: Set(data.billing_address),
            shipping_address: Set(data.shipping_address),
            total_amount: Set(data.total_amount),
            currency: Set(data.currency.unwrap_or_else(|| "INR".to_string())),
            status: Set(data.status.unwrap_or_default().as_str().to_string()),
            requested_by: Set(data.requested_by),
            requested_at: Set(data.requested_at),
            approved_by: Set(data.approved_by),
            approved_at: Set(data.approved_at),
            properties: Set(write_document(&properties)?),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }

    fn apply_update(
        active: &mut purchase_order::ActiveModel,
        data: PurchaseOrderPatch,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.po_number, data.po_number);
        patch(&mut active.date, data.date);
        patch(&mut active.vendor_id, data.vendor_id);
        patch(&mut active.vendor_name_snap, data.vendor_name_snap);
        patch(&mut active.gstin, data.gstin);
        patch(&mut active.billing_address, data.billing_address);
        patch(&mut active.shipping_address, data.shipping_address);
        patch(&mut active.total_amount, data.total_amount);
        patch(&mut active.currency, data.currency);
        patch(&mut active.status, data.status.map(|s| s.as_str().to_string()));
        patch(&mut active.requested_by, data.requested_by);
        patch(&mut active.requested_at, data.requested_at);
        patch(&mut active.approved_by, data.approved_by);
        patch(&mut active.approved_at, data.approved_at);
        if let Some(properties) = data.properties {
            active.properties = Set(write_document(&properties)?);
        }
        active.updated_at = Set(now);
        Ok(())
    }

    fn key_condition(key: &PurchaseOrderKey) -> Condition {
        let expr = match key {
            PurchaseOrderKey::Id(id) => purchase_order::Column::Id.eq(*id),
            PurchaseOrderKey::PoNumber(number) => {
                purchase_order::Column::PoNumber.eq(number.as_str())
            }
        };
        Condition::all().add(expr)
    }

    fn id_column() -> purchase_order::Column {
        purchase_order::Column::Id
    }
}

// ===== LineItem =====

impl Persisted for LineItem {
    type Entity = line_item::Entity;
    type Model = line_item::Model;
    type ActiveModel = line_item::ActiveModel;
    type Column = line_item::Column;

    fn from_model(model: line_item::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            purchase_order_id: model.purchase_order_id,
            sr_no: model.sr_no,
            product_name: model.product_name,
            quantity: model.quantity,
            uom: model.uom,
            unit_price: model.unit_price,
            discount: model.discount,
            gst: model.gst,
            total_amount: model.total_amount,
            received_qty: model.received_qty,
        })
    }

    fn new_active(
        data: NewLineItem,
        _now: DateTime<Utc>,
    ) -> Result<line_item::ActiveModel, RegistryError> {
        Ok(line_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(data.purchase_order_id),
            sr_no: Set(data.sr_no),
            product_name: Set(data.product_name),
            quantity: Set(data.quantity),
            uom: Set(data.uom),
            unit_price: Set(data.unit_price),
            discount: Set(data.discount.unwrap_or(0.0)),
            gst: Set(data.gst.unwrap_or(0.0)),
            total_amount: Set(data.total_amount),
            received_qty: Set(data.received_qty.unwrap_or(0)),
        })
    }

    fn apply_update(
        active: &mut line_item::ActiveModel,
        data: LineItemPatch,
        _now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.sr_no, data.sr_no);
        patch(&mut active.product_name, data.product_name);
        patch(&mut active.quantity, data.quantity);
        patch(&mut active.uom, data.uom);
        patch(&mut active.unit_price, data.unit_price);
        patch(&mut active.discount, data.discount);
        patch(&mut active.gst, data.gst);
        patch(&mut active.total_amount, data.total_amount);
        patch(&mut active.received_qty, data.received_qty);
        Ok(())
    }

    fn key_condition(key: &Uuid) -> Condition {
        Condition::all().add(line_item::Column::Id.eq(*key))
    }

    fn id_column() -> line_item::Column {
        line_item::Column::Id
    }
}

// ===== AuditLog =====

impl Persisted for AuditLog {
    type Entity = audit_log::Entity;
    type Model = audit_log::Model;
    type ActiveModel = audit_log::ActiveModel;
    type Column = audit_log::Column;

    fn from_model(model: audit_log::Model) -> Result<Self, RegistryError> {
        Ok(Self {
            id: model.id,
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            details: model.details,
            timestamp: model.timestamp,
        })
    }

    fn new_active(
        data: NewAuditLog,
        now: DateTime<Utc>,
    ) -> Result<audit_log::ActiveModel, RegistryError> {
        Ok(audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            action: Set(data.action),
            entity_type: Set(data.entity_type),
            entity_id: Set(data.entity_id),
            details: Set(data.details),
            timestamp: Set(now),
        })
    }

    fn apply_update(
        active: &mut audit_log::ActiveModel,
        data: AuditLogPatch,
        _now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        patch(&mut active.action, data.action);
        patch(&mut active.details, data.details);
        Ok(())
    }

    fn key_condition(key: &Uuid) -> Condition {
        Condition::all().add(audit_log::Column::Id.eq(*key))
    }

    fn id_column() -> audit_log::Column {
        audit_log::Column::Id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AssetStatus, ErrorKind};

    fn asset_model(properties: &str, status: &str) -> asset::Model {
        asset::Model {
            id: Uuid::new_v4(),
            sub_category_id: Uuid::new_v4(),
            properties: properties.to_string(),
            status: status.to_string(),
            purchase_order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn asset_model_maps_document_and_status() {
        let asset = Asset::from_model(asset_model(r#"{"serial":"SN-1"}"#, "IN_MAINTENANCE"))
            .unwrap();
        assert_eq!(asset.properties["serial"], "SN-1");
        assert_eq!(asset.status, AssetStatus::InMaintenance);
    }

    #[test]
    fn corrupt_rows_are_engine_errors() {
        let err = Asset::from_model(asset_model("{not json", "ACTIVE")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Engine);

        let err = Asset::from_model(asset_model("{}", "LOST")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Engine);
    }

    #[test]
    fn create_payload_applies_defaults() {
        let now = Utc::now();
        let active = PurchaseOrder::new_active(NewPurchaseOrder::new("PO-1", now, 10.0), now)
            .unwrap();
        assert_eq!(active.currency, Set("INR".to_string()));
        assert_eq!(active.status, Set("DRAFT".to_string()));
        assert_eq!(active.properties, Set("{}".to_string()));
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let now = Utc::now();
        let mut active = vendor::ActiveModel {
            name: ActiveValue::Unchanged("Acme".to_string()),
            gstin: ActiveValue::Unchanged(Some("GST-1".to_string())),
            ..ActiveModelBehavior::new()
        };
        Vendor::apply_update(
            &mut active,
            VendorPatch {
                gstin: Some(None),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(active.name, ActiveValue::Unchanged("Acme".to_string()));
        assert_eq!(active.gstin, Set(None));
        assert_eq!(active.updated_at, Set(now));
    }
}
