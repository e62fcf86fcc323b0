//! Domain service - application operations over the repositories
//!
//! Every write runs in one transaction together with its audit entry, so an
//! operation either lands completely or not at all.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::repository::{RegistryStore, RegistryTables, Repository};
use super::validation::{parse_field_definitions, validate_properties};
use crate::contract::{
    Asset, AssetPatch, AssetStatus, AuditLog, Category, CategoryKey, EntityKind, Filter,
    FilterValue, FindManyArgs, GroupByArgs, LineItem, LineItemPatch, MaintenanceRecord,
    MaintenanceRecordPatch, MaintenanceStatus, NewAsset, NewAuditLog, NewCategory, NewLineItem,
    NewMaintenanceRecord, NewOrderLine, NewPurchaseOrder, NewSubCategory, NewVendor, OrderBy,
    PurchaseOrder, PurchaseOrderKey, PurchaseOrderPatch, PurchaseOrderStatus,
    PurchaseOrderWithLines, RegistryError, SubCategory, SubCategoryKey, Vendor, VendorPatch,
    VendorSpend,
};

/// Domain service for the asset registry
pub struct Service<S> {
    db: Arc<S>,
}

impl<S: RegistryStore> Service<S> {
    pub fn new(db: Arc<S>) -> Self {
        Self { db }
    }

    pub fn store(&self) -> &S {
        &self.db
    }

    // ===== Catalogue =====

    pub async fn create_category(&self, data: NewCategory) -> Result<Category, RegistryError> {
        let category = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let category = tx.categories().create(data).await?;
                    audit(tx, "CREATE", EntityKind::Category, category.id, &category.slug).await?;
                    Ok(category)
                })
            })
            .await?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Create a sub-category after checking its field definitions parse
    pub async fn create_sub_category(
        &self,
        data: NewSubCategory,
    ) -> Result<SubCategory, RegistryError> {
        parse_field_definitions(&data.field_definitions)?;

        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    tx.categories()
                        .find_unique_or_throw(&CategoryKey::Id(data.category_id))
                        .await?;
                    let sub = tx.sub_categories().create(data).await?;
                    audit(tx, "CREATE", EntityKind::SubCategory, sub.id, &sub.slug).await?;
                    Ok(sub)
                })
            })
            .await
    }

    // ===== Assets =====

    /// Register an asset; `properties` must satisfy the sub-category's field definitions
    pub async fn register_asset(&self, data: NewAsset) -> Result<Asset, RegistryError> {
        let asset = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let sub = tx
                        .sub_categories()
                        .find_unique_or_throw(&SubCategoryKey::Id(data.sub_category_id))
                        .await?;
                    let definitions = parse_field_definitions(&sub.field_definitions)?;
                    validate_properties(&data.properties, &definitions)?;

                    if let Some(order_id) = data.purchase_order_id {
                        tx.purchase_orders()
                            .find_unique_or_throw(&PurchaseOrderKey::Id(order_id))
                            .await?;
                    }

                    let asset = tx.assets().create(data).await?;
                    audit(tx, "CREATE", EntityKind::Asset, asset.id, &sub.slug).await?;
                    Ok(asset)
                })
            })
            .await?;
        tracing::info!(asset_id = %asset.id, "Asset registered");
        Ok(asset)
    }

    pub async fn get_asset(&self, id: Uuid) -> Result<Asset, RegistryError> {
        self.db.assets().find_unique_or_throw(&id).await
    }

    /// Assets of one sub-category, oldest first
    pub async fn list_assets(&self, sub_category_id: Uuid) -> Result<Vec<Asset>, RegistryError> {
        self.db
            .assets()
            .find_many(
                FindManyArgs::filtered(Filter::eq("sub_category_id", sub_category_id))
                    .order_by(OrderBy::asc("created_at")),
            )
            .await
    }

    // ===== Procurement =====

    pub async fn create_vendor(&self, data: NewVendor) -> Result<Vendor, RegistryError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let vendor = tx.vendors().create(data).await?;
                    audit(tx, "CREATE", EntityKind::Vendor, vendor.id, &vendor.name).await?;
                    Ok(vendor)
                })
            })
            .await
    }

    /// Update a vendor; snapshots on existing purchase orders stay as they were
    pub async fn update_vendor(
        &self,
        id: Uuid,
        patch: VendorPatch,
    ) -> Result<Vendor, RegistryError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let vendor = tx.vendors().update(&id, patch).await?;
                    audit(tx, "UPDATE", EntityKind::Vendor, vendor.id, &vendor.name).await?;
                    Ok(vendor)
                })
            })
            .await
    }

    /// Raise a purchase order with its lines.
    ///
    /// Vendor name and GSTIN are copied onto the order when the caller left
    /// them empty. Lines without a serial number are numbered 1..n.
    pub async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<PurchaseOrderWithLines, RegistryError> {
        for line in &lines {
            if line.quantity <= 0 {
                return Err(RegistryError::validation(format!(
                    "line '{}' must order a positive quantity",
                    line.product_name
                )));
            }
        }

        let created = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    let mut order = order;
                    if let Some(vendor_id) = order.vendor_id {
                        let vendor = tx.vendors().find_unique_or_throw(&vendor_id).await?;
                        if order.vendor_name_snap.is_none() {
                            order.vendor_name_snap = Some(vendor.name);
                        }
                        if order.gstin.is_none() {
                            order.gstin = vendor.gstin;
                        }
                    }

                    let po = tx.purchase_orders().create(order).await?;
                    let mut items = Vec::with_capacity(lines.len());
                    for (index, line) in lines.into_iter().enumerate() {
                        let sr_no = match line.sr_no {
                            Some(sr_no) => sr_no,
                            None => i32::try_from(index + 1).map_err(|_| {
                                RegistryError::validation("too many lines on one order")
                            })?,
                        };
                        let item = NewLineItem {
                            purchase_order_id: po.id,
                            sr_no,
                            product_name: line.product_name,
                            quantity: line.quantity,
                            uom: line.uom,
                            unit_price: line.unit_price,
                            discount: line.discount,
                            gst: line.gst,
                            total_amount: line.total_amount,
                            received_qty: None,
                        };
                        items.push(tx.line_items().create(item).await?);
                    }

                    let details = format!("{} with {} line(s)", po.po_number, items.len());
                    audit(tx, "CREATE", EntityKind::PurchaseOrder, po.id, details).await?;
                    Ok(PurchaseOrderWithLines {
                        order: po,
                        lines: items,
                    })
                })
            })
            .await?;
        tracing::info!(
            po_number = %created.order.po_number,
            lines = created.lines.len(),
            "Purchase order created"
        );
        Ok(created)
    }

    /// Approve a draft or pending order
    pub async fn approve_purchase_order(
        &self,
        id: Uuid,
        approver: &str,
    ) -> Result<PurchaseOrder, RegistryError> {
        if approver.trim().is_empty() {
            return Err(RegistryError::validation("approver cannot be empty"));
        }
        let approver = approver.to_string();

        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let key = PurchaseOrderKey::Id(id);
                    let po = tx.purchase_orders().find_unique_or_throw(&key).await?;
                    if !matches!(
                        po.status,
                        PurchaseOrderStatus::Draft | PurchaseOrderStatus::PendingApproval
                    ) {
                        return Err(RegistryError::validation(format!(
                            "purchase order {} is {} and cannot be approved",
                            po.po_number,
                            po.status.as_str()
                        )));
                    }

                    let patch = PurchaseOrderPatch {
                        status: Some(PurchaseOrderStatus::Approved),
                        approved_by: Some(Some(approver.clone())),
                        approved_at: Some(Some(Utc::now())),
                        ..Default::default()
                    };
                    let po = tx.purchase_orders().update(&key, patch).await?;
                    let details = format!("approved by {approver}");
                    audit(tx, "APPROVE", EntityKind::PurchaseOrder, po.id, details).await?;
                    Ok(po)
                })
            })
            .await
    }

    /// Add `quantity` to a line's received count, never past the ordered quantity
    pub async fn receive_line_item(
        &self,
        line_item_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, RegistryError> {
        if quantity <= 0 {
            return Err(RegistryError::validation(
                "received quantity must be positive",
            ));
        }

        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let line = tx.line_items().find_unique_or_throw(&line_item_id).await?;
                    let received = line.received_qty.saturating_add(quantity);
                    if received > line.quantity {
                        return Err(RegistryError::validation(format!(
                            "receiving {quantity} would exceed the ordered quantity of {} (already received {})",
                            line.quantity, line.received_qty
                        )));
                    }

                    let patch = LineItemPatch {
                        received_qty: Some(received),
                        ..Default::default()
                    };
                    let line = tx.line_items().update(&line_item_id, patch).await?;
                    let details = format!("received {quantity}, {received}/{}", line.quantity);
                    audit(tx, "RECEIVE", EntityKind::LineItem, line.id, details).await?;
                    Ok(line)
                })
            })
            .await
    }

    /// Order count and total spend per vendor; orders without a vendor form one group
    pub async fn spend_by_vendor(&self) -> Result<Vec<VendorSpend>, RegistryError> {
        let groups = self
            .db
            .purchase_orders()
            .group_by(GroupByArgs::by(["vendor_id"]).summarize("total_amount"))
            .await?;

        groups
            .into_iter()
            .map(|group| {
                let vendor_id = match group.key.get("vendor_id").cloned().flatten() {
                    None => None,
                    Some(FilterValue::Uuid(id)) => Some(id),
                    Some(other) => {
                        return Err(RegistryError::engine(format!(
                            "unexpected vendor_id group key {other:?}"
                        )))
                    }
                };
                Ok(VendorSpend {
                    vendor_id,
                    order_count: group.summary.count,
                    total_amount: group.summary.sum.unwrap_or(0.0),
                })
            })
            .collect()
    }

    // ===== Maintenance =====

    /// Open a maintenance record and move the asset into maintenance
    pub async fn report_maintenance(
        &self,
        data: NewMaintenanceRecord,
    ) -> Result<MaintenanceRecord, RegistryError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let asset = tx.assets().find_unique_or_throw(&data.asset_id).await?;
                    if asset.status == AssetStatus::Disposed {
                        return Err(RegistryError::validation(format!(
                            "asset {} is disposed",
                            asset.id
                        )));
                    }

                    let record = tx.maintenance_records().create(data).await?;
                    if record.status.is_open() && asset.status != AssetStatus::InMaintenance {
                        let patch = AssetPatch {
                            status: Some(AssetStatus::InMaintenance),
                            ..Default::default()
                        };
                        tx.assets().update(&asset.id, patch).await?;
                    }
                    audit(
                        tx,
                        "REPORT",
                        EntityKind::MaintenanceRecord,
                        record.id,
                        &record.issue_type,
                    )
                    .await?;
                    Ok(record)
                })
            })
            .await
    }

    /// Complete a maintenance record. The asset goes back to `ACTIVE` once
    /// it has no open records left.
    pub async fn resolve_maintenance(
        &self,
        record_id: Uuid,
        cost: Option<f64>,
    ) -> Result<MaintenanceRecord, RegistryError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let record = tx
                        .maintenance_records()
                        .find_unique_or_throw(&record_id)
                        .await?;
                    if !record.status.is_open() {
                        return Err(RegistryError::validation(format!(
                            "maintenance record {record_id} is already resolved"
                        )));
                    }

                    let patch = MaintenanceRecordPatch {
                        status: Some(MaintenanceStatus::Completed),
                        resolved_date: Some(Some(Utc::now())),
                        cost,
                        ..Default::default()
                    };
                    let record = tx.maintenance_records().update(&record_id, patch).await?;

                    let still_open = tx
                        .maintenance_records()
                        .count(Some(Filter::and([
                            Filter::eq("asset_id", record.asset_id),
                            Filter::ne("status", MaintenanceStatus::Completed.as_str()),
                        ])))
                        .await?;
                    let asset = tx.assets().find_unique_or_throw(&record.asset_id).await?;
                    if still_open == 0 && asset.status == AssetStatus::InMaintenance {
                        let patch = AssetPatch {
                            status: Some(AssetStatus::Active),
                            ..Default::default()
                        };
                        tx.assets().update(&asset.id, patch).await?;
                    }

                    let details = format!("cost {:.2}", record.cost);
                    audit(tx, "RESOLVE", EntityKind::MaintenanceRecord, record.id, details)
                        .await?;
                    Ok(record)
                })
            })
            .await
    }

    // ===== Audit =====

    /// Audit entries for one entity, newest first
    pub async fn audit_trail(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Vec<AuditLog>, RegistryError> {
        self.db
            .audit_logs()
            .find_many(
                FindManyArgs::filtered(Filter::and([
                    Filter::eq("entity_type", kind.as_str()),
                    Filter::eq("entity_id", id.to_string()),
                ]))
                .order_by(OrderBy::desc("timestamp")),
            )
            .await
    }
}

/// Write an audit entry inside the caller's transaction
async fn audit<T: RegistryTables + ?Sized>(
    tx: &T,
    action: &str,
    kind: EntityKind,
    id: Uuid,
    details: impl Into<String>,
) -> Result<(), RegistryError> {
    tx.audit_logs()
        .create(NewAuditLog::for_entity(action, kind, id).with_details(details))
        .await?;
    Ok(())
}
