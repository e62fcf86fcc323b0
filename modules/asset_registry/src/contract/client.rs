//! Native client trait for in-process callers
//!
//! Application code talks to the registry through this trait; the
//! implementation lives in `api::native` and delegates to the domain service.

use super::error::RegistryError;
use super::model::{
    Asset, AuditLog, Category, EntityKind, LineItem, MaintenanceRecord, NewAsset, NewCategory,
    NewMaintenanceRecord, NewOrderLine, NewPurchaseOrder, NewSubCategory, NewVendor,
    PurchaseOrder, PurchaseOrderWithLines, SubCategory, Vendor, VendorPatch, VendorSpend,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Asset registry API for inter-module communication
#[async_trait]
pub trait AssetRegistryApi: Send + Sync {
    // ===== Catalogue =====

    /// Create a top-level category
    async fn create_category(&self, data: NewCategory) -> Result<Category, RegistryError>;

    /// Create a sub-category; its field definitions must be well-formed
    async fn create_sub_category(
        &self,
        data: NewSubCategory,
    ) -> Result<SubCategory, RegistryError>;

    // ===== Assets =====

    /// Register an asset whose properties satisfy its sub-category's field definitions
    async fn register_asset(&self, data: NewAsset) -> Result<Asset, RegistryError>;

    /// Get an asset by id
    async fn get_asset(&self, id: Uuid) -> Result<Asset, RegistryError>;

    /// List the assets of a sub-category
    async fn list_assets(&self, sub_category_id: Uuid) -> Result<Vec<Asset>, RegistryError>;

    // ===== Procurement =====

    async fn create_vendor(&self, data: NewVendor) -> Result<Vendor, RegistryError>;

    /// Update a vendor; purchase-order snapshots are left untouched
    async fn update_vendor(&self, id: Uuid, patch: VendorPatch)
        -> Result<Vendor, RegistryError>;

    /// Raise a purchase order with its lines in one transaction
    async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<PurchaseOrderWithLines, RegistryError>;

    async fn approve_purchase_order(
        &self,
        id: Uuid,
        approver: &str,
    ) -> Result<PurchaseOrder, RegistryError>;

    /// Record goods received against a line item
    async fn receive_line_item(
        &self,
        line_item_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, RegistryError>;

    async fn spend_by_vendor(&self) -> Result<Vec<VendorSpend>, RegistryError>;

    // ===== Maintenance =====

    /// Open a maintenance record and move the asset into maintenance
    async fn report_maintenance(
        &self,
        data: NewMaintenanceRecord,
    ) -> Result<MaintenanceRecord, RegistryError>;

    /// Close a maintenance record; the asset is reactivated once nothing is open
    async fn resolve_maintenance(
        &self,
        record_id: Uuid,
        cost: Option<f64>,
    ) -> Result<MaintenanceRecord, RegistryError>;

    // ===== Audit =====

    /// Audit entries for one entity, newest first
    async fn audit_trail(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Vec<AuditLog>, RegistryError>;
}
