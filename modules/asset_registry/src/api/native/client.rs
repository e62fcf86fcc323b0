//! Native client implementation - wraps the domain service for in-process calls

use crate::contract::{
    Asset, AssetRegistryApi, AuditLog, Category, EntityKind, LineItem, MaintenanceRecord,
    NewAsset, NewCategory, NewMaintenanceRecord, NewOrderLine, NewPurchaseOrder, NewSubCategory,
    NewVendor, PurchaseOrder, PurchaseOrderWithLines, RegistryError, SubCategory, Vendor,
    VendorPatch, VendorSpend,
};
use crate::domain::Service;
use crate::infra::Database;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Native client that calls the domain service directly
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service<Database>>,
}

impl NativeClient {
    pub fn new(service: Arc<Service<Database>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AssetRegistryApi for NativeClient {
    async fn create_category(&self, data: NewCategory) -> Result<Category, RegistryError> {
        self.service.create_category(data).await
    }

    async fn create_sub_category(
        &self,
        data: NewSubCategory,
    ) -> Result<SubCategory, RegistryError> {
        self.service.create_sub_category(data).await
    }

    async fn register_asset(&self, data: NewAsset) -> Result<Asset, RegistryError> {
        self.service.register_asset(data).await
    }

    async fn get_asset(&self, id: Uuid) -> Result<Asset, RegistryError> {
        self.service.get_asset(id).await
    }

    async fn list_assets(&self, sub_category_id: Uuid) -> Result<Vec<Asset>, RegistryError> {
        self.service.list_assets(sub_category_id).await
    }

    async fn create_vendor(&self, data: NewVendor) -> Result<Vendor, RegistryError> {
        self.service.create_vendor(data).await
    }

    async fn update_vendor(
        &self,
        id: Uuid,
        patch: VendorPatch,
    ) -> Result<Vendor, RegistryError> {
        self.service.update_vendor(id, patch).await
    }

    async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<PurchaseOrderWithLines, RegistryError> {
        self.service.create_purchase_order(order, lines).await
    }

    async fn approve_purchase_order(
        &self,
        id: Uuid,
        approver: &str,
    ) -> Result<PurchaseOrder, RegistryError> {
        self.service.approve_purchase_order(id, approver).await
    }

    async fn receive_line_item(
        &self,
        line_item_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, RegistryError> {
        self.service.receive_line_item(line_item_id, quantity).await
    }

    async fn spend_by_vendor(&self) -> Result<Vec<VendorSpend>, RegistryError> {
        self.service.spend_by_vendor().await
    }

    async fn report_maintenance(
        &self,
        data: NewMaintenanceRecord,
    ) -> Result<MaintenanceRecord, RegistryError> {
        self.service.report_maintenance(data).await
    }

    async fn resolve_maintenance(
        &self,
        record_id: Uuid,
        cost: Option<f64>,
    ) -> Result<MaintenanceRecord, RegistryError> {
        self.service.resolve_maintenance(record_id, cost).await
    }

    async fn audit_trail(
        &self,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Vec<AuditLog>, RegistryError> {
        self.service.audit_trail(kind, id).await
    }
}
