//! Database migrations for the asset registry
//!
//! Required relations block deletion of a referenced parent (`NO ACTION`,
//! checked when the statement ends); optional ones are nulled out. Every
//! foreign key cascades key updates.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_catalogue::Migration),
            Box::new(m20250301_000003_create_procurement::Migration),
            Box::new(m20250301_000004_create_assets::Migration),
            Box::new(m20250301_000005_create_audit_logs::Migration),
        ]
    }
}

fn created_at<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

mod m20250301_000001_create_users {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_users"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Password).string().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string()
                                .not_null()
                                .default("USER"),
                        )
                        .col(created_at(Users::CreatedAt))
                        .col(created_at(Users::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        Password,
        Name,
        Role,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_catalogue {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_catalogue"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Categories::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Categories::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Categories::Description).string())
                        .col(created_at(Categories::CreatedAt))
                        .col(created_at(Categories::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SubCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SubCategories::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SubCategories::Name).string().not_null())
                        .col(ColumnDef::new(SubCategories::Slug).string().not_null())
                        .col(ColumnDef::new(SubCategories::CategoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(SubCategories::FieldDefinitions)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(created_at(SubCategories::CreatedAt))
                        .col(created_at(SubCategories::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sub_categories_category")
                                .from(SubCategories::Table, SubCategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::NoAction)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Slugs are unique per category, not globally
            manager
                .create_index(
                    Index::create()
                        .name("uq_sub_categories_category_slug")
                        .table(SubCategories::Table)
                        .col(SubCategories::CategoryId)
                        .col(SubCategories::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SubCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Slug,
        Description,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SubCategories {
        Table,
        Id,
        Name,
        Slug,
        CategoryId,
        FieldDefinitions,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_procurement {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_procurement"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Vendors::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vendors::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Vendors::Name).string().not_null())
                        .col(ColumnDef::new(Vendors::Gstin).string())
                        .col(ColumnDef::new(Vendors::Email).string())
                        .col(ColumnDef::new(Vendors::Phone).string())
                        .col(ColumnDef::new(Vendors::Address).string())
                        .col(created_at(Vendors::CreatedAt))
                        .col(created_at(Vendors::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::PoNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Date)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::VendorId).uuid())
                        .col(ColumnDef::new(PurchaseOrders::VendorNameSnap).string())
                        .col(ColumnDef::new(PurchaseOrders::Gstin).string())
                        .col(ColumnDef::new(PurchaseOrders::BillingAddress).string())
                        .col(ColumnDef::new(PurchaseOrders::ShippingAddress).string())
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Currency)
                                .string()
                                .not_null()
                                .default("INR"),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::Status)
                                .string()
                                .not_null()
                                .default("DRAFT"),
                        )
                        .col(ColumnDef::new(PurchaseOrders::RequestedBy).string())
                        .col(ColumnDef::new(PurchaseOrders::RequestedAt).timestamp_with_time_zone())
                        .col(ColumnDef::new(PurchaseOrders::ApprovedBy).string())
                        .col(ColumnDef::new(PurchaseOrders::ApprovedAt).timestamp_with_time_zone())
                        .col(
                            ColumnDef::new(PurchaseOrders::Properties)
                                .text()
                                .not_null()
                                .default("{}"),
                        )
                        .col(created_at(PurchaseOrders::CreatedAt))
                        .col(created_at(PurchaseOrders::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_orders_vendor")
                                .from(PurchaseOrders::Table, PurchaseOrders::VendorId)
                                .to(Vendors::Table, Vendors::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LineItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LineItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LineItems::SrNo).integer().not_null())
                        .col(ColumnDef::new(LineItems::ProductName).string().not_null())
                        .col(ColumnDef::new(LineItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(LineItems::Uom).string())
                        .col(ColumnDef::new(LineItems::UnitPrice).double().not_null())
                        .col(
                            ColumnDef::new(LineItems::Discount)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(LineItems::Gst)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(ColumnDef::new(LineItems::TotalAmount).double().not_null())
                        .col(
                            ColumnDef::new(LineItems::ReceivedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_line_items_purchase_order")
                                .from(LineItems::Table, LineItems::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::NoAction)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_purchase_orders_vendor_id")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::VendorId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_line_items_purchase_order_id")
                        .table(LineItems::Table)
                        .col(LineItems::PurchaseOrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vendors::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Vendors {
        Table,
        Id,
        Name,
        Gstin,
        Email,
        Phone,
        Address,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        Date,
        VendorId,
        VendorNameSnap,
        Gstin,
        BillingAddress,
        ShippingAddress,
        TotalAmount,
        Currency,
        Status,
        RequestedBy,
        RequestedAt,
        ApprovedBy,
        ApprovedAt,
        Properties,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum LineItems {
        Table,
        Id,
        PurchaseOrderId,
        SrNo,
        ProductName,
        Quantity,
        Uom,
        UnitPrice,
        Discount,
        Gst,
        TotalAmount,
        ReceivedQty,
    }
}

mod m20250301_000004_create_assets {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_assets"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Assets::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Assets::SubCategoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(Assets::Properties)
                                .text()
                                .not_null()
                                .default("{}"),
                        )
                        .col(
                            ColumnDef::new(Assets::Status)
                                .string()
                                .not_null()
                                .default("ACTIVE"),
                        )
                        .col(ColumnDef::new(Assets::PurchaseOrderId).uuid())
                        .col(created_at(Assets::CreatedAt))
                        .col(created_at(Assets::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_sub_category")
                                .from(Assets::Table, Assets::SubCategoryId)
                                .to(SubCategories::Table, SubCategories::Id)
                                .on_delete(ForeignKeyAction::NoAction)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_purchase_order")
                                .from(Assets::Table, Assets::PurchaseOrderId)
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MaintenanceRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaintenanceRecords::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MaintenanceRecords::AssetId).uuid().not_null())
                        .col(
                            ColumnDef::new(MaintenanceRecords::IssueType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRecords::Description)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRecords::Cost)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(MaintenanceRecords::Status)
                                .string()
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(ColumnDef::new(MaintenanceRecords::ReportedBy).string())
                        .col(
                            ColumnDef::new(MaintenanceRecords::ResolvedDate)
                                .timestamp_with_time_zone(),
                        )
                        .col(created_at(MaintenanceRecords::CreatedAt))
                        .col(created_at(MaintenanceRecords::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_records_asset")
                                .from(MaintenanceRecords::Table, MaintenanceRecords::AssetId)
                                .to(Assets::Table, Assets::Id)
                                .on_delete(ForeignKeyAction::NoAction)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_assets_sub_category_id")
                        .table(Assets::Table)
                        .col(Assets::SubCategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_maintenance_records_asset_id")
                        .table(MaintenanceRecords::Table)
                        .col(MaintenanceRecords::AssetId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaintenanceRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Assets {
        Table,
        Id,
        SubCategoryId,
        Properties,
        Status,
        PurchaseOrderId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MaintenanceRecords {
        Table,
        Id,
        AssetId,
        IssueType,
        Description,
        Cost,
        Status,
        ReportedBy,
        ResolvedDate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SubCategories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
    }
}

mod m20250301_000005_create_audit_logs {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_audit_logs"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuditLogs::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityType).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityId).string())
                        .col(ColumnDef::new(AuditLogs::Details).text())
                        .col(created_at(AuditLogs::Timestamp))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_audit_logs_entity")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::EntityType)
                        .col(AuditLogs::EntityId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        Table,
        Id,
        Action,
        EntityType,
        EntityId,
        Details,
        Timestamp,
    }
}
