use sea_orm::entity::prelude::*;

/// Purchase orders table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub po_number: String,

    pub date: DateTimeUtc,

    pub vendor_id: Option<Uuid>,

    /// Vendor name copied when the order was raised
    pub vendor_name_snap: Option<String>,

    /// Vendor GSTIN copied when the order was raised
    pub gstin: Option<String>,

    pub billing_address: Option<String>,

    pub shipping_address: Option<String>,

    pub total_amount: f64,

    pub currency: String,

    pub status: String,

    pub requested_by: Option<String>,

    pub requested_at: Option<DateTimeUtc>,

    pub approved_by: Option<String>,

    pub approved_at: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text")]
    pub properties: String,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Vendor,

    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,

    #[sea_orm(has_many = "super::asset::Entity")]
    Assets,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
