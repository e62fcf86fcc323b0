use sea_orm::entity::prelude::*;

/// Purchase order line items table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub purchase_order_id: Uuid,

    /// Position within the order, starting at 1
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
