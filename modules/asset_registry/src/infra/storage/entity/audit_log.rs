use sea_orm::entity::prelude::*;

/// Audit log table entity
///
/// `(entity_type, entity_id)` points at a row by value only; there is no
/// foreign key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub action: String,

    pub entity_type: String,

    pub entity_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,

    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
