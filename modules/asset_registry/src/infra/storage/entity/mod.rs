//! SeaORM entities for the registry tables
//!
//! Document columns (`properties`, `field_definitions`) are plain TEXT here;
//! the mapper parses them into JSON values.

pub mod asset;
pub mod audit_log;
pub mod category;
pub mod line_item;
pub mod maintenance_record;
pub mod purchase_order;
pub mod sub_category;
pub mod user;
pub mod vendor;
