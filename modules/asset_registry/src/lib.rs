//! Asset Registry
//!
//! Relational data layer for an asset-management system: users, a
//! category/sub-category catalogue, assets with schema-checked properties,
//! maintenance records, vendors, purchase orders with line items, and an
//! audit trail. Every entity gets the same repository operations, over a
//! pooled connection or inside a transaction.

// Public exports
pub mod contract;
pub use contract::{
    client::AssetRegistryApi, error::RegistryError, ErrorKind, Filter, FindManyArgs, OrderBy,
    Record, Selection,
};

pub mod config;
pub use config::Config;

pub mod domain;
pub use domain::{LogLevel, RegistryStore, Repository, Service};

pub mod infra;
pub use infra::{Batch, BatchOutput, Database, Tables, TransactionOptions, TxHandle};
pub use infra::storage::RawStatement;
pub use sea_orm::IsolationLevel;

pub mod logging;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
pub use api::native::NativeClient;
