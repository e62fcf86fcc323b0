//! Contract layer - public API for in-process callers
//!
//! Records, query arguments, errors and the native client trait. Nothing in
//! here depends on the storage engine.

pub mod client;
pub mod error;
pub mod model;
pub mod query;

pub use client::AssetRegistryApi;
pub use error::{ErrorKind, RegistryError};
pub use model::*;
pub use query::{
    AggregateFn, AggregateSummary, Comparison, FieldOp, Filter, FilterValue, FindManyArgs,
    GroupByArgs, GroupSummary, Having, OrderBy, Selection, SortOrder,
};
