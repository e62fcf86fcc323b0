//! Repository traits for data access
//!
//! One generic interface serves all nine entities. The SeaORM implementation
//! is in infra/storage/repositories.rs and runs over a pooled connection or
//! an open transaction alike. [`RegistryStore`] is what the service needs
//! from a database: the tables, and transactions over them.

use crate::contract::{
    AggregateSummary, Asset, AuditLog, Category, Filter, FindManyArgs, GroupByArgs, GroupSummary,
    LineItem, MaintenanceRecord, PurchaseOrder, Record, RegistryError, Selection, SubCategory,
    User, Vendor,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Uniform per-entity operations
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Find a row by one of its unique keys
    async fn find_unique(&self, key: &R::Key) -> Result<Option<R>, RegistryError>;

    /// Like [`Repository::find_unique`], but a missing row is `NotFound`
    async fn find_unique_or_throw(&self, key: &R::Key) -> Result<R, RegistryError> {
        self.find_unique(key)
            .await?
            .ok_or_else(|| RegistryError::not_found(R::KIND.as_str(), key))
    }

    /// First row of a `find_many`
    async fn find_first(&self, args: FindManyArgs) -> Result<Option<R>, RegistryError> {
        let args = FindManyArgs {
            take: Some(1),
            ..args
        };
        Ok(self.find_many(args).await?.into_iter().next())
    }

    /// Filtered, ordered, paginated listing
    async fn find_many(&self, args: FindManyArgs) -> Result<Vec<R>, RegistryError>;

    async fn create(&self, data: R::Create) -> Result<R, RegistryError>;

    /// Insert several rows in one statement; returns the number inserted
    async fn create_many(&self, data: Vec<R::Create>) -> Result<u64, RegistryError>;

    /// Update the row a unique key names; a missing row is `NotFound`
    async fn update(&self, key: &R::Key, data: R::Update) -> Result<R, RegistryError>;

    /// Apply the same patch to every matching row; returns the count affected
    async fn update_many(
        &self,
        filter: Option<Filter>,
        data: R::Update,
    ) -> Result<u64, RegistryError>;

    /// Delete the row a unique key names and return it
    async fn delete(&self, key: &R::Key) -> Result<R, RegistryError>;

    async fn delete_many(&self, filter: Option<Filter>) -> Result<u64, RegistryError>;

    /// Update when the key matches a row, create otherwise
    async fn upsert(
        &self,
        key: &R::Key,
        create: R::Create,
        update: R::Update,
    ) -> Result<R, RegistryError>;

    async fn count(&self, filter: Option<Filter>) -> Result<u64, RegistryError>;

    /// count/sum/avg/min/max of one field over the matching rows
    async fn aggregate(
        &self,
        filter: Option<Filter>,
        field: &str,
    ) -> Result<AggregateSummary, RegistryError>;

    async fn group_by(&self, args: GroupByArgs) -> Result<Vec<GroupSummary>, RegistryError>;

    /// `find_many` returning JSON objects trimmed by the omission rules
    async fn find_many_shaped(
        &self,
        args: FindManyArgs,
        selection: Selection,
    ) -> Result<Vec<Map<String, Value>>, RegistryError>;
}

/// Repositories for every entity over one connection
pub trait RegistryTables: Send + Sync {
    fn users(&self) -> Box<dyn Repository<User> + '_>;
    fn categories(&self) -> Box<dyn Repository<Category> + '_>;
    fn sub_categories(&self) -> Box<dyn Repository<SubCategory> + '_>;
    fn assets(&self) -> Box<dyn Repository<Asset> + '_>;
    fn maintenance_records(&self) -> Box<dyn Repository<MaintenanceRecord> + '_>;
    fn vendors(&self) -> Box<dyn Repository<Vendor> + '_>;
    fn purchase_orders(&self) -> Box<dyn Repository<PurchaseOrder> + '_>;
    fn line_items(&self) -> Box<dyn Repository<LineItem> + '_>;
    fn audit_logs(&self) -> Box<dyn Repository<AuditLog> + '_>;
}

/// A database the service can read from and open transactions on
pub trait RegistryStore: RegistryTables + 'static {
    /// Tables of an open transaction
    type Tx: RegistryTables;

    /// Run `body` in one transaction. `Ok` commits; an error rolls back.
    fn transaction<'a, T, F>(&'a self, body: F) -> BoxFuture<'a, Result<T, RegistryError>>
    where
        T: Send + 'a,
        F: for<'t> FnOnce(&'t Self::Tx) -> BoxFuture<'t, Result<T, RegistryError>> + Send + 'a;
}
