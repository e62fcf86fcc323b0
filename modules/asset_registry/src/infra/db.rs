//! Database handle
//!
//! [`Database`] owns the connection pool, the event emitter and the omission
//! rules. Table accessors come from the [`Tables`] trait, which the pool
//! handle and an open transaction ([`TxHandle`]) both implement.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection,
    DatabaseTransaction, DbErr, IsolationLevel, JsonValue, TransactionTrait, Value,
};
use sea_orm_migration::MigratorTrait;
use serde_json::Map;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::contract::{
    Asset, AuditLog, Category, Filter, LineItem, MaintenanceRecord, PurchaseOrder, RegistryError,
    SubCategory, User, Vendor,
};
use crate::domain::events::{EventEmitter, LogEvent, LogLevel};
use crate::domain::repository::{RegistryStore, Repository};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::shape::OmitRules;
use crate::infra::storage::{map_db_err, raw, Persisted, RawStatement};
use crate::infra::storage::{SeaOrmRepository, StorageContext};

/// Per-entity repositories and raw statements over one connection
#[async_trait]
pub trait Tables: Send + Sync {
    type Conn: ConnectionTrait;

    fn connection(&self) -> &Self::Conn;

    fn context(&self) -> &StorageContext;

    fn table<R: Persisted>(&self) -> SeaOrmRepository<'_, R, Self::Conn> {
        SeaOrmRepository::new(self.connection(), self.context())
    }

    fn users(&self) -> SeaOrmRepository<'_, User, Self::Conn> {
        self.table()
    }

    fn categories(&self) -> SeaOrmRepository<'_, Category, Self::Conn> {
        self.table()
    }

    fn sub_categories(&self) -> SeaOrmRepository<'_, SubCategory, Self::Conn> {
        self.table()
    }

    fn assets(&self) -> SeaOrmRepository<'_, Asset, Self::Conn> {
        self.table()
    }

    fn maintenance_records(&self) -> SeaOrmRepository<'_, MaintenanceRecord, Self::Conn> {
        self.table()
    }

    fn vendors(&self) -> SeaOrmRepository<'_, Vendor, Self::Conn> {
        self.table()
    }

    fn purchase_orders(&self) -> SeaOrmRepository<'_, PurchaseOrder, Self::Conn> {
        self.table()
    }

    fn line_items(&self) -> SeaOrmRepository<'_, LineItem, Self::Conn> {
        self.table()
    }

    fn audit_logs(&self) -> SeaOrmRepository<'_, AuditLog, Self::Conn> {
        self.table()
    }

    /// Execute compile-time SQL with bound values; returns affected rows
    async fn execute_raw(&self, statement: RawStatement) -> Result<u64, RegistryError> {
        let (sql, values) = statement.into_parts();
        raw::execute(self.connection(), self.context(), sql, values).await
    }

    /// Run compile-time SQL with bound values; rows come back as JSON objects
    async fn query_raw(
        &self,
        statement: RawStatement,
    ) -> Result<Vec<Map<String, JsonValue>>, RegistryError> {
        let (sql, values) = statement.into_parts();
        raw::query(self.connection(), self.context(), sql, values).await
    }

    /// Like [`Tables::execute_raw`] for SQL built at runtime. The caller
    /// must keep `sql` free of untrusted input.
    async fn execute_raw_unsafe(
        &self,
        sql: String,
        values: Vec<Value>,
    ) -> Result<u64, RegistryError> {
        raw::execute(self.connection(), self.context(), sql, values).await
    }

    /// Like [`Tables::query_raw`] for SQL built at runtime. The caller
    /// must keep `sql` free of untrusted input.
    async fn query_raw_unsafe(
        &self,
        sql: String,
        values: Vec<Value>,
    ) -> Result<Vec<Map<String, JsonValue>>, RegistryError> {
        raw::query(self.connection(), self.context(), sql, values).await
    }
}

/// Bounds and isolation for one callback transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionOptions {
    /// Longest wait for a connection to begin on
    pub max_wait: Duration,
    /// Longest run time of the body
    pub timeout: Duration,
    pub isolation_level: Option<IsolationLevel>,
}

impl TransactionOptions {
    pub fn new(max_wait: Duration, timeout: Duration) -> Self {
        Self {
            max_wait,
            timeout,
            isolation_level: None,
        }
    }

    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
    }
}

/// Open transaction handed to a transaction body
pub struct TxHandle {
    tx: DatabaseTransaction,
    ctx: Arc<StorageContext>,
}

impl Tables for TxHandle {
    type Conn = DatabaseTransaction;

    fn connection(&self) -> &DatabaseTransaction {
        &self.tx
    }

    fn context(&self) -> &StorageContext {
        &self.ctx
    }
}

/// Result of one [`Batch`] step
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutput {
    User(User),
    Category(Category),
    SubCategory(SubCategory),
    Asset(Asset),
    MaintenanceRecord(MaintenanceRecord),
    Vendor(Vendor),
    PurchaseOrder(PurchaseOrder),
    LineItem(LineItem),
    AuditLog(AuditLog),
    /// Rows affected by a bulk step
    Count(u64),
}

macro_rules! batch_output_from {
    ($($record:ident),* $(,)?) => {
        $(
            impl From<$record> for BatchOutput {
                fn from(record: $record) -> Self {
                    BatchOutput::$record(record)
                }
            }
        )*
    };
}

batch_output_from!(
    User,
    Category,
    SubCategory,
    Asset,
    MaintenanceRecord,
    Vendor,
    PurchaseOrder,
    LineItem,
    AuditLog,
);

type BatchStep = Box<
    dyn for<'t> FnOnce(&'t TxHandle) -> BoxFuture<'t, Result<BatchOutput, RegistryError>> + Send,
>;

/// Ordered writes that commit together or not at all
#[derive(Default)]
pub struct Batch {
    steps: Vec<BatchStep>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push<F>(mut self, step: F) -> Self
    where
        F: for<'t> FnOnce(&'t TxHandle) -> BoxFuture<'t, Result<BatchOutput, RegistryError>>
            + Send
            + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn create<R>(self, data: R::Create) -> Self
    where
        R: Persisted + Into<BatchOutput>,
    {
        self.push(move |tx| {
            Box::pin(async move { tx.table::<R>().create(data).await.map(Into::into) })
        })
    }

    pub fn create_many<R: Persisted>(self, data: Vec<R::Create>) -> Self {
        self.push(move |tx| {
            Box::pin(async move {
                tx.table::<R>()
                    .create_many(data)
                    .await
                    .map(BatchOutput::Count)
            })
        })
    }

    pub fn update<R>(self, key: R::Key, data: R::Update) -> Self
    where
        R: Persisted + Into<BatchOutput>,
    {
        self.push(move |tx| {
            Box::pin(async move { tx.table::<R>().update(&key, data).await.map(Into::into) })
        })
    }

    pub fn update_many<R: Persisted>(self, filter: Option<Filter>, data: R::Update) -> Self {
        self.push(move |tx| {
            Box::pin(async move {
                tx.table::<R>()
                    .update_many(filter, data)
                    .await
                    .map(BatchOutput::Count)
            })
        })
    }

    pub fn delete<R>(self, key: R::Key) -> Self
    where
        R: Persisted + Into<BatchOutput>,
    {
        self.push(move |tx| {
            Box::pin(async move { tx.table::<R>().delete(&key).await.map(Into::into) })
        })
    }

    pub fn delete_many<R: Persisted>(self, filter: Option<Filter>) -> Self {
        self.push(move |tx| {
            Box::pin(async move {
                tx.table::<R>()
                    .delete_many(filter)
                    .await
                    .map(BatchOutput::Count)
            })
        })
    }

    pub fn upsert<R>(self, key: R::Key, create: R::Create, update: R::Update) -> Self
    where
        R: Persisted + Into<BatchOutput>,
    {
        self.push(move |tx| {
            Box::pin(async move {
                tx.table::<R>()
                    .upsert(&key, create, update)
                    .await
                    .map(Into::into)
            })
        })
    }
}

/// Connection pool plus registry-wide state
pub struct Database {
    conn: DatabaseConnection,
    ctx: Arc<StorageContext>,
    tx_defaults: TransactionOptions,
}

impl Database {
    /// Connect, hook query events and run pending migrations
    pub async fn connect(config: &Config) -> Result<Self, RegistryError> {
        let events = Arc::new(EventEmitter::new(&config.log));
        let omit = OmitRules::from_config(&config.omit)?;

        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connect_timeout)
            .acquire_timeout(config.acquire_timeout)
            .sqlx_logging(false);

        let mut conn = SeaDatabase::connect(options)
            .await
            .map_err(|e| map_db_err(None, e))?;

        let sink = events.clone();
        conn.set_metric_callback(move |info| {
            sink.query(&info.statement.sql, info.elapsed, info.failed);
        });

        events.info(format!(
            "connected to {:?} database",
            conn.get_database_backend()
        ));

        if config.run_migrations {
            Migrator::up(&conn, None)
                .await
                .map_err(|e| map_db_err(None, e))?;
            events.info("migrations applied");
        }

        Ok(Self {
            conn,
            ctx: Arc::new(StorageContext::new(events, omit)),
            tx_defaults: TransactionOptions::new(
                config.transaction_max_wait,
                config.transaction_timeout,
            ),
        })
    }

    /// Register a listener for events of `level` routed to `event`
    pub fn on<F>(&self, level: LogLevel, listener: F)
    where
        F: Fn(&LogEvent) + Send + Sync + 'static,
    {
        self.ctx.events.on(level, listener);
    }

    pub fn events(&self) -> &EventEmitter {
        &self.ctx.events
    }

    pub fn transaction_defaults(&self) -> TransactionOptions {
        self.tx_defaults
    }

    /// Run `body` in a transaction with the configured bounds
    pub async fn transaction<T, F>(&self, body: F) -> Result<T, RegistryError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t TxHandle) -> BoxFuture<'t, Result<T, RegistryError>> + Send,
    {
        self.transaction_with(self.tx_defaults, body).await
    }

    /// Run `body` in a transaction. `Ok` commits; an error or an exceeded
    /// bound rolls back.
    pub async fn transaction_with<T, F>(
        &self,
        options: TransactionOptions,
        body: F,
    ) -> Result<T, RegistryError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t TxHandle) -> BoxFuture<'t, Result<T, RegistryError>> + Send,
    {
        let begin = self.conn.begin_with_config(options.isolation_level, None);
        let tx = match tokio::time::timeout(options.max_wait, begin).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(self.fail_tx(map_db_err(None, e))),
            Err(_) => {
                return Err(self.fail_tx(RegistryError::transaction(format!(
                    "could not start a transaction within {:?}",
                    options.max_wait
                ))))
            }
        };

        let handle = TxHandle {
            tx,
            ctx: self.ctx.clone(),
        };
        let outcome = tokio::time::timeout(options.timeout, body(&handle)).await;
        let TxHandle { tx, .. } = handle;

        match outcome {
            Ok(Ok(value)) => {
                tx.commit()
                    .await
                    .map_err(|e| self.fail_tx(map_db_err(None, e)))?;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback(tx, &err).await;
                Err(err)
            }
            Err(_) => {
                let err = RegistryError::transaction(format!(
                    "transaction exceeded its timeout of {:?}",
                    options.timeout
                ));
                self.rollback(tx, &err).await;
                Err(self.fail_tx(err))
            }
        }
    }

    /// Run the batch in one transaction; outputs follow step order
    pub async fn batch(&self, batch: Batch) -> Result<Vec<BatchOutput>, RegistryError> {
        self.transaction(move |tx| {
            Box::pin(async move {
                let mut outputs = Vec::with_capacity(batch.steps.len());
                for step in batch.steps {
                    outputs.push(step(tx).await?);
                }
                Ok(outputs)
            })
        })
        .await
    }

    pub async fn close(self) -> Result<(), RegistryError> {
        self.conn.close().await.map_err(|e| map_db_err(None, e))
    }

    async fn rollback(&self, tx: DatabaseTransaction, cause: &RegistryError) {
        let result = tx.rollback().await;
        self.report_rollback(result, cause);
    }

    fn report_rollback(&self, result: Result<(), DbErr>, cause: &RegistryError) {
        match result {
            Ok(()) => self
                .ctx
                .events
                .warn(format!("transaction rolled back: {cause}")),
            Err(e) => self.ctx.events.error(
                "transaction",
                format!("rollback after '{cause}' failed: {e}"),
            ),
        }
    }

    fn fail_tx(&self, err: RegistryError) -> RegistryError {
        self.ctx
            .events
            .error("transaction", format!("transaction failed: {err}"));
        err
    }
}

impl Tables for Database {
    type Conn = DatabaseConnection;

    fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn context(&self) -> &StorageContext {
        &self.ctx
    }
}

impl RegistryStore for Database {
    type Tx = TxHandle;

    fn transaction<'a, T, F>(&'a self, body: F) -> BoxFuture<'a, Result<T, RegistryError>>
    where
        T: Send + 'a,
        F: for<'t> FnOnce(&'t TxHandle) -> BoxFuture<'t, Result<T, RegistryError>> + Send + 'a,
    {
        Box::pin(Database::transaction(self, body))
    }
}

/// Boxed repositories for the service, over the pool or a transaction
macro_rules! registry_tables {
    ($handle:ty) => {
        impl crate::domain::repository::RegistryTables for $handle {
            fn users(&self) -> Box<dyn Repository<User> + '_> {
                Box::new(Tables::users(self))
            }
            fn categories(&self) -> Box<dyn Repository<Category> + '_> {
                Box::new(Tables::categories(self))
            }
            fn sub_categories(&self) -> Box<dyn Repository<SubCategory> + '_> {
                Box::new(Tables::sub_categories(self))
            }
            fn assets(&self) -> Box<dyn Repository<Asset> + '_> {
                Box::new(Tables::assets(self))
            }
            fn maintenance_records(&self) -> Box<dyn Repository<MaintenanceRecord> + '_> {
                Box::new(Tables::maintenance_records(self))
            }
            fn vendors(&self) -> Box<dyn Repository<Vendor> + '_> {
                Box::new(Tables::vendors(self))
            }
            fn purchase_orders(&self) -> Box<dyn Repository<PurchaseOrder> + '_> {
                Box::new(Tables::purchase_orders(self))
            }
            fn line_items(&self) -> Box<dyn Repository<LineItem> + '_> {
                Box::new(Tables::line_items(self))
            }
            fn audit_logs(&self) -> Box<dyn Repository<AuditLog> + '_> {
                Box::new(Tables::audit_logs(self))
            }
        }
    };
}

registry_tables!(Database);
registry_tables!(TxHandle);

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.conn.get_database_backend())
            .field("tx_defaults", &self.tx_defaults)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{LogDefinition, LogEmit};
    use parking_lot::Mutex;

    #[tokio::test]
    async fn failed_rollback_is_reported_as_an_error() {
        let config = Config {
            log: vec![
                LogDefinition::new(LogLevel::Warn, LogEmit::Event),
                LogDefinition::new(LogLevel::Error, LogEmit::Event),
            ],
            ..Config::in_memory()
        };
        let db = Database::connect(&config).await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for level in [LogLevel::Warn, LogLevel::Error] {
            let sink = seen.clone();
            db.on(level, move |event| sink.lock().push(event.clone()));
        }

        let cause = RegistryError::validation("bad input");
        db.report_rollback(Err(DbErr::Custom("connection gone".into())), &cause);
        db.report_rollback(Ok(()), &cause);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].level, LogLevel::Error);
        assert_eq!(seen[0].target.as_deref(), Some("transaction"));
        assert!(seen[0].message.contains("connection gone"), "{}", seen[0].message);
        assert_eq!(seen[1].level, LogLevel::Warn);
    }
}
