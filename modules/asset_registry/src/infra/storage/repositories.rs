//! SeaORM repository implementation
//!
//! [`SeaOrmRepository`] borrows a connection, which is either the pool or an
//! open transaction, and implements [`Repository`] for any [`Persisted`]
//! record. Failed operations are reported as `error` log events before the
//! error is returned.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Asterisk, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, LoaderTrait, ModelTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QueryResult, QuerySelect, QueryTrait, Related, Select, Value,
};
use serde_json::Map;
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use super::filter::{
    build_condition, column_type, cursor_condition, decode_value, is_numeric, null_placement,
    order_columns, resolve_column,
};
use super::mapper::Persisted;
use super::map_db_err;
use super::shape::{shape, OmitRules};
use crate::contract::{
    AggregateFn, AggregateSummary, Comparison, Filter, FindManyArgs, GroupByArgs, GroupSummary,
    RegistryError, Selection,
};
use crate::domain::events::EventEmitter;
use crate::domain::repository::Repository;

/// Largest LIMIT both backends accept, for OFFSET without a page size
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// State shared by every repository of one database handle
pub struct StorageContext {
    pub events: Arc<EventEmitter>,
    pub omit: OmitRules,
}

impl StorageContext {
    pub fn new(events: Arc<EventEmitter>, omit: OmitRules) -> Self {
        Self { events, omit }
    }
}

/// Generic repository over a pooled connection or a transaction
pub struct SeaOrmRepository<'c, R, C> {
    conn: &'c C,
    ctx: &'c StorageContext,
    _record: PhantomData<fn() -> R>,
}

impl<'c, R, C> SeaOrmRepository<'c, R, C>
where
    R: Persisted,
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C, ctx: &'c StorageContext) -> Self {
        Self {
            conn,
            ctx,
            _record: PhantomData,
        }
    }

    /// Emit an error event for a failed operation
    fn report<T>(&self, op: &str, result: Result<T, RegistryError>) -> Result<T, RegistryError> {
        if let Err(err) = &result {
            self.ctx
                .events
                .error(R::KIND.as_str(), format!("{op} failed: {err}"));
        }
        result
    }

    fn db_err(err: DbErr) -> RegistryError {
        map_db_err(Some(R::KIND), err)
    }

    fn not_found(key: &R::Key) -> RegistryError {
        RegistryError::not_found(R::KIND.as_str(), key)
    }

    fn select() -> Select<R::Entity> {
        R::Entity::find()
    }

    fn col_expr(column: R::Column) -> SimpleExpr {
        Expr::col((R::Entity::default(), column)).into()
    }

    async fn find_model(&self, key: &R::Key) -> Result<Option<R::Model>, RegistryError> {
        Self::select()
            .filter(R::key_condition(key))
            .one(self.conn)
            .await
            .map_err(Self::db_err)
    }

    async fn find_models(&self, args: &FindManyArgs) -> Result<Vec<R::Model>, RegistryError> {
        let mut condition = build_condition::<R>(args.filter.as_ref())?;
        let order = order_columns::<R>(&args.order_by)?;
        let distinct = args
            .distinct
            .iter()
            .map(|field| resolve_column::<R>(field))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(cursor) = args.cursor {
            let anchor = Self::select()
                .filter(R::id_column().eq(cursor))
                .one(self.conn)
                .await
                .map_err(Self::db_err)?;
            match anchor {
                Some(anchor) => condition = condition.add(cursor_condition::<R>(&anchor, &order)),
                None => return Ok(Vec::new()),
            }
        }

        let mut query = Self::select().filter(condition);
        for (column, direction) in &order {
            query =
                query.order_by_with_nulls(*column, direction.clone(), null_placement(direction));
        }

        if distinct.is_empty() {
            if let Some(skip) = args.skip {
                query = query.offset(skip);
            }
            // SQLite only accepts OFFSET after a LIMIT
            match args.take {
                Some(take) => query = query.limit(take),
                None if args.skip.is_some() => query = query.limit(UNBOUNDED_LIMIT),
                None => {}
            }
            return query.all(self.conn).await.map_err(Self::db_err);
        }

        // Distinct keeps the first row per key in the requested order, then paginates
        let rows = query.all(self.conn).await.map_err(Self::db_err)?;
        let mut seen: HashSet<Vec<Value>> = HashSet::new();
        let unique = rows.into_iter().filter(|model| {
            let key: Vec<Value> = distinct.iter().map(|column| model.get(*column)).collect();
            seen.insert(key)
        });
        let skip = usize::try_from(args.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = args
            .take
            .map_or(usize::MAX, |take| usize::try_from(take).unwrap_or(usize::MAX));
        Ok(unique.skip(skip).take(take).collect())
    }

    fn to_records(models: Vec<R::Model>) -> Result<Vec<R>, RegistryError> {
        models.into_iter().map(R::from_model).collect()
    }

    async fn insert(&self, data: R::Create) -> Result<R, RegistryError> {
        let active = R::new_active(data, Utc::now())?;
        let model = active.insert(self.conn).await.map_err(Self::db_err)?;
        R::from_model(model)
    }

    async fn update_model(&self, model: R::Model, data: R::Update) -> Result<R, RegistryError> {
        let mut active: R::ActiveModel = model.clone().into_active_model();
        R::apply_update(&mut active, data, Utc::now())?;
        if !active.is_changed() {
            return R::from_model(model);
        }
        let updated = active.update(self.conn).await.map_err(Self::db_err)?;
        R::from_model(updated)
    }

    async fn count_where(&self, filter: Option<&Filter>) -> Result<u64, RegistryError> {
        let condition = build_condition::<R>(filter)?;
        Self::select()
            .filter(condition)
            .count(self.conn)
            .await
            .map_err(Self::db_err)
    }

    async fn aggregate_where(
        &self,
        filter: Option<&Filter>,
        field: &str,
    ) -> Result<AggregateSummary, RegistryError> {
        let condition = build_condition::<R>(filter)?;
        let column = resolve_column::<R>(field)?;
        let ty = column_type::<R>(&column);

        let mut query = Self::select()
            .select_only()
            .filter(condition)
            .column_as(count_all(), "agg_count");
        query = summary_columns::<R>(query, column, is_numeric(&ty));

        let backend = self.conn.get_database_backend();
        let row = self
            .conn
            .query_one(query.build(backend))
            .await
            .map_err(Self::db_err)?
            .ok_or_else(|| RegistryError::engine("aggregate returned no row"))?;

        read_summary(&row, Some(&ty)).map_err(Self::db_err)
    }

    async fn group_where(&self, args: GroupByArgs) -> Result<Vec<GroupSummary>, RegistryError> {
        if args.by.is_empty() {
            return Err(RegistryError::validation("group_by needs at least one field"));
        }
        let condition = build_condition::<R>(args.filter.as_ref())?;
        let keys = args
            .by
            .iter()
            .map(|field| {
                resolve_column::<R>(field).map(|column| {
                    let ty = column_type::<R>(&column);
                    (field.clone(), column, ty)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let summarized = match &args.field {
            Some(field) => {
                let column = resolve_column::<R>(field)?;
                let ty = column_type::<R>(&column);
                Some((column, ty))
            }
            None => None,
        };

        let mut query = Self::select().select_only().filter(condition);
        for (i, (_, column, _)) in keys.iter().enumerate() {
            query = query
                .column_as(Self::col_expr(*column), format!("key_{i}"))
                .group_by(*column);
        }
        query = query.column_as(count_all(), "agg_count");
        if let Some((column, ty)) = &summarized {
            query = summary_columns::<R>(query, *column, is_numeric(ty));
        }

        if let Some(having) = &args.having {
            let aggregate = match (having.function, &summarized) {
                (AggregateFn::Count, _) => count_all(),
                (function, Some((column, ty))) => {
                    if matches!(function, AggregateFn::Sum | AggregateFn::Avg) && !is_numeric(ty)
                    {
                        return Err(RegistryError::validation(format!(
                            "having {function:?} needs a numeric field"
                        )));
                    }
                    aggregate_expr::<R>(function, *column)
                }
                (function, None) => {
                    return Err(RegistryError::validation(format!(
                        "having {function:?} needs a summarized field"
                    )))
                }
            };
            let value = having.value;
            let predicate = match having.comparison {
                Comparison::Eq => Expr::expr(aggregate).eq(value),
                Comparison::Ne => Expr::expr(aggregate).ne(value),
                Comparison::Lt => Expr::expr(aggregate).lt(value),
                Comparison::Lte => Expr::expr(aggregate).lte(value),
                Comparison::Gt => Expr::expr(aggregate).gt(value),
                Comparison::Gte => Expr::expr(aggregate).gte(value),
            };
            query = query.having(predicate);
        }

        for (_, column, _) in &keys {
            query = query.order_by(*column, Order::Asc);
        }

        let backend = self.conn.get_database_backend();
        let rows = self
            .conn
            .query_all(query.build(backend))
            .await
            .map_err(Self::db_err)?;

        rows.iter()
            .map(|row| {
                let mut key = BTreeMap::new();
                for (i, (field, _, ty)) in keys.iter().enumerate() {
                    key.insert(field.clone(), decode_value(row, &format!("key_{i}"), ty)?);
                }
                let summary = read_summary(row, summarized.as_ref().map(|(_, ty)| ty))?;
                Ok(GroupSummary { key, summary })
            })
            .collect::<Result<Vec<_>, DbErr>>()
            .map_err(Self::db_err)
    }

    // ===== Relations =====

    /// Rows of `T` related to the row `key` names, in one extra query
    pub async fn related<T>(&self, key: &R::Key) -> Result<Vec<T>, RegistryError>
    where
        T: Persisted,
        R::Entity: Related<T::Entity>,
    {
        let result: Result<Vec<T>, RegistryError> = async {
            let model = self
                .find_model(key)
                .await?
                .ok_or_else(|| Self::not_found(key))?;
            let rows = model
                .find_related(T::Entity::default())
                .all(self.conn)
                .await
                .map_err(Self::db_err)?;
            rows.into_iter().map(T::from_model).collect()
        }
        .await;
        self.report("related", result)
    }

    /// `find_many` with each row's has-many children loaded alongside
    pub async fn find_many_with_children<T>(
        &self,
        args: FindManyArgs,
    ) -> Result<Vec<(R, Vec<T>)>, RegistryError>
    where
        T: Persisted,
        R::Entity: Related<T::Entity>,
    {
        let result: Result<Vec<(R, Vec<T>)>, RegistryError> = async {
            let models = self.find_models(&args).await?;
            let children = models
                .load_many(T::Entity::default(), self.conn)
                .await
                .map_err(Self::db_err)?;
            models
                .into_iter()
                .zip(children)
                .map(|(model, kids)| {
                    Ok((
                        R::from_model(model)?,
                        kids.into_iter()
                            .map(T::from_model)
                            .collect::<Result<Vec<_>, _>>()?,
                    ))
                })
                .collect()
        }
        .await;
        self.report("find_many_with_children", result)
    }

    /// `find_many` with each row's belongs-to parent loaded alongside
    pub async fn find_many_with_parent<T>(
        &self,
        args: FindManyArgs,
    ) -> Result<Vec<(R, Option<T>)>, RegistryError>
    where
        T: Persisted,
        R::Entity: Related<T::Entity>,
    {
        let result: Result<Vec<(R, Option<T>)>, RegistryError> = async {
            let models = self.find_models(&args).await?;
            let parents = models
                .load_one(T::Entity::default(), self.conn)
                .await
                .map_err(Self::db_err)?;
            models
                .into_iter()
                .zip(parents)
                .map(|(model, parent)| {
                    Ok((R::from_model(model)?, parent.map(T::from_model).transpose()?))
                })
                .collect()
        }
        .await;
        self.report("find_many_with_parent", result)
    }
}

fn count_all() -> SimpleExpr {
    Func::count(Expr::col(Asterisk)).into()
}

fn as_double(expr: SimpleExpr) -> SimpleExpr {
    Func::cast_as(expr, sea_orm::sea_query::Alias::new("DOUBLE PRECISION")).into()
}

fn aggregate_expr<R: Persisted>(function: AggregateFn, column: R::Column) -> SimpleExpr {
    let col = Expr::col((R::Entity::default(), column));
    match function {
        AggregateFn::Count => count_all(),
        AggregateFn::Sum => as_double(Func::sum(col).into()),
        AggregateFn::Avg => as_double(Func::avg(col).into()),
        AggregateFn::Min => Func::min(col).into(),
        AggregateFn::Max => Func::max(col).into(),
    }
}

/// Add min/max, and sum/avg for numeric fields, to an aggregate query
fn summary_columns<R: Persisted>(
    query: Select<R::Entity>,
    column: R::Column,
    numeric: bool,
) -> Select<R::Entity> {
    let mut query = query
        .column_as(aggregate_expr::<R>(AggregateFn::Min, column), "agg_min")
        .column_as(aggregate_expr::<R>(AggregateFn::Max, column), "agg_max");
    if numeric {
        query = query
            .column_as(aggregate_expr::<R>(AggregateFn::Sum, column), "agg_sum")
            .column_as(aggregate_expr::<R>(AggregateFn::Avg, column), "agg_avg");
    }
    query
}

fn read_summary(
    row: &QueryResult,
    ty: Option<&sea_orm::sea_query::ColumnType>,
) -> Result<AggregateSummary, DbErr> {
    let count = row.try_get::<i64>("", "agg_count")?;
    let mut summary = AggregateSummary {
        count: u64::try_from(count).unwrap_or(0),
        ..AggregateSummary::default()
    };
    if let Some(ty) = ty {
        summary.min = decode_value(row, "agg_min", ty)?;
        summary.max = decode_value(row, "agg_max", ty)?;
        if is_numeric(ty) {
            summary.sum = row.try_get::<Option<f64>>("", "agg_sum")?;
            summary.avg = row.try_get::<Option<f64>>("", "agg_avg")?;
        }
    }
    Ok(summary)
}

#[async_trait]
impl<'c, R, C> Repository<R> for SeaOrmRepository<'c, R, C>
where
    R: Persisted,
    C: ConnectionTrait,
{
    async fn find_unique(&self, key: &R::Key) -> Result<Option<R>, RegistryError> {
        let result = match self.find_model(key).await {
            Ok(Some(model)) => R::from_model(model).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        self.report("find_unique", result)
    }

    async fn find_many(&self, args: FindManyArgs) -> Result<Vec<R>, RegistryError> {
        let result = match self.find_models(&args).await {
            Ok(models) => Self::to_records(models),
            Err(err) => Err(err),
        };
        self.report("find_many", result)
    }

    async fn create(&self, data: R::Create) -> Result<R, RegistryError> {
        let result = self.insert(data).await;
        self.report("create", result)
    }

    async fn create_many(&self, data: Vec<R::Create>) -> Result<u64, RegistryError> {
        if data.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let result: Result<u64, RegistryError> = async {
            let actives = data
                .into_iter()
                .map(|item| R::new_active(item, now))
                .collect::<Result<Vec<_>, _>>()?;
            R::Entity::insert_many(actives)
                .exec_without_returning(self.conn)
                .await
                .map_err(Self::db_err)
        }
        .await;
        self.report("create_many", result)
    }

    async fn update(&self, key: &R::Key, data: R::Update) -> Result<R, RegistryError> {
        let result: Result<R, RegistryError> = async {
            let model = self
                .find_model(key)
                .await?
                .ok_or_else(|| Self::not_found(key))?;
            self.update_model(model, data).await
        }
        .await;
        self.report("update", result)
    }

    async fn update_many(
        &self,
        filter: Option<Filter>,
        data: R::Update,
    ) -> Result<u64, RegistryError> {
        let result: Result<u64, RegistryError> = async {
            let condition = build_condition::<R>(filter.as_ref())?;
            let mut active = <R::ActiveModel as ActiveModelBehavior>::new();
            R::apply_update(&mut active, data, Utc::now())?;
            if !active.is_changed() {
                return self.count_where(filter.as_ref()).await;
            }
            R::Entity::update_many()
                .set(active)
                .filter(condition)
                .exec(self.conn)
                .await
                .map(|res| res.rows_affected)
                .map_err(Self::db_err)
        }
        .await;
        self.report("update_many", result)
    }

    async fn delete(&self, key: &R::Key) -> Result<R, RegistryError> {
        let result: Result<R, RegistryError> = async {
            let model = self
                .find_model(key)
                .await?
                .ok_or_else(|| Self::not_found(key))?;
            let record = R::from_model(model)?;
            let deleted = R::Entity::delete_many()
                .filter(R::id_column().eq(record.id()))
                .exec(self.conn)
                .await
                .map_err(Self::db_err)?;
            if deleted.rows_affected == 0 {
                return Err(Self::not_found(key));
            }
            Ok(record)
        }
        .await;
        self.report("delete", result)
    }

    async fn delete_many(&self, filter: Option<Filter>) -> Result<u64, RegistryError> {
        let result: Result<u64, RegistryError> = async {
            let condition = build_condition::<R>(filter.as_ref())?;
            R::Entity::delete_many()
                .filter(condition)
                .exec(self.conn)
                .await
                .map(|res| res.rows_affected)
                .map_err(Self::db_err)
        }
        .await;
        self.report("delete_many", result)
    }

    async fn upsert(
        &self,
        key: &R::Key,
        create: R::Create,
        update: R::Update,
    ) -> Result<R, RegistryError> {
        let result: Result<R, RegistryError> = async {
            match self.find_model(key).await? {
                Some(model) => self.update_model(model, update).await,
                None => self.insert(create).await,
            }
        }
        .await;
        self.report("upsert", result)
    }

    async fn count(&self, filter: Option<Filter>) -> Result<u64, RegistryError> {
        let result = self.count_where(filter.as_ref()).await;
        self.report("count", result)
    }

    async fn aggregate(
        &self,
        filter: Option<Filter>,
        field: &str,
    ) -> Result<AggregateSummary, RegistryError> {
        let result = self.aggregate_where(filter.as_ref(), field).await;
        self.report("aggregate", result)
    }

    async fn group_by(&self, args: GroupByArgs) -> Result<Vec<GroupSummary>, RegistryError> {
        let result = self.group_where(args).await;
        self.report("group_by", result)
    }

    async fn find_many_shaped(
        &self,
        args: FindManyArgs,
        selection: Selection,
    ) -> Result<Vec<Map<String, serde_json::Value>>, RegistryError> {
        let result: Result<Vec<Map<String, serde_json::Value>>, RegistryError> = async {
            let records = Self::to_records(self.find_models(&args).await?)?;
            shape(records, &self.ctx.omit, &selection)
        }
        .await;
        self.report("find_many_shaped", result)
    }
}
