//! Filter, ordering and cursor translation
//!
//! Turns contract query arguments into SeaORM conditions for one entity.
//! Field names are resolved through the entity's column enum, and filter
//! values are coerced to the column's declared type before they reach SQL.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{ColumnType, NullOrdering};
use sea_orm::{
    ColumnTrait, Condition, DbErr, IdenStatic, ModelTrait, Order, QueryResult, Value,
};
use std::str::FromStr;
use uuid::Uuid;

use super::mapper::Persisted;
use crate::contract::{FieldOp, Filter, FilterValue, OrderBy, RegistryError, SortOrder};

/// Resolve a snake_case or camelCase field name to a column of `R`
pub(crate) fn resolve_column<R: Persisted>(field: &str) -> Result<R::Column, RegistryError> {
    R::Column::from_str(field).map_err(|_| {
        RegistryError::validation(format!("unknown field '{field}' on {}", R::KIND))
    })
}

pub(crate) fn column_type<R: Persisted>(column: &R::Column) -> ColumnType {
    column.def().get_column_type().clone()
}

/// Build the WHERE condition for an optional filter; `None` matches every row
pub(crate) fn build_condition<R: Persisted>(
    filter: Option<&Filter>,
) -> Result<Condition, RegistryError> {
    match filter {
        None => Ok(Condition::all()),
        Some(filter) => translate::<R>(filter),
    }
}

fn translate<R: Persisted>(filter: &Filter) -> Result<Condition, RegistryError> {
    match filter {
        Filter::Field { field, op } => field_condition::<R>(field, op),
        Filter::And(parts) => parts
            .iter()
            .try_fold(Condition::all(), |cond, part| Ok(cond.add(translate::<R>(part)?))),
        Filter::Or(parts) => parts
            .iter()
            .try_fold(Condition::any(), |cond, part| Ok(cond.add(translate::<R>(part)?))),
        Filter::Not(inner) => Ok(Condition::all().add(translate::<R>(inner)?).not()),
    }
}

fn field_condition<R: Persisted>(field: &str, op: &FieldOp) -> Result<Condition, RegistryError> {
    let column = resolve_column::<R>(field)?;
    let ty = column_type::<R>(&column);
    let value = |v: &FilterValue| coerce_value(field, &ty, v);

    let expr = match op {
        FieldOp::Equals(v) => column.eq(value(v)?),
        FieldOp::NotEquals(v) => column.ne(value(v)?),
        FieldOp::Lt(v) => column.lt(value(v)?),
        FieldOp::Lte(v) => column.lte(value(v)?),
        FieldOp::Gt(v) => column.gt(value(v)?),
        FieldOp::Gte(v) => column.gte(value(v)?),
        FieldOp::In(values) => {
            column.is_in(values.iter().map(value).collect::<Result<Vec<_>, _>>()?)
        }
        FieldOp::NotIn(values) => {
            column.is_not_in(values.iter().map(value).collect::<Result<Vec<_>, _>>()?)
        }
        FieldOp::Contains(needle) => {
            require_text(field, &ty, "contains")?;
            column.contains(needle.as_str())
        }
        FieldOp::StartsWith(prefix) => {
            require_text(field, &ty, "starts_with")?;
            column.starts_with(prefix.as_str())
        }
        FieldOp::EndsWith(suffix) => {
            require_text(field, &ty, "ends_with")?;
            column.ends_with(suffix.as_str())
        }
        FieldOp::IsNull => column.is_null(),
        FieldOp::IsNotNull => column.is_not_null(),
    };

    Ok(Condition::all().add(expr))
}

fn is_text(ty: &ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_)
    )
}

fn is_timestamp(ty: &ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::TimestampWithTimeZone | ColumnType::Timestamp | ColumnType::DateTime
    )
}

pub(crate) fn is_numeric(ty: &ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::SmallInteger
            | ColumnType::Double
            | ColumnType::Float
    )
}

fn require_text(field: &str, ty: &ColumnType, op: &str) -> Result<(), RegistryError> {
    if is_text(ty) {
        Ok(())
    } else {
        Err(RegistryError::validation(format!(
            "operator '{op}' needs a text field, '{field}' is not one"
        )))
    }
}

/// Coerce a filter value to the column's declared type
pub(crate) fn coerce_value(
    field: &str,
    ty: &ColumnType,
    value: &FilterValue,
) -> Result<Value, RegistryError> {
    let mismatch = || {
        RegistryError::validation(format!(
            "value {value:?} does not fit field '{field}' ({ty:?})"
        ))
    };

    match (ty, value) {
        (ColumnType::Uuid, FilterValue::Uuid(id)) => Ok((*id).into()),
        (ColumnType::Uuid, FilterValue::Text(raw)) => Uuid::parse_str(raw)
            .map(Into::into)
            .map_err(|_| mismatch()),
        (ty, FilterValue::Text(text)) if is_text(ty) => Ok(text.clone().into()),
        (ty, FilterValue::Uuid(id)) if is_text(ty) => Ok(id.to_string().into()),
        (ColumnType::Integer | ColumnType::SmallInteger, FilterValue::Int(v)) => {
            i32::try_from(*v).map(Into::into).map_err(|_| mismatch())
        }
        (ColumnType::BigInteger, FilterValue::Int(v)) => Ok((*v).into()),
        (ColumnType::Double | ColumnType::Float, FilterValue::Int(_) | FilterValue::Float(_)) => {
            value.as_f64().map(Into::into).ok_or_else(mismatch)
        }
        (ty, FilterValue::DateTime(at)) if is_timestamp(ty) => Ok((*at).into()),
        (ty, FilterValue::Text(raw)) if is_timestamp(ty) => DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc).into())
            .map_err(|_| mismatch()),
        (ColumnType::Boolean, FilterValue::Bool(v)) => Ok((*v).into()),
        _ => Err(mismatch()),
    }
}

/// Resolve the requested ordering and append the `id` tiebreaker
pub(crate) fn order_columns<R: Persisted>(
    order_by: &[OrderBy],
) -> Result<Vec<(R::Column, Order)>, RegistryError> {
    let id = R::id_column();
    let mut columns = Vec::with_capacity(order_by.len() + 1);
    for order in order_by {
        let column = resolve_column::<R>(&order.field)?;
        let direction = match order.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        columns.push((column, direction));
    }
    if !columns.iter().any(|(column, _)| column.as_str() == id.as_str()) {
        columns.push((id, Order::Asc));
    }
    Ok(columns)
}

fn is_null_value(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Uuid(None)
            | Value::ChronoDateTimeUtc(None)
    )
}

fn equal_to<C: ColumnTrait>(column: C, value: Value) -> Condition {
    if is_null_value(&value) {
        Condition::all().add(column.is_null())
    } else {
        Condition::all().add(column.eq(value))
    }
}

/// Null placement for a sort direction; nulls always compare lowest
pub(crate) fn null_placement(direction: &Order) -> NullOrdering {
    match direction {
        Order::Desc => NullOrdering::Last,
        _ => NullOrdering::First,
    }
}

/// Rows strictly past `value` in one column, or `None` when nothing sorts after it
fn past<C: ColumnTrait>(column: C, direction: &Order, value: Value) -> Option<Condition> {
    match (direction, is_null_value(&value)) {
        (Order::Desc, true) => None,
        (Order::Desc, false) => Some(
            Condition::any()
                .add(column.lt(value))
                .add(column.is_null()),
        ),
        (_, true) => Some(Condition::all().add(column.is_not_null())),
        (_, false) => Some(Condition::all().add(column.gt(value))),
    }
}

/// Rows at or after the cursor row in the given ordering.
///
/// Builds `past(c1) OR (c1 = v1 AND past(c2)) OR ... (... AND id >= v_id)`,
/// with nulls placed as [`null_placement`] orders them.
pub(crate) fn cursor_condition<R: Persisted>(
    cursor: &R::Model,
    order: &[(R::Column, Order)],
) -> Condition {
    let mut any = Condition::any();
    for (i, (column, direction)) in order.iter().enumerate() {
        let value = cursor.get(*column);
        let step = if i + 1 == order.len() {
            // The last column also admits the cursor row itself
            let equal = equal_to(*column, value.clone());
            match past(*column, direction, value) {
                Some(after) => Condition::any().add(after).add(equal),
                None => equal,
            }
        } else {
            match past(*column, direction, value) {
                Some(after) => after,
                None => continue,
            }
        };

        let mut branch = Condition::all();
        for (prefix, _) in &order[..i] {
            branch = branch.add(equal_to(*prefix, cursor.get(*prefix)));
        }
        any = any.add(branch.add(step));
    }
    any
}

/// Read one aliased scalar from an aggregate row, typed after the source column
pub(crate) fn decode_value(
    row: &QueryResult,
    alias: &str,
    ty: &ColumnType,
) -> Result<Option<FilterValue>, DbErr> {
    let value = match ty {
        ColumnType::Uuid => row.try_get::<Option<Uuid>>("", alias)?.map(FilterValue::Uuid),
        ColumnType::Integer | ColumnType::SmallInteger => {
            row.try_get::<Option<i32>>("", alias)?.map(FilterValue::from)
        }
        ColumnType::BigInteger => row.try_get::<Option<i64>>("", alias)?.map(FilterValue::Int),
        ColumnType::Double | ColumnType::Float => {
            row.try_get::<Option<f64>>("", alias)?.map(FilterValue::Float)
        }
        ColumnType::Boolean => row.try_get::<Option<bool>>("", alias)?.map(FilterValue::Bool),
        ty if is_timestamp(ty) => row
            .try_get::<Option<DateTime<Utc>>>("", alias)?
            .map(FilterValue::DateTime),
        _ => row.try_get::<Option<String>>("", alias)?.map(FilterValue::Text),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Asset, ErrorKind, MaintenanceRecord};
    use crate::infra::storage::entity::asset;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn render(cond: Condition) -> String {
        asset::Entity::find()
            .filter(cond)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn resolves_snake_and_camel_names() {
        assert!(resolve_column::<Asset>("sub_category_id").is_ok());
        assert!(resolve_column::<Asset>("subCategoryId").is_ok());
        let err = resolve_column::<Asset>("colour").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn builds_nested_conditions() {
        let filter = Filter::and([
            Filter::eq("status", "ACTIVE"),
            Filter::not(Filter::is_null("purchase_order_id")),
        ]);
        let sql = render(build_condition::<Asset>(Some(&filter)).unwrap());
        assert!(sql.contains("'ACTIVE'"), "{sql}");
        assert!(sql.contains("NOT"), "{sql}");
        assert!(sql.contains("IS NULL"), "{sql}");
    }

    #[test]
    fn text_operators_require_text_columns() {
        let filter = Filter::contains("cost", "1");
        let err = build_condition::<MaintenanceRecord>(Some(&filter)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let filter = Filter::starts_with("issue_type", "Scr");
        assert!(build_condition::<MaintenanceRecord>(Some(&filter)).is_ok());
    }

    #[test]
    fn coerces_values_to_column_types() {
        let id = Uuid::new_v4();
        assert_eq!(
            coerce_value("id", &ColumnType::Uuid, &FilterValue::Text(id.to_string())).unwrap(),
            Value::from(id)
        );
        assert_eq!(
            coerce_value("cost", &ColumnType::Double, &FilterValue::Int(3)).unwrap(),
            Value::from(3.0_f64)
        );
        assert!(coerce_value("id", &ColumnType::Uuid, &FilterValue::Text("x".into())).is_err());
        assert!(coerce_value("quantity", &ColumnType::Integer, &FilterValue::Float(1.5)).is_err());
        assert!(coerce_value(
            "created_at",
            &ColumnType::TimestampWithTimeZone,
            &FilterValue::Text("2024-01-01T00:00:00Z".into())
        )
        .is_ok());
    }

    #[test]
    fn ordering_always_ends_with_id() {
        let order = order_columns::<Asset>(&[OrderBy::desc("created_at")]).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[1].0.as_str(), "id");

        let order = order_columns::<Asset>(&[OrderBy::desc("id")]).unwrap();
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].1, Order::Desc);
    }
}
