//! Query arguments shared by every repository
//!
//! Field names are column names (`sub_category_id` or `subCategoryId`);
//! they are resolved against the entity when the query runs, so an unknown
//! name surfaces as a validation error rather than a database error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Typed scalar used in filters, cursors, group keys and min/max results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl FilterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Per-field predicate
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Equals(FilterValue),
    NotEquals(FilterValue),
    Lt(FilterValue),
    Lte(FilterValue),
    Gt(FilterValue),
    Gte(FilterValue),
    In(Vec<FilterValue>),
    NotIn(Vec<FilterValue>),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

/// Boolean filter tree over scalar fields
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Field { field: String, op: FieldOp },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn field(field: impl Into<String>, op: FieldOp) -> Self {
        Self::Field {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Equals(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::NotEquals(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Lte(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::field(field, FieldOp::Gte(value.into()))
    }

    pub fn is_in<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::field(field, FieldOp::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::field(
            field,
            FieldOp::NotIn(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::field(field, FieldOp::Contains(needle.into()))
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::field(field, FieldOp::StartsWith(prefix.into()))
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::field(field, FieldOp::EndsWith(suffix.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::field(field, FieldOp::IsNull)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::field(field, FieldOp::IsNotNull)
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Arguments of `find_many`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    /// Id of the row the page starts at (inclusive)
    pub cursor: Option<Uuid>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
    /// Keep only the first row per distinct combination of these fields
    pub distinct: Vec<String>,
}

impl FindManyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn cursor(mut self, id: Uuid) -> Self {
        self.cursor = Some(id);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn distinct<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.distinct = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Field projection for shaped results.
///
/// `select` and `omit` are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Only these fields; re-includes fields omitted by configuration
    pub select: Option<Vec<String>>,
    /// Extra fields to drop on top of the configured omissions
    pub omit: Option<Vec<String>>,
}

impl Selection {
    pub fn select<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            select: Some(fields.into_iter().map(Into::into).collect()),
            omit: None,
        }
    }

    pub fn omit<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            select: None,
            omit: Some(fields.into_iter().map(Into::into).collect()),
        }
    }
}

/// Numeric and ordering summary of one field over the filtered rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSummary {
    /// Number of matching rows
    pub count: u64,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
    pub min: Option<FilterValue>,
    pub max: Option<FilterValue>,
}

/// Aggregate a `having` clause compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Post-grouping predicate: `<function>(<aggregate field>) <cmp> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub function: AggregateFn,
    pub comparison: Comparison,
    pub value: f64,
}

impl Having {
    pub fn new(function: AggregateFn, comparison: Comparison, value: f64) -> Self {
        Self {
            function,
            comparison,
            value,
        }
    }
}

/// Arguments of `group_by`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupByArgs {
    pub by: Vec<String>,
    pub filter: Option<Filter>,
    /// Field summarised per group; only `count` is computed without it
    pub field: Option<String>,
    pub having: Option<Having>,
}

impl GroupByArgs {
    pub fn by<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            by: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn summarize(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn having(mut self, having: Having) -> Self {
        self.having = Some(having);
        self
    }
}

/// One row of a `group_by` result
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    /// Group key, by field name; `None` groups rows where the field is null
    pub key: BTreeMap<String, Option<FilterValue>>,
    pub summary: AggregateSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose_filters() {
        let filter = Filter::and([
            Filter::eq("status", "ACTIVE"),
            Filter::not(Filter::is_null("purchase_order_id")),
        ]);
        match filter {
            Filter::And(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(
                    parts[0],
                    Filter::Field {
                        field: "status".to_string(),
                        op: FieldOp::Equals(FilterValue::Text("ACTIVE".to_string()))
                    }
                );
                assert!(matches!(parts[1], Filter::Not(_)));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn selection_constructors_are_exclusive() {
        let select = Selection::select(["id", "username"]);
        assert!(select.omit.is_none());
        let omit = Selection::omit(["password"]);
        assert!(omit.select.is_none());
    }

    #[test]
    fn numeric_values_widen_to_f64() {
        assert_eq!(FilterValue::from(3).as_f64(), Some(3.0));
        assert_eq!(FilterValue::from(2.5).as_f64(), Some(2.5));
        assert_eq!(FilterValue::from("x").as_f64(), None);
    }
}
