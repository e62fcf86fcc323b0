//! Raw SQL escape hatch
//!
//! [`RawStatement`] only accepts `'static` SQL text, so values must travel as
//! bound parameters. The `*_unsafe` entry points on the database handle take
//! runtime-built SQL; keeping that text injection-free is the caller's job.
//! Placeholder syntax is the backend's own (`$1` on Postgres, `?` on SQLite).

use sea_orm::{ConnectionTrait, FromQueryResult, JsonValue, Statement, Value};
use serde_json::Map;

use super::map_db_err;
use super::repositories::StorageContext;
use crate::contract::RegistryError;

/// SQL text fixed at compile time plus positional values
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement {
    sql: &'static str,
    values: Vec<Value>,
}

impl RawStatement {
    pub fn new<V: Into<Value>>(sql: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            sql,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Statement without parameters
    pub fn plain(sql: &'static str) -> Self {
        Self {
            sql,
            values: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        self.sql
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql.to_string(), self.values)
    }
}

fn statement<C: ConnectionTrait>(conn: &C, sql: String, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(conn.get_database_backend(), sql, values)
}

/// Run a statement and return the number of affected rows
pub(crate) async fn execute<C: ConnectionTrait>(
    conn: &C,
    ctx: &StorageContext,
    sql: String,
    values: Vec<Value>,
) -> Result<u64, RegistryError> {
    let result = conn
        .execute(statement(conn, sql, values))
        .await
        .map(|res| res.rows_affected())
        .map_err(|e| map_db_err(None, e));
    if let Err(err) = &result {
        ctx.events.error("raw", format!("execute_raw failed: {err}"));
    }
    result
}

/// Run a query and return each row as a JSON object keyed by column name
pub(crate) async fn query<C: ConnectionTrait>(
    conn: &C,
    ctx: &StorageContext,
    sql: String,
    values: Vec<Value>,
) -> Result<Vec<Map<String, JsonValue>>, RegistryError> {
    let result = async {
        let rows = JsonValue::find_by_statement(statement(conn, sql, values))
            .all(conn)
            .await
            .map_err(|e| map_db_err(None, e))?;
        rows.into_iter()
            .map(|row| match row {
                JsonValue::Object(object) => Ok(object),
                other => Err(RegistryError::engine(format!(
                    "raw row did not decode to an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
    }
    .await;
    if let Err(err) = &result {
        ctx.events.error("raw", format!("query_raw failed: {err}"));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_keeps_values_in_order() {
        let stmt = RawStatement::new(
            "UPDATE vendors SET name = $1 WHERE gstin = $2",
            ["Acme", "GST-1"],
        );
        let (sql, values) = stmt.into_parts();
        assert!(sql.starts_with("UPDATE vendors"));
        assert_eq!(values, vec![Value::from("Acme"), Value::from("GST-1")]);
    }
}
