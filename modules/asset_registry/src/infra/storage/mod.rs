//! Storage layer - database entities and repositories

pub mod entity;
pub mod filter;
pub mod mapper;
pub mod migrations;
pub mod raw;
pub mod repositories;
pub mod shape;

pub use mapper::Persisted;
pub use raw::RawStatement;
pub use repositories::{SeaOrmRepository, StorageContext};

use crate::contract::{EntityKind, RegistryError};
use sea_orm::{sqlx, DbErr, RuntimeErr, SqlErr};

/// Translate a SeaORM error into the registry taxonomy
pub(crate) fn map_db_err(entity: Option<EntityKind>, err: DbErr) -> RegistryError {
    let entity_name = entity.map_or("query", |kind| kind.as_str());

    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            return RegistryError::ConstraintViolation {
                entity: entity_name.to_string(),
                detail: format!("unique constraint: {detail}"),
            };
        }
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            return RegistryError::ConstraintViolation {
                entity: entity_name.to_string(),
                detail: format!("foreign key constraint: {detail}"),
            };
        }
        _ => {}
    }

    if let Some(code) = restrict_violation(&err) {
        return RegistryError::ConstraintViolation {
            entity: entity_name.to_string(),
            detail: format!("foreign key constraint (code {code}): {err}"),
        };
    }

    match err {
        DbErr::RecordNotFound(key) => RegistryError::not_found(entity_name, key),
        DbErr::RecordNotUpdated => RegistryError::not_found(entity_name, "record to update"),
        DbErr::Conn(e) => RegistryError::Connection {
            message: e.to_string(),
        },
        DbErr::ConnectionAcquire(e) => RegistryError::Connection {
            message: e.to_string(),
        },
        other => RegistryError::engine(other.to_string()),
    }
}

/// RESTRICT violations carry their own codes on SQLite (1811) and Postgres (23001)
fn restrict_violation(err: &DbErr) -> Option<String> {
    let db_err = match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => e,
        _ => return None,
    };
    db_err
        .code()
        .filter(|code| matches!(code.as_ref(), "1811" | "23001"))
        .map(|code| code.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ErrorKind;

    #[test]
    fn record_errors_become_not_found() {
        let err = map_db_err(Some(EntityKind::Asset), DbErr::RecordNotUpdated);
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = map_db_err(
            Some(EntityKind::Vendor),
            DbErr::RecordNotFound("id=1".to_string()),
        );
        assert_eq!(err.to_string(), "vendor not found: id=1");
    }

    #[test]
    fn unclassified_errors_are_engine_errors() {
        let err = map_db_err(None, DbErr::Custom("boom".to_string()));
        assert_eq!(err.kind(), ErrorKind::Engine);
    }
}
