//! Field projection for shaped results
//!
//! Records are serialized to JSON objects and trimmed by the configured
//! omissions and the per-query [`Selection`].

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

use super::filter::resolve_column;
use super::mapper::Persisted;
use crate::contract::{
    Asset, AuditLog, Category, EntityKind, LineItem, MaintenanceRecord, PurchaseOrder,
    RegistryError, Selection, SubCategory, User, Vendor,
};
use sea_orm::IdenStatic;

/// Fields hidden from shaped results unless explicitly selected, per entity
#[derive(Debug, Clone, Default)]
pub struct OmitRules {
    rules: HashMap<EntityKind, BTreeSet<String>>,
}

impl OmitRules {
    /// Validate a configured `entity -> fields` map
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> Result<Self, RegistryError> {
        let mut rules = HashMap::new();
        for (entity, fields) in config {
            let kind: EntityKind = entity.parse()?;
            let normalized = match kind {
                EntityKind::User => normalize::<User>(fields)?,
                EntityKind::Category => normalize::<Category>(fields)?,
                EntityKind::SubCategory => normalize::<SubCategory>(fields)?,
                EntityKind::Asset => normalize::<Asset>(fields)?,
                EntityKind::MaintenanceRecord => normalize::<MaintenanceRecord>(fields)?,
                EntityKind::Vendor => normalize::<Vendor>(fields)?,
                EntityKind::PurchaseOrder => normalize::<PurchaseOrder>(fields)?,
                EntityKind::LineItem => normalize::<LineItem>(fields)?,
                EntityKind::AuditLog => normalize::<AuditLog>(fields)?,
            };
            rules.insert(kind, normalized);
        }
        Ok(Self { rules })
    }

    pub fn fields(&self, kind: EntityKind) -> Option<&BTreeSet<String>> {
        self.rules.get(&kind)
    }
}

/// Column names of `R` for the given fields, in storage spelling
fn normalize<R: Persisted>(fields: &[String]) -> Result<BTreeSet<String>, RegistryError> {
    fields
        .iter()
        .map(|field| resolve_column::<R>(field).map(|column| column.as_str().to_string()))
        .collect()
}

/// Serialize records and apply omissions
pub(crate) fn shape<R: Persisted>(
    records: Vec<R>,
    rules: &OmitRules,
    selection: &Selection,
) -> Result<Vec<Map<String, Value>>, RegistryError> {
    if selection.select.is_some() && selection.omit.is_some() {
        return Err(RegistryError::validation(
            "select and omit cannot be combined in one query",
        ));
    }

    let keep = match &selection.select {
        Some(fields) => Some(normalize::<R>(fields)?),
        None => None,
    };
    let mut drop = rules.fields(R::KIND).cloned().unwrap_or_default();
    if let Some(fields) = &selection.omit {
        drop.extend(normalize::<R>(fields)?);
    }

    records
        .into_iter()
        .map(|record| {
            let object = match serde_json::to_value(&record) {
                Ok(Value::Object(object)) => object,
                Ok(_) => {
                    return Err(RegistryError::engine(format!(
                        "{} did not serialize to an object",
                        R::KIND
                    )))
                }
                Err(e) => return Err(RegistryError::engine(e.to_string())),
            };
            Ok(object
                .into_iter()
                .filter(|(name, _)| match &keep {
                    Some(keep) => keep.contains(name),
                    None => !drop.contains(name),
                })
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ErrorKind, Role};
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "asha".to_string(),
            password: "hash".to_string(),
            name: "Asha".to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn rules() -> OmitRules {
        let config = HashMap::from([("user".to_string(), vec!["password".to_string()])]);
        OmitRules::from_config(&config).unwrap()
    }

    #[test]
    fn configured_fields_are_omitted() {
        let rows = shape(vec![user()], &rules(), &Selection::default()).unwrap();
        assert!(!rows[0].contains_key("password"));
        assert_eq!(rows[0]["role"], "ADMIN");
    }

    #[test]
    fn select_reincludes_omitted_fields() {
        let rows = shape(
            vec![user()],
            &rules(),
            &Selection::select(["username", "password"]),
        )
        .unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["password"], "hash");
    }

    #[test]
    fn per_query_omit_accepts_camel_case() {
        let rows = shape(vec![user()], &rules(), &Selection::omit(["createdAt"])).unwrap();
        assert!(!rows[0].contains_key("created_at"));
        assert!(!rows[0].contains_key("password"));
        assert!(rows[0].contains_key("updated_at"));
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let both = Selection {
            select: Some(vec!["id".to_string()]),
            omit: Some(vec!["name".to_string()]),
        };
        let err = shape(vec![user()], &rules(), &both).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = shape(vec![user()], &rules(), &Selection::omit(["nickname"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn config_with_unknown_entity_is_rejected() {
        let config = HashMap::from([("invoice".to_string(), vec!["id".to_string()])]);
        assert!(OmitRules::from_config(&config).is_err());
    }
}
