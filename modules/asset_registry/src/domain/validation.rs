//! Field definitions and asset property validation
//!
//! A sub-category's `field_definitions` document lists the properties its
//! assets carry. The definitions compile to a JSON Schema that asset
//! `properties` are checked against.

use crate::contract::RegistryError;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Value type of a defined property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    /// ISO 8601 date, optionally with a time part
    Date,
    Boolean,
    /// One of `options`
    Select,
}

/// One entry of a sub-category's `field_definitions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(alias = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:\d{2})?)?$";

/// Parse and check a `field_definitions` document
pub fn parse_field_definitions(document: &Value) -> Result<Vec<FieldDefinition>, RegistryError> {
    if !document.is_array() {
        return Err(RegistryError::validation(
            "field_definitions must be a JSON array",
        ));
    }
    let definitions: Vec<FieldDefinition> = serde_json::from_value(document.clone())
        .map_err(|e| RegistryError::validation(format!("invalid field_definitions: {e}")))?;

    let mut seen = HashSet::new();
    for def in &definitions {
        if def.name.trim().is_empty() {
            return Err(RegistryError::validation("field name cannot be empty"));
        }
        if !seen.insert(def.name.as_str()) {
            return Err(RegistryError::validation(format!(
                "field '{}' is defined more than once",
                def.name
            )));
        }
        match (def.kind, &def.options) {
            (FieldKind::Select, None) => {
                return Err(RegistryError::validation(format!(
                    "select field '{}' needs options",
                    def.name
                )))
            }
            (FieldKind::Select, Some(options)) if options.is_empty() => {
                return Err(RegistryError::validation(format!(
                    "select field '{}' needs at least one option",
                    def.name
                )))
            }
            (FieldKind::Select, Some(_)) | (_, None) => {}
            (_, Some(_)) => {
                return Err(RegistryError::validation(format!(
                    "only select fields take options, '{}' is {:?}",
                    def.name, def.kind
                )))
            }
        }
    }
    Ok(definitions)
}

/// JSON Schema accepted `properties` documents must satisfy
pub fn properties_schema(definitions: &[FieldDefinition]) -> Value {
    let mut properties = Map::new();
    for def in definitions {
        let schema = match def.kind {
            FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Number => json!({ "type": "number" }),
            FieldKind::Date => json!({ "type": "string", "pattern": DATE_PATTERN }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Select => json!({ "enum": def.options.clone().unwrap_or_default() }),
        };
        properties.insert(def.name.clone(), schema);
    }
    let required: Vec<&str> = definitions
        .iter()
        .filter(|def| def.required)
        .map(|def| def.name.as_str())
        .collect();

    // No definitions means the sub-category does not constrain its assets
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": definitions.is_empty(),
    })
}

/// Check an asset's `properties` against its sub-category's definitions
pub fn validate_properties(
    properties: &Value,
    definitions: &[FieldDefinition],
) -> Result<(), RegistryError> {
    let schema = properties_schema(definitions);
    let validator = Validator::new(&schema)
        .map_err(|e| RegistryError::engine(format!("invalid properties schema: {e}")))?;

    let errors: Vec<String> = validator
        .iter_errors(properties)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            }
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::validation(format!(
            "invalid asset properties: {}",
            errors.join("; ")
        )))
    }
}
