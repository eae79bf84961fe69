//! Config validation: kind uniqueness and bounds that fit the declared type.
//! Name and range checks happen when the schema itself is built.

use crate::config::{PropertyConfig, PropertyType, SchemaConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(configs: &[SchemaConfig]) -> Result<(), ConfigError> {
    let mut kinds = HashSet::new();
    for schema in configs {
        if !kinds.insert(schema.kind.as_str()) {
            return Err(ConfigError::DuplicateKind(schema.kind.clone()));
        }
        for prop in &schema.properties {
            if let Some(bound) = misplaced_bound(prop) {
                return Err(ConfigError::InvalidSchema {
                    kind: schema.kind.clone(),
                    reason: format!(
                        "property '{}': {} does not apply to {} properties",
                        prop.name,
                        bound,
                        prop.type_.as_str()
                    ),
                });
            }
        }
    }
    Ok(())
}

fn misplaced_bound(prop: &PropertyConfig) -> Option<&'static str> {
    let length = [("min_length", prop.min_length.is_some()), ("max_length", prop.max_length.is_some())];
    let value = [("min_value", prop.min_value.is_some()), ("max_value", prop.max_value.is_some())];
    let forbidden: Vec<(&'static str, bool)> = match prop.type_ {
        PropertyType::String => value.to_vec(),
        PropertyType::Integer => length.to_vec(),
        PropertyType::Key => length.iter().chain(value.iter()).copied().collect(),
    };
    forbidden.into_iter().find(|(_, set)| *set).map(|(name, _)| name)
}
