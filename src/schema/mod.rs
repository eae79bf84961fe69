//! Entity schemas: an ordered, explicitly declared set of properties for one kind.

mod property;

pub use property::{Property, PropertyKind};

use crate::error::{ApiError, ConfigError, ValidationError};
use crate::store::Key;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Wire field carrying the entity kind.
pub const TYPE_FIELD: &str = "_type";
/// Wire field carrying the primary key of a saved entity.
pub const KEY_FIELD: &str = "_key";

/// Names starting with `_` belong to the wire envelope, not to properties.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('_')
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySchema {
    kind: String,
    properties: Vec<(String, Property)>,
}

impl EntitySchema {
    pub fn builder(kind: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            kind: kind.into(),
            properties: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    fn check_unknown(&self, values: &Map<String, Value>) -> Result<(), ValidationError> {
        let unknown: Vec<String> = values.keys().filter(|k| !self.contains(k)).cloned().collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::UnknownFields(unknown))
        }
    }

    /// Validate a full set of values: unknown names are rejected together,
    /// then every declared property is checked in order with absent
    /// treated as null. Returns the accepted values in schema order.
    pub fn validate_all(&self, mut values: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        self.check_unknown(&values)?;
        let mut out = Map::new();
        for (name, prop) in &self.properties {
            let value = values.remove(name).unwrap_or(Value::Null);
            out.insert(name.clone(), prop.validate(name, value)?);
        }
        Ok(out)
    }

    /// Validate only the supplied values. Unknown names are rejected together.
    pub fn validate_partial(&self, values: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        self.check_unknown(&values)?;
        let mut out = Map::new();
        for (name, value) in values {
            if let Some(prop) = self.property(&name) {
                let accepted = prop.validate(&name, value)?;
                out.insert(name, accepted);
            }
        }
        Ok(out)
    }

    /// Decode a raw wire object into validated field values. The `_type` and
    /// `_key` envelope fields are dropped before validation.
    pub fn decode(&self, raw: Value) -> Result<Map<String, Value>, ApiError> {
        let object = self.strip_envelope(raw)?;
        Ok(self.validate_all(object)?)
    }

    /// Like [`decode`](Self::decode), but only the supplied fields are validated.
    pub fn decode_partial(&self, raw: Value) -> Result<Map<String, Value>, ApiError> {
        let object = self.strip_envelope(raw)?;
        Ok(self.validate_partial(object)?)
    }

    fn strip_envelope(&self, raw: Value) -> Result<Map<String, Value>, ApiError> {
        let mut object = match raw {
            Value::Object(m) => m,
            other => {
                return Err(ApiError::Decode(format!(
                    "{} body must be a JSON object, got {}",
                    self.kind,
                    json_type_name(&other)
                )))
            }
        };
        object.remove(TYPE_FIELD);
        object.remove(KEY_FIELD);
        Ok(object)
    }

    /// `{"_type": kind, "_key": key?, <field>: value, ...}` in schema order.
    pub fn wire_object(&self, key: Option<Key>, values: &Map<String, Value>) -> Value {
        let mut out = Map::new();
        out.insert(TYPE_FIELD.into(), Value::String(self.kind.clone()));
        if let Some(key) = key {
            out.insert(KEY_FIELD.into(), Value::from(key.get()));
        }
        for (name, prop) in &self.properties {
            let value = values.get(name).map(|v| prop.as_wire(v)).unwrap_or(Value::Null);
            out.insert(name.clone(), value);
        }
        Value::Object(out)
    }
}

pub(crate) fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Collects `(name, Property)` pairs; `build` checks them once.
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    kind: String,
    properties: Vec<(String, Property)>,
}

impl SchemaBuilder {
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    pub fn build(self) -> Result<EntitySchema, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSchema {
            kind: self.kind.clone(),
            reason,
        };
        if self.kind.trim().is_empty() {
            return Err(invalid("kind must not be empty".into()));
        }
        if is_reserved(&self.kind) {
            return Err(invalid("kind must not start with '_'".into()));
        }
        let mut seen = HashSet::new();
        for (name, prop) in &self.properties {
            if name.is_empty() {
                return Err(invalid("property name must not be empty".into()));
            }
            if is_reserved(name) {
                return Err(invalid(format!("property '{}' uses a reserved name", name)));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("duplicate property '{}'", name)));
            }
            let inverted = match prop.kind() {
                PropertyKind::String {
                    min_length: Some(min),
                    max_length: Some(max),
                } => min > max,
                PropertyKind::Integer {
                    min_value: Some(min),
                    max_value: Some(max),
                } => min > max,
                _ => false,
            };
            if inverted {
                return Err(invalid(format!("property '{}' has min greater than max", name)));
            }
        }
        Ok(EntitySchema {
            kind: self.kind,
            properties: self.properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addressbook() -> EntitySchema {
        EntitySchema::builder("addressbook_entry")
            .property("name", Property::string().not_null().max_length(100))
            .property("email", Property::string().max_length(100))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_bad_definitions() {
        assert!(EntitySchema::builder("").build().is_err());
        assert!(EntitySchema::builder("_hidden").build().is_err());
        assert!(EntitySchema::builder("k")
            .property("a", Property::string())
            .property("a", Property::integer())
            .build()
            .is_err());
        assert!(EntitySchema::builder("k").property("_key", Property::key()).build().is_err());
        assert!(EntitySchema::builder("k")
            .property("n", Property::integer().min_value(5).max_value(1))
            .build()
            .is_err());
    }

    #[test]
    fn decode_fills_missing_fields_with_null() {
        let fields = addressbook()
            .decode(json!({"_type": "addressbook_entry", "name": "Fred Bloggs"}))
            .unwrap();
        assert_eq!(fields.get("name"), Some(&json!("Fred Bloggs")));
        assert_eq!(fields.get("email"), Some(&Value::Null));
    }

    #[test]
    fn decode_aggregates_unknown_fields() {
        let err = addressbook()
            .decode(json!({"name": "Fred", "age": 3, "phone": "x"}))
            .unwrap_err();
        match err {
            ApiError::Validation(ValidationError::UnknownFields(mut names)) => {
                names.sort();
                assert_eq!(names, vec!["age".to_string(), "phone".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_non_objects() {
        assert!(matches!(addressbook().decode(json!([1, 2])), Err(ApiError::Decode(_))));
    }

    #[test]
    fn decode_reports_first_violation() {
        let err = addressbook().decode(json!({"email": "fred@bloggs.com"})).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::Null { ref property }) if property == "name"
        ));
    }

    #[test]
    fn partial_validation_ignores_absent_fields() {
        let schema = addressbook();
        let mut values = Map::new();
        values.insert("email".into(), json!("a@b.c"));
        assert_eq!(schema.validate_partial(values.clone()).unwrap(), values);

        let mut nulled = Map::new();
        nulled.insert("name".into(), Value::Null);
        assert!(schema.validate_partial(nulled).is_err());
    }

    #[test]
    fn wire_object_follows_schema_order() {
        let schema = addressbook();
        let mut values = Map::new();
        values.insert("email".into(), json!("fred@bloggs.com"));
        values.insert("name".into(), json!("Fred"));
        let wire = schema.wire_object(Key::new(3), &values);
        let keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["_type", "_key", "name", "email"]);
        assert_eq!(wire["_key"], json!(3));
    }
}
