//! Property rules: one typed, constrained field of an entity schema.

use crate::error::ValidationError;
use serde_json::Value;

/// Declared value kind of a property with its optional bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Integer {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    /// Strictly positive integer referencing another entity.
    Key,
}

impl PropertyKind {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::String { .. } => "string",
            PropertyKind::Integer { .. } => "integer",
            PropertyKind::Key => "key",
        }
    }
}

/// Immutable validation rule for a single field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    kind: PropertyKind,
    not_null: bool,
}

impl Property {
    pub const fn new(kind: PropertyKind) -> Self {
        Property {
            kind,
            not_null: false,
        }
    }

    pub const fn string() -> Self {
        Self::new(PropertyKind::String {
            min_length: None,
            max_length: None,
        })
    }

    pub const fn integer() -> Self {
        Self::new(PropertyKind::Integer {
            min_value: None,
            max_value: None,
        })
    }

    pub const fn key() -> Self {
        Self::new(PropertyKind::Key)
    }

    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Lower length bound; only meaningful on string properties.
    pub fn min_length(mut self, n: usize) -> Self {
        debug_assert!(matches!(self.kind, PropertyKind::String { .. }));
        if let PropertyKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(n);
        }
        self
    }

    /// Upper length bound; only meaningful on string properties.
    pub fn max_length(mut self, n: usize) -> Self {
        debug_assert!(matches!(self.kind, PropertyKind::String { .. }));
        if let PropertyKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(n);
        }
        self
    }

    /// Lower value bound; only meaningful on integer properties.
    pub fn min_value(mut self, n: i64) -> Self {
        debug_assert!(matches!(self.kind, PropertyKind::Integer { .. }));
        if let PropertyKind::Integer { min_value, .. } = &mut self.kind {
            *min_value = Some(n);
        }
        self
    }

    /// Upper value bound; only meaningful on integer properties.
    pub fn max_value(mut self, n: i64) -> Self {
        debug_assert!(matches!(self.kind, PropertyKind::Integer { .. }));
        if let PropertyKind::Integer { max_value, .. } = &mut self.kind {
            *max_value = Some(n);
        }
        self
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    /// Return the accepted value or the first violated rule: null check, then
    /// type, then bounds. Bounds are never applied to null.
    pub fn validate(&self, name: &str, value: Value) -> Result<Value, ValidationError> {
        if value.is_null() {
            if self.not_null {
                return Err(ValidationError::Null {
                    property: name.to_string(),
                });
            }
            return Ok(Value::Null);
        }
        match &self.kind {
            PropertyKind::String {
                min_length,
                max_length,
            } => {
                let s = value.as_str().ok_or_else(|| wrong_type(name, "a string"))?;
                let len = s.chars().count();
                if let Some(min) = *min_length {
                    if len < min {
                        return Err(ValidationError::MinLength {
                            property: name.to_string(),
                            min,
                        });
                    }
                }
                if let Some(max) = *max_length {
                    if len > max {
                        return Err(ValidationError::MaxLength {
                            property: name.to_string(),
                            max,
                        });
                    }
                }
            }
            PropertyKind::Integer {
                min_value,
                max_value,
            } => {
                let n = value.as_i64().ok_or_else(|| wrong_type(name, "an integer"))?;
                if let Some(min) = *min_value {
                    if n < min {
                        return Err(ValidationError::MinValue {
                            property: name.to_string(),
                            min,
                        });
                    }
                }
                if let Some(max) = *max_value {
                    if n > max {
                        return Err(ValidationError::MaxValue {
                            property: name.to_string(),
                            max,
                        });
                    }
                }
            }
            PropertyKind::Key => match (value.as_u64(), value.as_i64()) {
                (Some(n), _) if n > 0 => {}
                (Some(_), _) | (None, Some(_)) => {
                    return Err(ValidationError::NonPositiveKey {
                        property: name.to_string(),
                    })
                }
                (None, None) => return Err(wrong_type(name, "an integer key")),
            },
        }
        Ok(value)
    }

    /// JSON-compliant form of a stored value. Scalars pass through; anything
    /// else is emitted as its JSON text.
    pub fn as_wire(&self, value: &Value) -> Value {
        as_wire_value(value)
    }
}

pub(crate) fn as_wire_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
    }
}

fn wrong_type(name: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        property: name.to_string(),
        expected,
    }
}
