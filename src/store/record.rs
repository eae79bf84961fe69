//! Primary keys and the backing record adapters hand to entities.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::num::NonZeroU64;

/// Strictly positive primary key assigned by a storage adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(NonZeroU64);

impl Key {
    pub fn new(n: u64) -> Option<Self> {
        NonZeroU64::new(n).map(Key)
    }

    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Parse a path argument such as `"42"`. Zero, signs and non-digits are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u64>().ok().and_then(Key::new)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Key {
    type Error = i64;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        u64::try_from(n).ok().and_then(Key::new).ok_or(n)
    }
}

/// Field storage for one entity, keyed once persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    key: Option<Key>,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(key: Option<Key>, fields: Map<String, Value>) -> Self {
        Record { key, fields }
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    /// Called by adapters when the backend assigns the key.
    pub fn assign_key(&mut self, key: Key) {
        self.key = Some(key);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn replace_fields(&mut self, fields: Map<String, Value>) -> Map<String, Value> {
        std::mem::replace(&mut self.fields, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parsing() {
        assert_eq!(Key::parse("42").map(Key::get), Some(42));
        for bad in ["0", "-5", "+5", "abc", "", "4 2", "99999999999999999999"] {
            assert_eq!(Key::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn key_from_database_id() {
        assert_eq!(Key::try_from(7i64).map(Key::get), Ok(7));
        assert_eq!(Key::try_from(0i64), Err(0));
        assert_eq!(Key::try_from(-1i64), Err(-1));
    }
}
