// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Untyped item representation and field-level update operations.
//!
//! Both backends apply updates with the same code, so a guarded update
//! behaves identically in memory and in Firestore.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::StoreError;
use crate::keys::ItemKey;

/// One stored item: a flat map of short attribute names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    /// Serialize a typed entity into an item.
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(entity)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::InvalidUpdate(format!(
                "entity serialized to non-object value: {}",
                other
            ))),
        }
    }

    /// Deserialize the item into a typed entity.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.0))?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Primary key, if both key attributes are present.
    pub fn key(&self) -> Option<ItemKey> {
        Some(ItemKey::new(self.get_str("pk")?, self.get_str("sk")?))
    }

    /// Check a guard against the current attribute values.
    pub fn satisfies(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Equals { field, value } => match self.0.get(field) {
                Some(current) => values_equal(current, value),
                // A never-written counter or list compares equal to its empty value.
                None => {
                    value.as_u64() == Some(0) || value.as_array().is_some_and(|a| a.is_empty())
                }
            },
            Condition::Exists { field } => self.0.contains_key(field),
        }
    }

    /// Apply update operations in order.
    ///
    /// Fails without partial effects if any operation targets an attribute
    /// of the wrong shape.
    pub fn apply(&mut self, ops: &[UpdateOp]) -> Result<(), StoreError> {
        let mut next = self.0.clone();
        for op in ops {
            match op {
                UpdateOp::Set { field, value } => {
                    next.insert(field.clone(), value.clone());
                }
                UpdateOp::Remove { field } => {
                    next.remove(field);
                }
                UpdateOp::SetEntry { field, key, value } => {
                    entry_map(&mut next, field)?.insert(key.clone(), value.clone());
                }
                UpdateOp::RemoveEntry { field, key } => {
                    if next.contains_key(field) {
                        entry_map(&mut next, field)?.remove(key);
                    }
                }
                UpdateOp::Add { field, delta } => {
                    let current = number_of(next.get(field), field)?;
                    next.insert(field.clone(), Value::from(current + delta));
                }
                UpdateOp::AddEntry { field, key, delta } => {
                    let map = entry_map(&mut next, field)?;
                    let current = number_of(map.get(key), key)?;
                    map.insert(key.clone(), Value::from(current + delta));
                }
            }
        }
        self.0 = next;
        Ok(())
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn entry_map<'a>(
    map: &'a mut Map<String, Value>,
    field: &str,
) -> Result<&'a mut Map<String, Value>, StoreError> {
    let slot = map
        .entry(field.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(inner) => Ok(inner),
        _ => Err(StoreError::InvalidUpdate(format!(
            "attribute '{}' is not a map",
            field
        ))),
    }
}

fn number_of(value: Option<&Value>, field: &str) -> Result<i64, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v.as_i64().ok_or_else(|| {
            StoreError::InvalidUpdate(format!("attribute '{}' is not an integer", field))
        }),
    }
}

/// A single field-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set { field: String, value: Value },
    Remove { field: String },
    /// Set one entry of a map attribute, creating the map if absent.
    SetEntry {
        field: String,
        key: String,
        value: Value,
    },
    RemoveEntry { field: String, key: String },
    /// Add to an integer attribute; a missing attribute counts as zero.
    Add { field: String, delta: i64 },
    AddEntry {
        field: String,
        key: String,
        delta: i64,
    },
}

impl UpdateOp {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        UpdateOp::Set {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn remove(field: &str) -> Self {
        UpdateOp::Remove {
            field: field.to_string(),
        }
    }

    pub fn set_entry(field: &str, key: &str, value: impl Into<Value>) -> Self {
        UpdateOp::SetEntry {
            field: field.to_string(),
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn remove_entry(field: &str, key: &str) -> Self {
        UpdateOp::RemoveEntry {
            field: field.to_string(),
            key: key.to_string(),
        }
    }

    pub fn add(field: &str, delta: i64) -> Self {
        UpdateOp::Add {
            field: field.to_string(),
            delta,
        }
    }

    pub fn add_entry(field: &str, key: &str, delta: i64) -> Self {
        UpdateOp::AddEntry {
            field: field.to_string(),
            key: key.to_string(),
            delta,
        }
    }
}

/// Guard evaluated against the stored item before an update is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals { field: String, value: Value },
    Exists { field: String },
}

impl Condition {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Condition::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Field operations plus an optional guard, applied as one key-level write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub ops: Vec<UpdateOp>,
    pub condition: Option<Condition>,
}

impl ItemUpdate {
    pub fn new(ops: Vec<UpdateOp>) -> Self {
        Self {
            ops,
            condition: None,
        }
    }

    pub fn guarded(ops: Vec<UpdateOp>, condition: Condition) -> Self {
        Self {
            ops,
            condition: Some(condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_apply_map_entry_and_counter_ops() {
        let mut it = item(json!({"pk": "ATH#1", "sk": "METADATA", "gc": 2}));

        it.apply(&[
            UpdateOp::set_entry("lw", "h1", "2024-01-15T10:00:00.000Z#run"),
            UpdateOp::add("gc", 1),
            UpdateOp::add_entry("hc", "h1", 1),
        ])
        .unwrap();

        assert_eq!(it.get("gc"), Some(&json!(3)));
        assert_eq!(it.get("lw"), Some(&json!({"h1": "2024-01-15T10:00:00.000Z#run"})));
        assert_eq!(it.get("hc"), Some(&json!({"h1": 1})));

        it.apply(&[UpdateOp::remove_entry("lw", "h1"), UpdateOp::remove("gc")])
            .unwrap();
        assert_eq!(it.get("lw"), Some(&json!({})));
        assert!(it.get("gc").is_none());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut it = item(json!({"pk": "ATH#1", "sk": "METADATA", "fn": "Jane"}));
        let before = it.clone();

        let err = it
            .apply(&[UpdateOp::add("gc", 1), UpdateOp::set_entry("fn", "x", 1)])
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidUpdate(_)));
        assert_eq!(it, before);
    }

    #[test]
    fn test_condition_treats_missing_counter_as_zero() {
        let it = item(json!({"pk": "ATH#1", "sk": "METADATA"}));
        assert!(it.satisfies(&Condition::equals("rv", 0)));
        assert!(!it.satisfies(&Condition::equals("rv", 1)));

        let it = item(json!({"pk": "ATH#1", "sk": "METADATA", "rv": 4}));
        assert!(it.satisfies(&Condition::equals("rv", 4u64)));
    }

    #[test]
    fn test_condition_compares_lists() {
        let it = item(json!({"pk": "HOST#1", "sk": "METADATA", "lids": ["l1"]}));
        assert!(it.satisfies(&Condition::equals("lids", vec!["l1".to_string()])));
        assert!(!it.satisfies(&Condition::equals("lids", Vec::<String>::new())));

        let bare = item(json!({"pk": "HOST#1", "sk": "METADATA"}));
        assert!(bare.satisfies(&Condition::equals("lids", Vec::<String>::new())));
    }

    #[test]
    fn test_remove_entry_on_missing_map_is_noop() {
        let mut it = item(json!({"pk": "ATH#1", "sk": "METADATA"}));
        it.apply(&[UpdateOp::remove_entry("lw", "h1")]).unwrap();
        assert!(it.get("lw").is_none());
    }
}
