//! Nested configuration blobs handed to plugins and geometry components
//!
//! A [`ParameterSet`] is an ordered key → [`Value`] map. Lookups are typed and
//! defaulted: an absent key (or one holding an incompatible type) yields the
//! caller's default instead of an error. Dotted keys such as `"gun.energy"`
//! walk into nested maps.

use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Conversion from a dynamic [`Value`] into a concrete Rust type
pub trait FromValue: Sized {
    /// Convert, returning `None` when the value has an incompatible type
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| u32::try_from(i).ok())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| u64::try_from(i).ok())
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_list()?.iter().map(T::from_value).collect()
    }
}

impl FromValue for ParameterSet {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned().map(ParameterSet::from_map)
    }
}

/// Opaque nested configuration for a plugin or geometry component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: ValueMap,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing value map
    pub fn from_map(values: ValueMap) -> Self {
        Self { values }
    }

    /// Builder-style insertion
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a top-level key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value lookup; dotted keys traverse nested maps
    pub fn value(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    }

    /// Typed lookup, `None` when absent or of the wrong type
    pub fn get<T: FromValue>(&self, key: &str) -> Option<T> {
        self.value(key).and_then(T::from_value)
    }

    /// Typed lookup with a caller-supplied default
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Nested parameter set, empty when absent
    pub fn get_set(&self, key: &str) -> ParameterSet {
        self.get(key).unwrap_or_default()
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Top-level keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &ValueMap {
        &self.values
    }
}

impl From<ValueMap> for ParameterSet {
    fn from(values: ValueMap) -> Self {
        Self::from_map(values)
    }
}

impl From<ParameterSet> for Value {
    fn from(set: ParameterSet) -> Self {
        Value::Map(set.values)
    }
}
