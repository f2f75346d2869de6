//! Equality filters and their canonical keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical string identifying a filter.
///
/// Two filters with the same field/value pairs produce the same key no matter
/// the order the pairs were supplied in. The empty key is the unfiltered root.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilterKey(String);

impl FilterKey {
    /// Key of the unfiltered root group.
    pub fn root() -> Self {
        FilterKey(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FilterKey {
    fn from(s: &str) -> Self {
        FilterKey(s.to_string())
    }
}

impl fmt::Debug for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterKey({:?})", self.0)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of equality constraints over item fields.
///
/// Pairs are kept ordered by field name; setting a field twice keeps the
/// last value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    fields: BTreeMap<String, Value>,
}

impl Filter {
    /// The empty filter (matches every item).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from field/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a filter from a JSON object. Anything else yields the empty filter.
    pub fn from_json(value: &Value) -> Self {
        match value.as_object() {
            Some(map) => Self {
                fields: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
            None => Self::new(),
        }
    }

    /// Add or replace one constraint.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate constraints in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The filter as a JSON object, usable wherever an item is expected.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Canonical key: the field-ordered pairs as compact JSON, without the
    /// surrounding braces (`"color":"blue","size":3`).
    ///
    /// Strings stay quoted and escaped, so `"1"` and `1` differ and a `:` inside
    /// a value cannot be mistaken for a pair boundary.
    pub fn key(&self) -> FilterKey {
        if self.fields.is_empty() {
            return FilterKey::root();
        }
        let object: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, value)| (field.clone(), normalize(value)))
            .collect();
        let encoded = Value::Object(object).to_string();
        FilterKey(encoded[1..encoded.len() - 1].to_string())
    }

    /// Whether every constraint holds on `item`.
    ///
    /// A missing field, or an item that is not an object, never matches a
    /// non-empty filter.
    pub fn matches(&self, item: &Value) -> bool {
        if self.fields.is_empty() {
            return true;
        }
        let Some(object) = item.as_object() else {
            return false;
        };
        self.fields.iter().all(|(field, expected)| {
            object
                .get(field)
                .is_some_and(|actual| strict_equals(actual, expected))
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Whole-number floats are rewritten as integers so `1.0` keys like `1`,
/// matching how numbers compare. Compound values are normalized recursively.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => Value::from(f as i64),
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Largest float that still maps one-to-one onto an integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Scalar equality without type coercion. Compound values never match.
fn strict_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_is_order_independent() {
        let a = Filter::new().with("color", "blue").with("size", 3);
        let b = Filter::new().with("size", 3).with("color", "blue");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), r#""color":"blue","size":3"#);
    }

    #[test]
    fn test_empty_filter_is_root() {
        assert!(Filter::new().key().is_root());
        assert!(!Filter::new().with("id", 1).key().is_root());
    }

    #[test]
    fn test_key_encoding() {
        assert_eq!(Filter::new().with("n", 1.0).key(), Filter::new().with("n", 1).key());
        assert_eq!(Filter::new().with("n", 2.5).key().as_str(), r#""n":2.5"#);
        assert_eq!(Filter::new().with("b", true).key().as_str(), r#""b":true"#);
        assert_eq!(Filter::new().with("z", Value::Null).key().as_str(), r#""z":null"#);
        assert_eq!(
            Filter::new().with("tags", json!(["a", null, 3.0])).key().as_str(),
            r#""tags":["a",null,3]"#
        );
        assert_eq!(
            Filter::new().with("o", json!({"x": 1})).key().as_str(),
            r#""o":{"x":1}"#
        );
    }

    #[test]
    fn test_key_is_injective() {
        // A `:` inside a value must not read as a pair boundary.
        let nested = Filter::new().with("a", "b:c:d");
        let split = Filter::new().with("a", "b").with("c", "d");
        assert_ne!(nested.key(), split.key());

        // Numbers and numeric strings are different values.
        assert_ne!(
            Filter::new().with("id", 1).key(),
            Filter::new().with("id", "1").key()
        );

        // Quotes and separators in strings are escaped.
        assert_ne!(
            Filter::new().with("a", r#"x","b":"y"#).key(),
            Filter::new().with("a", "x").with("b", "y").key()
        );
    }

    #[test]
    fn test_matches() {
        let filter = Filter::new().with("color", "blue");
        assert!(filter.matches(&json!({"id": 1, "color": "blue"})));
        assert!(!filter.matches(&json!({"id": 1, "color": "green"})));
        assert!(!filter.matches(&json!({"id": 1})));
        assert!(!filter.matches(&json!("blue")));
    }

    #[test]
    fn test_matches_is_strict() {
        let filter = Filter::new().with("id", 1);
        assert!(filter.matches(&json!({"id": 1})));
        assert!(filter.matches(&json!({"id": 1.0})));
        assert!(!filter.matches(&json!({"id": "1"})));

        let compound = Filter::new().with("tags", json!(["a"]));
        assert!(!compound.matches(&json!({"tags": ["a"]})));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::new();
        assert!(filter.matches(&json!({"id": 9})));
        assert!(filter.matches(&json!(null)));
    }

    #[test]
    fn test_from_json_round_trip() {
        let value = json!({"b": 2, "a": "x"});
        let filter = Filter::from_json(&value);
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.to_json(), value);
        assert!(Filter::from_json(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_duplicate_field_keeps_last() {
        let filter = Filter::from_pairs(vec![("id", 1), ("id", 2)]);
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.key().as_str(), r#""id":2"#);
    }
}
