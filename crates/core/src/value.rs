//! Value types for DynamicKV
//!
//! Collections are schemaless by design, so record fields are modeled as a
//! tagged union rather than a fixed struct. The accepted subset is exactly
//! what the wire format (JSON) can carry:
//!
//! - Null, Bool, Int, Float, String, Array, Object
//!
//! ## Type Rules
//!
//! - No implicit type coercions: `Int(1) != Float(1.0)`
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Numeric comparisons for queries go through [`Value::as_number`], which
//!   widens `Int` to `f64` - that is a query concern, not value equality.

use std::collections::HashMap;

/// Canonical DynamicKV value type for record fields
///
/// This enum represents the JSON-compatible value subset a record may hold.
/// Field maps are unordered; iteration order of *records* within a
/// collection is what the store keeps stable, not field order inside a
/// value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys (JSON object)
    Object(HashMap<String, Value>),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            // Different types are never equal
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a string value
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as f64 if this is any numeric value
    ///
    /// Range queries treat ints and floats uniformly; everything else is
    /// non-numeric and excluded from numeric predicates.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get as &HashMap if this is an Object value
    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(o: HashMap<String, Value>) -> Self {
        Value::Object(o)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

// ============================================================================
// serde_json interop - the wire and disk representation
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    // Fallback for u64 that doesn't fit in i64
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            // Non-finite floats are rejected before encoding; a stray one
            // degrades to null rather than panicking.
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        let value = Value::Null;
        assert!(value.is_null());
        assert_eq!(value.type_name(), "Null");
    }

    #[test]
    fn test_value_int() {
        let value = Value::Int(42);
        assert_eq!(value.as_int(), Some(42));
        assert_eq!(value.as_number(), Some(42.0));
    }

    #[test]
    fn test_value_float() {
        let value = Value::Float(3.5);
        assert_eq!(value.as_float(), Some(3.5));
        assert_eq!(value.as_number(), Some(3.5));
    }

    #[test]
    fn test_value_string() {
        let value = Value::String("hello world".to_string());
        assert!(value.is_string());
        assert_eq!(value.as_str(), Some("hello world"));
        assert!(value.as_number().is_none());
    }

    #[test]
    fn test_value_array() {
        let value = Value::Array(vec![Value::Int(1), Value::Bool(true)]);
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0], Value::Int(1));
    }

    #[test]
    fn test_value_object() {
        let mut map = HashMap::new();
        map.insert("key1".to_string(), Value::Int(42));
        let value = Value::Object(map);
        assert!(value.is_object());
        assert_eq!(value.as_object().unwrap().get("key1"), Some(&Value::Int(42)));
    }

    // Different types are never equal
    #[test]
    fn test_int_not_equal_float() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    // IEEE-754 float equality
    #[test]
    fn test_nan_not_equal_nan() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn test_as_number_widens_int() {
        assert_eq!(Value::Int(10).as_number(), Some(10.0));
        assert!(Value::Bool(true).as_number().is_none());
        assert!(Value::Null.as_number().is_none());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(()), Value::Null);
        assert!(matches!(Value::from(2.5f64), Value::Float(f) if f == 2.5));
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let original = Value::Object({
            let mut m = HashMap::new();
            m.insert("name".to_string(), Value::String("Widget".to_string()));
            m.insert("price".to_string(), Value::Float(9.99));
            m.insert("stock".to_string(), Value::Int(7));
            m.insert("tags".to_string(), Value::Array(vec![Value::from("a")]));
            m
        });
        let json: serde_json::Value = original.clone().into();
        let restored: Value = json.into();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_serde_json_integer_stays_int() {
        let json = serde_json::json!(7);
        let v: Value = json.into();
        assert_eq!(v, Value::Int(7));
    }

    #[test]
    fn test_serde_json_fraction_becomes_float() {
        let json = serde_json::json!(1.25);
        let v: Value = json.into();
        assert_eq!(v, Value::Float(1.25));
    }

    #[test]
    fn test_serde_json_nan_becomes_null() {
        // NaN cannot be represented in JSON; the conversion degrades to Null
        let v = Value::Float(f64::NAN);
        let json: serde_json::Value = v.into();
        assert!(json.is_null());
    }

    #[test]
    fn test_serde_json_u64_max_conversion() {
        // u64::MAX cannot fit in i64, so it goes through the f64 fallback
        let json = serde_json::json!(u64::MAX);
        let v: Value = json.into();
        assert!(v.as_float().is_some());
    }

    #[test]
    fn test_object_equality_key_order_independent() {
        let mut m1 = HashMap::new();
        m1.insert("a".to_string(), Value::Int(1));
        m1.insert("b".to_string(), Value::Int(2));
        let mut m2 = HashMap::new();
        m2.insert("b".to_string(), Value::Int(2));
        m2.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::Object(m1), Value::Object(m2));
    }

    #[test]
    fn test_nested_object() {
        let json = serde_json::json!({"nested": {"x": [1, 2, "three"], "y": null}});
        let v: Value = json.into();
        let obj = v.as_object().unwrap();
        let nested = obj.get("nested").unwrap().as_object().unwrap();
        assert!(nested.get("x").unwrap().as_array().is_some());
        assert!(nested.get("y").unwrap().is_null());
    }
}
