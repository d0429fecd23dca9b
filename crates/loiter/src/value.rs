//! Runtime values for records, predicates, and annotations.
//!
//! [`Value`] is the owned, recursive value type the engine moves through the
//! pipeline: record fields project into it, predicate operands are stored as
//! it, and annotations produce it. Numbers keep their integer/float identity
//! in [`Number`] and compare numerically across variants.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// An engine value.
///
/// Equality is numeric across [`Number`] variants (`I64(5)` equals
/// `F64(5.0)`); values of different kinds are simply unequal, never an
/// error. Ordering between values is the business of
/// [`compare_values`](crate::ordering::compare_values), which rejects
/// cross-kind comparisons.
///
/// # Example
///
/// ```
/// use loiter::Value;
///
/// assert_eq!(Value::from(5i64), Value::from(5.0));
/// assert_ne!(Value::from(5i64), Value::from("5"));
/// assert_eq!(Value::from(vec![1, 2, 3]).kind(), "list");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent or explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value (owned).
    Str(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// String-keyed mapping; doubles as a nested record.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extracts the boolean, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the number, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the string slice, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the list contents, if present.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the map contents, if present.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl PartialOrd for Value {
    /// Partial order within a kind; cross-kind values are unordered here.
    ///
    /// The ordering comparators report cross-kind operands as errors
    /// instead of silently treating them as unordered; this impl exists for
    /// direct `<`/`>=` use on values, e.g. inside annotations.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        crate::ordering::compare_values(self, other).ok().flatten()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.compare(*b) == Some(Ordering::Equal),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

/// Numeric value preserving integer/float identity.
///
/// Same-variant comparisons are exact; mixed-variant comparisons convert to
/// `f64`. `NaN` never compares equal or ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for mixed-variant comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed variants.
    ///
    /// Returns `None` only when `NaN` is involved.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::I64(n as i64)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::I64(n)
    }
}

impl From<u32> for Number {
    fn from(n: u32) -> Self {
        Number::U64(n as u64)
    }
}

impl From<u64> for Number {
    fn from(n: u64) -> Self {
        Number::U64(n)
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number::U64(n as u64)
    }
}

impl From<isize> for Number {
    fn from(n: isize) -> Self {
        Number::I64(n as i64)
    }
}

impl From<f32> for Number {
    fn from(n: f32) -> Self {
        Number::F64(n as f64)
    }
}

impl From<f64> for Number {
    fn from(n: f64) -> Self {
        Number::F64(n)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(true).kind(), "bool");
        assert_eq!(Value::from(1i64).kind(), "number");
        assert_eq!(Value::from("x").kind(), "string");
        assert_eq!(Value::from(vec![1, 2]).kind(), "list");
        assert_eq!(Value::from(BTreeMap::new()).kind(), "map");
    }

    #[test]
    fn extractors() {
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from("hello").as_number(), None);
        assert_eq!(Value::from(42i64).as_number(), Some(Number::I64(42)));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::from(Option::<i64>::None).is_null());
        assert_eq!(
            Value::from(vec![1i64, 2]).as_list(),
            Some(&[Value::from(1i64), Value::from(2i64)][..])
        );
    }

    #[test]
    fn number_comparisons_same_variant() {
        assert_eq!(Number::I64(5).compare(Number::I64(10)), Some(Ordering::Less));
        assert_eq!(Number::U64(10).compare(Number::U64(5)), Some(Ordering::Greater));
        assert_eq!(Number::F64(5.0).compare(Number::F64(5.0)), Some(Ordering::Equal));
    }

    #[test]
    fn number_comparisons_mixed_variants() {
        assert_eq!(Number::I64(5).compare(Number::U64(10)), Some(Ordering::Less));
        assert_eq!(Number::I64(5).compare(Number::F64(5.0)), Some(Ordering::Equal));
        assert_eq!(
            Number::U64(10).compare(Number::F64(5.5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn number_nan_is_unordered() {
        assert_eq!(Number::F64(f64::NAN).compare(Number::F64(1.0)), None);
        assert_eq!(Number::F64(1.0).compare(Number::F64(f64::NAN)), None);
    }

    #[test]
    fn equality_is_numeric_across_variants() {
        assert_eq!(Value::from(5i64), Value::from(5u64));
        assert_eq!(Value::from(5i64), Value::from(5.0));
        assert_ne!(Value::from(5i64), Value::from(6i64));
    }

    #[test]
    fn equality_across_kinds_is_false() {
        assert_ne!(Value::from(5i64), Value::from("5"));
        assert_ne!(Value::from(false), Value::Null);
        assert_ne!(Value::from(0i64), Value::from(false));
    }

    #[test]
    fn values_order_within_a_kind() {
        assert!(Value::from(1i64) < Value::from(2u64));
        assert!(Value::from("apple") < Value::from("banana"));
        // Cross-kind values are unordered.
        assert!(!(Value::from(1i64) < Value::from("2")));
        assert!(!(Value::from(1i64) >= Value::from("2")));
    }

    #[test]
    fn list_equality_is_elementwise() {
        assert_eq!(Value::from(vec![1i64, 2]), Value::from(vec![1.0, 2.0]));
        assert_ne!(Value::from(vec![1i64, 2]), Value::from(vec![1i64]));
    }
}
