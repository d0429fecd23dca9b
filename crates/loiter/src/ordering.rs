//! Order specifications and value comparison for sorting.

use std::cmp::Ordering;

use crate::error::{QueryError, Result};
use crate::lookup::Lookup;
use crate::value::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Applies this direction to an ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }
}

/// One ordering key: an attribute path plus a direction.
///
/// Multiple keys sort lexicographically, first key primary; the sort is
/// stable, so records tied on every key keep their upstream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    lookup: Lookup,
    dir: Dir,
}

impl OrderKey {
    /// Parses an order key; a `-` prefix selects descending order.
    ///
    /// # Example
    ///
    /// ```
    /// use loiter::{Dir, OrderKey};
    ///
    /// let key = OrderKey::parse("-age").unwrap();
    /// assert_eq!(key.dir(), Dir::Desc);
    /// assert_eq!(key.lookup().segments(), ["age"]);
    /// ```
    pub fn parse(key: &str) -> Result<OrderKey> {
        let (dir, path) = match key.strip_prefix('-') {
            Some(rest) => (Dir::Desc, rest),
            None => (Dir::Asc, key),
        };

        Ok(OrderKey {
            lookup: Lookup::path(path)?,
            dir,
        })
    }

    /// Creates an order key from parts.
    pub fn new(lookup: Lookup, dir: Dir) -> OrderKey {
        OrderKey { lookup, dir }
    }

    /// The attribute path to sort by.
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// The sort direction.
    pub fn dir(&self) -> Dir {
        self.dir
    }
}

/// Compares two values of the same kind.
///
/// Returns `Ok(None)` when the values are of the same kind but unordered
/// (`NaN`); cross-kind operands are a [`QueryError::Incomparable`]. Lists
/// compare lexicographically, shorter prefix first.
pub fn compare_values(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x.compare(*y)),
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::Bool(x), Value::Bool(y)) => Ok(Some(x.cmp(y))),
        (Value::Null, Value::Null) => Ok(Some(Ordering::Equal)),
        (Value::List(x), Value::List(y)) => {
            for (i, j) in x.iter().zip(y.iter()) {
                match compare_values(i, j)? {
                    Some(Ordering::Equal) => continue,
                    other => return Ok(other),
                }
            }
            Ok(Some(x.len().cmp(&y.len())))
        }
        _ => Err(QueryError::Incomparable {
            left: a.kind(),
            right: b.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_apply() {
        assert_eq!(Dir::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(Dir::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(Dir::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn parse_directions() {
        assert_eq!(OrderKey::parse("age").unwrap().dir(), Dir::Asc);
        assert_eq!(OrderKey::parse("-age").unwrap().dir(), Dir::Desc);
    }

    #[test]
    fn parse_nested_path() {
        let key = OrderKey::parse("-nested__id").unwrap();
        assert_eq!(key.lookup().segments(), ["nested", "id"]);
        assert_eq!(key.dir(), Dir::Desc);
    }

    #[test]
    fn bare_dash_is_invalid() {
        assert!(matches!(
            OrderKey::parse("-"),
            Err(QueryError::InvalidLookup(_))
        ));
    }

    #[test]
    fn compare_same_kind() {
        assert_eq!(
            compare_values(&Value::from(1i64), &Value::from(2i64)).unwrap(),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::from("apple"), &Value::from("banana")).unwrap(),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::from(false), &Value::from(true)).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn compare_mixed_number_variants() {
        assert_eq!(
            compare_values(&Value::from(1i64), &Value::from(1.5)).unwrap(),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn compare_nan_is_unordered() {
        assert_eq!(
            compare_values(&Value::from(f64::NAN), &Value::from(1.0)).unwrap(),
            None
        );
    }

    #[test]
    fn compare_lists_lexicographically() {
        let short = Value::from(vec![1i64, 2]);
        let long = Value::from(vec![1i64, 2, 3]);
        let bigger = Value::from(vec![1i64, 9]);

        assert_eq!(compare_values(&short, &long).unwrap(), Some(Ordering::Less));
        assert_eq!(
            compare_values(&bigger, &long).unwrap(),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&short, &short).unwrap(),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn compare_cross_kind_is_an_error() {
        assert!(matches!(
            compare_values(&Value::from(1i64), &Value::from("1")),
            Err(QueryError::Incomparable { .. })
        ));
        assert!(matches!(
            compare_values(&Value::from(vec![1i64]), &Value::from("1")),
            Err(QueryError::Incomparable { .. })
        ));
    }

    #[test]
    fn compare_mismatched_list_elements_is_an_error() {
        let numbers = Value::from(vec![1i64]);
        let strings = Value::from(vec!["a"]);
        assert!(matches!(
            compare_values(&numbers, &strings),
            Err(QueryError::Incomparable { .. })
        ));
    }
}
