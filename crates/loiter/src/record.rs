//! Record access: the named-field capability and the annotated row wrapper.

use std::collections::{BTreeMap, HashMap};

use crate::error::{QueryError, Result};
use crate::lookup::Lookup;
use crate::value::Value;

/// Capability for named-field lookup.
///
/// The engine never assumes a record shape; anything that can hand out a
/// [`Value`] for a field name can be queried. Implementations ship for the
/// string-keyed map types and for [`Value`] itself (nested maps); implement
/// it for your own structs to query them directly.
///
/// # Example
///
/// ```
/// use loiter::{Number, Record, Value};
///
/// struct Task {
///     name: String,
///     priority: i64,
/// }
///
/// impl Record for Task {
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::Str(self.name.clone())),
///             "priority" => Some(Value::Number(Number::I64(self.priority))),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record {
    /// Returns the value of a field, or `None` if the record has no such
    /// field.
    fn field(&self, name: &str) -> Option<Value>;
}

impl Record for BTreeMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Record for HashMap<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Record for Value {
    /// Maps expose their entries; every other variant has no named fields.
    fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(name).cloned(),
            _ => None,
        }
    }
}

/// Resolves a parsed attribute path against a record, walking nested
/// segments through [`Value`]'s own field lookup.
///
/// A missing segment fails with [`QueryError::Resolution`] scoped to the
/// record under evaluation; callers decide nothing — the failure always
/// propagates.
pub(crate) fn resolve<R: Record + ?Sized>(record: &R, lookup: &Lookup) -> Result<Value> {
    let mut current: Option<Value> = None;

    for segment in lookup.segments() {
        let next = match &current {
            None => record.field(segment),
            Some(value) => value.field(segment),
        };
        current = Some(next.ok_or_else(|| QueryError::Resolution {
            path: lookup.to_string(),
            segment: segment.clone(),
        })?);
    }

    current.ok_or_else(|| QueryError::InvalidLookup(lookup.to_string()))
}

/// A record flowing through a pipeline: the base record plus annotations.
///
/// Every original field remains visible unchanged; annotations stack on top
/// and a later annotation may shadow an earlier one or a base field. The
/// base record itself is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    base: T,
    extras: Vec<(String, Value)>,
}

impl<T> Row<T> {
    pub(crate) fn new(base: T) -> Self {
        Row {
            base,
            extras: Vec::new(),
        }
    }

    /// Borrows the underlying record.
    pub fn record(&self) -> &T {
        &self.base
    }

    /// Unwraps the underlying record, dropping annotations.
    pub fn into_inner(self) -> T {
        self.base
    }

    /// Annotations in application order.
    pub fn annotations(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.extras
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn push_annotation(&mut self, name: String, value: Value) {
        self.extras.push((name, value));
    }
}

impl<T: Record> Row<T> {
    /// Resolves a (possibly nested) attribute path, annotations included.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::BTreeMap;
    ///
    /// use loiter::{Query, Value};
    ///
    /// let records = vec![BTreeMap::from([("n".to_string(), Value::from(2i64))])];
    /// let rows = Query::new(records).to_vec().unwrap();
    /// assert_eq!(rows[0].value("n").unwrap(), Value::from(2i64));
    /// ```
    pub fn value(&self, path: &str) -> Result<Value> {
        resolve(self, &Lookup::path(path)?)
    }
}

impl<T: Record> Record for Row<T> {
    fn field(&self, name: &str) -> Option<Value> {
        self.extras
            .iter()
            .rev()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.clone())
            .or_else(|| self.base.field(name))
    }
}
