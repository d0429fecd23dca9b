//! Comparator registry and parsed predicates.
//!
//! [`Cmp`] is the fixed registry of comparison operators a lookup key can
//! name; [`Predicate`] is one parsed `(path, comparator, operand)` triple.
//! All parsing happens at chain time, so a malformed key or pattern fails
//! before any record is evaluated.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::error::{QueryError, Result};
use crate::lookup::Lookup;
use crate::ordering::compare_values;
use crate::record::{resolve, Record};
use crate::value::Value;

/// Comparison operator selected by a lookup key's trailing tag.
///
/// | Tag | Operator | Semantics |
/// |-----|----------|-----------|
/// | `eq`, `exact` (or no tag) | `Eq` | value equality |
/// | `in` | `In` | record value is a member of the operand |
/// | `contains` | `Contains` | operand is a member of the record value |
/// | `regex` | `Regex` | record string matches the operand pattern |
/// | `gt` | `Gt` | greater than |
/// | `gte`, `ge` | `Gte` | greater than or equal |
/// | `lt` | `Lt` | less than |
/// | `lte`, `le` | `Lte` | less than or equal |
///
/// Membership works over lists (element equality), strings (substring), and
/// maps (key lookup). Ordering operators require both sides to be of the
/// same kind; anything else is a [`QueryError::Incomparable`] for the record
/// under evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    /// Value equality (default when the key carries no tag).
    Eq,
    /// Left value is a member of the operand.
    In,
    /// Operand is a member of the left value.
    Contains,
    /// Left string matches the operand regular expression.
    Regex,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl Cmp {
    /// Looks a tag up in the registry, normalizing aliases.
    pub fn for_tag(tag: &str) -> Option<Cmp> {
        match tag {
            "eq" | "exact" => Some(Cmp::Eq),
            "in" => Some(Cmp::In),
            "contains" => Some(Cmp::Contains),
            "regex" => Some(Cmp::Regex),
            "gt" => Some(Cmp::Gt),
            "gte" | "ge" => Some(Cmp::Gte),
            "lt" => Some(Cmp::Lt),
            "lte" | "le" => Some(Cmp::Lte),
            _ => None,
        }
    }

    /// Resolves a tag, failing with [`QueryError::UnknownComparator`].
    ///
    /// This is the strict entry point used by [`Predicate::with_tag`];
    /// inside a full lookup key an unrecognized trailing segment is treated
    /// as part of the attribute path instead.
    pub fn from_tag(tag: &str) -> Result<Cmp> {
        Cmp::for_tag(tag).ok_or_else(|| QueryError::UnknownComparator(tag.to_string()))
    }

    /// Returns the canonical tag of this comparator.
    pub fn as_str(self) -> &'static str {
        match self {
            Cmp::Eq => "eq",
            Cmp::In => "in",
            Cmp::Contains => "contains",
            Cmp::Regex => "regex",
            Cmp::Gt => "gt",
            Cmp::Gte => "gte",
            Cmp::Lt => "lt",
            Cmp::Lte => "lte",
        }
    }

    /// Evaluates an ordering-based comparator against an ordering result.
    fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Cmp::Eq => ordering == Ordering::Equal,
            Cmp::Gt => ordering == Ordering::Greater,
            Cmp::Gte => ordering != Ordering::Less,
            Cmp::Lt => ordering == Ordering::Less,
            Cmp::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Applies this comparator to a left (record) value and a right
    /// (operand) value.
    ///
    /// `Regex` compiles the operand on every call here; predicates built
    /// through [`Predicate::parse`] compile the pattern once at chain time
    /// instead.
    pub fn eval(self, left: &Value, right: &Value) -> Result<bool> {
        match self {
            Cmp::Eq => Ok(left == right),
            Cmp::In => membership(left, right).ok_or_else(|| self.mismatch(left, right)),
            Cmp::Contains => membership(right, left).ok_or_else(|| self.mismatch(left, right)),
            Cmp::Regex => match (left, right) {
                (Value::Str(s), Value::Str(pattern)) => Ok(Regex::new(pattern)?.is_match(s)),
                _ => Err(self.mismatch(left, right)),
            },
            Cmp::Gt | Cmp::Gte | Cmp::Lt | Cmp::Lte => match compare_values(left, right)? {
                Some(ordering) => Ok(self.eval_ordering(ordering)),
                // NaN: unordered, so ordering comparators simply don't match.
                None => Ok(false),
            },
        }
    }

    fn mismatch(self, left: &Value, right: &Value) -> QueryError {
        QueryError::TypeMismatch {
            cmp: self.as_str(),
            left: left.kind(),
            right: right.kind(),
        }
    }
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership test shared by `in` and `contains`.
///
/// Returns `None` when the haystack/needle combination is unsupported.
fn membership(needle: &Value, haystack: &Value) -> Option<bool> {
    match (needle, haystack) {
        (needle, Value::List(items)) => Some(items.iter().any(|item| item == needle)),
        (Value::Str(needle), Value::Str(haystack)) => Some(haystack.contains(needle.as_str())),
        (Value::Str(needle), Value::Map(map)) => Some(map.contains_key(needle)),
        _ => None,
    }
}

/// A single parsed filter predicate: attribute path, comparator, operand.
///
/// Predicates given in one `filter`/`exclude` call are AND-ed together.
#[derive(Debug, Clone)]
pub struct Predicate {
    lookup: Lookup,
    cmp: Cmp,
    operand: Operand,
}

#[derive(Debug, Clone)]
enum Operand {
    Plain(Value),
    Pattern(Regex),
}

impl Predicate {
    /// Parses a keyword key and operand into a predicate.
    ///
    /// Fails fast on a malformed key or, for the `regex` comparator, an
    /// invalid or non-string pattern.
    ///
    /// # Example
    ///
    /// ```
    /// use loiter::Predicate;
    ///
    /// let predicate = Predicate::parse("age__gte", 30).unwrap();
    /// assert_eq!(predicate.cmp(), loiter::Cmp::Gte);
    /// assert!(Predicate::parse("__gte", 30).is_err());
    /// ```
    pub fn parse(key: &str, operand: impl Into<Value>) -> Result<Self> {
        let (lookup, cmp) = Lookup::parse(key)?;
        Predicate::build(lookup, cmp, operand.into())
    }

    /// Builds a predicate from an explicit path and comparator tag.
    ///
    /// Unlike [`Predicate::parse`], an unrecognized tag here is an error
    /// rather than a path segment.
    pub fn with_tag(path: &str, tag: &str, operand: impl Into<Value>) -> Result<Self> {
        Predicate::build(Lookup::path(path)?, Cmp::from_tag(tag)?, operand.into())
    }

    fn build(lookup: Lookup, cmp: Cmp, operand: Value) -> Result<Self> {
        let operand = match (cmp, operand) {
            (Cmp::Regex, Value::Str(pattern)) => Operand::Pattern(Regex::new(&pattern)?),
            (Cmp::Regex, other) => {
                return Err(QueryError::TypeMismatch {
                    cmp: Cmp::Regex.as_str(),
                    left: "string",
                    right: other.kind(),
                })
            }
            (_, value) => Operand::Plain(value),
        };

        Ok(Predicate {
            lookup,
            cmp,
            operand,
        })
    }

    /// The parsed attribute path.
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// The comparator in effect.
    pub fn cmp(&self) -> Cmp {
        self.cmp
    }

    /// Evaluates this predicate against a record.
    ///
    /// Resolution failures and operand type mismatches propagate as errors
    /// scoped to the record under evaluation.
    pub fn matches<R: Record>(&self, record: &R) -> Result<bool> {
        let left = resolve(record, &self.lookup)?;
        match &self.operand {
            Operand::Pattern(pattern) => match &left {
                Value::Str(s) => Ok(pattern.is_match(s)),
                other => Err(QueryError::TypeMismatch {
                    cmp: self.cmp.as_str(),
                    left: other.kind(),
                    right: "string",
                }),
            },
            Operand::Plain(right) => self.cmp.eval(&left, right),
        }
    }
}
