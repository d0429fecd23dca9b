//! Keyword-style lookup parsing.
//!
//! A lookup key names a (possibly nested) attribute path and, optionally, a
//! trailing comparator tag, with segments joined by [`DELIMITER`]:
//! `"age"`, `"age__gte"`, `"address__city__contains"`. Keys are parsed once
//! per chain call and the parsed [`Lookup`] is reused for every record.

use std::fmt;

use crate::cmp::Cmp;
use crate::error::{QueryError, Result};

/// Segment delimiter in lookup keys and order keys.
pub const DELIMITER: &str = "__";

/// A parsed attribute path: one or more non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    segments: Vec<String>,
}

impl Lookup {
    /// Parses a keyword key into an attribute path and a comparator.
    ///
    /// The final segment is taken as the comparator when it names a
    /// registered tag; otherwise the whole key is the path and the
    /// comparator defaults to [`Cmp::Eq`]. A key whose path would be empty
    /// (or contain an empty segment) is rejected, so a bare tag such as
    /// `"gte"` is an invalid lookup rather than a field named `gte`.
    ///
    /// # Example
    ///
    /// ```
    /// use loiter::{Cmp, Lookup};
    ///
    /// let (path, cmp) = Lookup::parse("address__city__contains").unwrap();
    /// assert_eq!(path.segments(), ["address", "city"]);
    /// assert_eq!(cmp, Cmp::Contains);
    ///
    /// let (path, cmp) = Lookup::parse("age").unwrap();
    /// assert_eq!(path.segments(), ["age"]);
    /// assert_eq!(cmp, Cmp::Eq);
    /// ```
    pub fn parse(key: &str) -> Result<(Lookup, Cmp)> {
        let mut segments: Vec<&str> = key.split(DELIMITER).collect();
        let mut cmp = Cmp::Eq;

        if let Some(tag) = segments.last().copied().and_then(Cmp::for_tag) {
            cmp = tag;
            segments.pop();
        }

        Ok((Lookup::from_segments(key, segments)?, cmp))
    }

    /// Parses a plain attribute path, with no comparator extraction.
    ///
    /// Used for order keys and annotation-side lookups, where a trailing
    /// `gte` is just a field name.
    pub fn path(key: &str) -> Result<Lookup> {
        let segments: Vec<&str> = key.split(DELIMITER).collect();
        Lookup::from_segments(key, segments)
    }

    fn from_segments(key: &str, segments: Vec<&str>) -> Result<Lookup> {
        if segments.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(QueryError::InvalidLookup(key.to_string()));
        }

        Ok(Lookup {
            segments: segments.into_iter().map(String::from).collect(),
        })
    }

    /// The path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(DELIMITER))
    }
}

/// Builds a lookup list with keyword-argument syntax.
///
/// Expands to a `Vec<(&str, Value)>` suitable for
/// [`Query::filter`](crate::Query::filter) and
/// [`Query::exclude`](crate::Query::exclude). Each value is converted with
/// `Value::from`, so entries may mix types freely.
///
/// # Example
///
/// ```
/// use loiter::{lookups, Value};
///
/// let lookups = lookups! { age__gte: 30, sex: "female" };
/// assert_eq!(lookups[0], ("age__gte", Value::from(30)));
/// assert_eq!(lookups[1], ("sex", Value::from("female")));
/// ```
#[macro_export]
macro_rules! lookups {
    () => {
        ::std::vec::Vec::<(&str, $crate::Value)>::new()
    };
    ($($key:ident : $value:expr),+ $(,)?) => {
        ::std::vec![$((stringify!($key), $crate::Value::from($value))),+]
    };
    ($($key:literal : $value:expr),+ $(,)?) => {
        ::std::vec![$(($key, $crate::Value::from($value))),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_defaults_to_eq() {
        let (lookup, cmp) = Lookup::parse("age").unwrap();
        assert_eq!(lookup.segments(), ["age"]);
        assert_eq!(cmp, Cmp::Eq);
    }

    #[test]
    fn trailing_tag_is_extracted() {
        let (lookup, cmp) = Lookup::parse("age__gte").unwrap();
        assert_eq!(lookup.segments(), ["age"]);
        assert_eq!(cmp, Cmp::Gte);
    }

    #[test]
    fn nested_path_with_tag() {
        let (lookup, cmp) = Lookup::parse("a__b__c__lt").unwrap();
        assert_eq!(lookup.segments(), ["a", "b", "c"]);
        assert_eq!(cmp, Cmp::Lt);
    }

    #[test]
    fn unknown_trailing_segment_is_part_of_the_path() {
        let (lookup, cmp) = Lookup::parse("nested__id").unwrap();
        assert_eq!(lookup.segments(), ["nested", "id"]);
        assert_eq!(cmp, Cmp::Eq);
    }

    #[test]
    fn aliases_normalize() {
        assert_eq!(Lookup::parse("n__exact").unwrap().1, Cmp::Eq);
        assert_eq!(Lookup::parse("n__ge").unwrap().1, Cmp::Gte);
        assert_eq!(Lookup::parse("n__le").unwrap().1, Cmp::Lte);
    }

    #[test]
    fn bare_tag_is_invalid() {
        assert!(matches!(
            Lookup::parse("gte"),
            Err(QueryError::InvalidLookup(_))
        ));
    }

    #[test]
    fn empty_key_is_invalid() {
        assert!(matches!(Lookup::parse(""), Err(QueryError::InvalidLookup(_))));
        assert!(matches!(Lookup::path(""), Err(QueryError::InvalidLookup(_))));
    }

    #[test]
    fn empty_segment_is_invalid() {
        assert!(matches!(
            Lookup::parse("a____b"),
            Err(QueryError::InvalidLookup(_))
        ));
        assert!(matches!(
            Lookup::path("a__"),
            Err(QueryError::InvalidLookup(_))
        ));
    }

    #[test]
    fn path_keeps_trailing_tags() {
        let lookup = Lookup::path("score__gte").unwrap();
        assert_eq!(lookup.segments(), ["score", "gte"]);
    }

    #[test]
    fn display_round_trips_the_key() {
        let (lookup, _) = Lookup::parse("a__b__c").unwrap();
        assert_eq!(lookup.to_string(), "a__b__c");
    }
}
