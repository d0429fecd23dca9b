//! Loiter - lazy, chainable queries over in-memory record collections.
//!
//! Loiter gives you a copy-safe query object that defers all work until
//! results are actually consumed. Chaining builds a recipe; iterating (or
//! counting, indexing, collecting) pulls records through it in a single
//! pass, so filtering pipelines over large collections never materialize
//! intermediate results. It supports:
//!
//! - Keyword-style lookups with nested paths: `age__gte`, `address__city`
//! - A fixed comparator registry: equality, membership, substring, regex,
//!   and ordering comparisons
//! - `filter` / `exclude` with AND-ed predicates
//! - Derived values via `annotate`, visible to later chain steps
//! - Multi-key stable ordering, reversal, slicing, and union
//!
//! # Quick Start
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use loiter::{lookups, Query, Value};
//!
//! fn person(age: i64, sex: &str) -> BTreeMap<String, Value> {
//!     BTreeMap::from([
//!         ("age".to_string(), Value::from(age)),
//!         ("sex".to_string(), Value::from(sex)),
//!     ])
//! }
//!
//! let people = Query::new(vec![
//!     person(24, "female"),
//!     person(75, "male"),
//!     person(43, "female"),
//! ]);
//!
//! // Chaining builds a recipe; no record has been touched yet.
//! let middle_aged = people.filter(lookups! { age__gte: 30, age__lt: 75 }).unwrap();
//!
//! // Materializing pulls records through the pipeline.
//! let rows = middle_aged.to_vec().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].value("age").unwrap(), Value::from(43));
//!
//! // Ordering: `-` means descending, later keys break ties.
//! let by_sex = people.order_by(["-sex", "age"]).unwrap();
//! let rows = by_sex.to_vec().unwrap();
//! assert_eq!(rows[0].value("sex").unwrap(), Value::from("male"));
//! assert_eq!(rows[1].value("age").unwrap(), Value::from(24));
//! assert_eq!(rows[2].value("age").unwrap(), Value::from(43));
//! ```
//!
//! # Lookups
//!
//! A lookup key names an attribute path, segments joined by `__`, with an
//! optional trailing comparator tag: `eq`/`exact` (the default), `in`,
//! `contains`, `regex`, `gt`, `gte`/`ge`, `lt`, `lte`/`le`. A trailing
//! segment that is not a registered tag is part of the path, so
//! `nested__id` filters on `id` inside `nested`.
//!
//! Records are anything implementing [`Record`]; implementations ship for
//! `BTreeMap<String, Value>`, `HashMap<String, Value>`, and nested
//! [`Value`] maps.
//!
//! # Laziness and errors
//!
//! The contract has two phases. Building the recipe fails only on malformed
//! recipes - bad lookup keys, unknown comparator tags, invalid regex
//! patterns - and those errors surface from the chain call itself.
//! Evaluation happens only in the explicitly materializing calls
//! ([`Query::iter`], [`Query::count`], [`Query::get`], [`Query::first`],
//! [`Query::exists`], [`Query::to_vec`]); a record missing a looked-up
//! attribute or comparing across kinds fails there, and the failure ends
//! that materialization rather than silently skipping the record.
//!
//! Queries are immutable: sharing one across call sites and iterating it
//! from each is always safe. The one caveat is a [`Query::once`] source,
//! which is single-pass by nature - the second materialization reports
//! [`QueryError::SourceExhausted`].

mod cmp;
mod error;
mod lookup;
mod ordering;
mod query;
mod record;
mod rows;
mod value;

// Re-export public API
pub use cmp::{Cmp, Predicate};
pub use error::{QueryError, Result};
pub use lookup::{Lookup, DELIMITER};
pub use ordering::{compare_values, Dir, OrderKey};
pub use query::Query;
pub use record::{Record, Row};
pub use rows::Rows;
pub use value::{Number, Value};
