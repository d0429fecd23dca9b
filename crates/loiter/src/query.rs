//! The chainable query node.
//!
//! A [`Query`] is an immutable recipe: a handle on an upstream source plus
//! the ordered list of pending operations. Every chain method takes `&self`
//! and returns a fresh node, so forking a chain is always safe and parents
//! are never affected by their children. Nothing here evaluates records;
//! materialization lives in [`Rows`](crate::Rows) and the eager methods
//! built on it.

use std::fmt;
use std::ops::{BitOr, Bound, RangeBounds};
use std::sync::{Arc, Mutex};

use crate::cmp::Predicate;
use crate::error::Result;
use crate::ordering::OrderKey;
use crate::record::Row;
use crate::value::Value;

pub(crate) type OnceCell<T> = Arc<Mutex<Option<Box<dyn Iterator<Item = T>>>>>;

/// Upstream handle of a query node.
///
/// Nodes only ever hold references: the root buffer and one-shot cell are
/// shared through `Arc`, and combining nodes (`Chain`, `Slice`) wrap whole
/// child queries.
pub(crate) enum Source<T> {
    Items(Arc<Vec<T>>),
    Once(OnceCell<T>),
    Chain(Arc<Query<T>>, Arc<Query<T>>),
    Slice {
        inner: Arc<Query<T>>,
        skip: usize,
        take: Option<usize>,
    },
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Source::Items(items) => Source::Items(Arc::clone(items)),
            Source::Once(cell) => Source::Once(Arc::clone(cell)),
            Source::Chain(first, second) => {
                Source::Chain(Arc::clone(first), Arc::clone(second))
            }
            Source::Slice { inner, skip, take } => Source::Slice {
                inner: Arc::clone(inner),
                skip: *skip,
                take: *take,
            },
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            Source::Once(_) => f.write_str("Once"),
            Source::Chain(..) => f.write_str("Chain"),
            Source::Slice { skip, take, .. } => f
                .debug_struct("Slice")
                .field("skip", skip)
                .field("take", take)
                .finish_non_exhaustive(),
        }
    }
}

/// A named derived-value computation.
pub(crate) struct Annotation<T> {
    pub(crate) name: String,
    pub(crate) compute: Arc<dyn Fn(&Row<T>) -> Result<Value>>,
}

impl<T> Clone for Annotation<T> {
    fn clone(&self) -> Self {
        Annotation {
            name: self.name.clone(),
            compute: Arc::clone(&self.compute),
        }
    }
}

impl<T> fmt::Debug for Annotation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One pending pipeline operation.
pub(crate) enum Step<T> {
    Filter(Vec<Predicate>),
    Exclude(Vec<Predicate>),
    Annotate(Annotation<T>),
}

impl<T> Clone for Step<T> {
    fn clone(&self) -> Self {
        match self {
            Step::Filter(predicates) => Step::Filter(predicates.clone()),
            Step::Exclude(predicates) => Step::Exclude(predicates.clone()),
            Step::Annotate(annotation) => Step::Annotate(annotation.clone()),
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Filter(predicates) => f.debug_tuple("Filter").field(predicates).finish(),
            Step::Exclude(predicates) => f.debug_tuple("Exclude").field(predicates).finish(),
            Step::Annotate(annotation) => f.debug_tuple("Annotate").field(annotation).finish(),
        }
    }
}

/// A lazy, chainable query over an in-memory collection of records.
///
/// Chaining (`filter`, `exclude`, `annotate`, `order_by`, `reverse`,
/// `union`, `slice`, `all`) only builds a recipe; recipe errors (malformed
/// lookup keys, unknown tags, bad regex patterns) surface from the chain
/// call itself. Records are evaluated only by the materializing calls
/// ([`iter`](Query::iter), [`count`](Query::count), [`get`](Query::get),
/// [`first`](Query::first), [`exists`](Query::exists),
/// [`to_vec`](Query::to_vec)), and record-level failures end that
/// materialization.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
///
/// use loiter::{lookups, Query, Value};
///
/// let people: Query<BTreeMap<String, Value>> = vec![
///     BTreeMap::from([
///         ("age".to_string(), Value::from(24i64)),
///         ("sex".to_string(), Value::from("female")),
///     ]),
///     BTreeMap::from([
///         ("age".to_string(), Value::from(75i64)),
///         ("sex".to_string(), Value::from("male")),
///     ]),
///     BTreeMap::from([
///         ("age".to_string(), Value::from(43i64)),
///         ("sex".to_string(), Value::from("female")),
///     ]),
/// ]
/// .into();
///
/// let middle_aged = people.filter(lookups! { age__gte: 30, age__lt: 75 }).unwrap();
/// let rows = middle_aged.to_vec().unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].value("age").unwrap(), Value::from(43i64));
///
/// // The parent chain is untouched and independently iterable.
/// assert_eq!(people.count().unwrap(), 3);
/// ```
pub struct Query<T> {
    pub(crate) source: Source<T>,
    pub(crate) steps: Vec<Step<T>>,
    pub(crate) order: Vec<OrderKey>,
    pub(crate) reversed: bool,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Query {
            source: self.source.clone(),
            steps: self.steps.clone(),
            order: self.order.clone(),
            reversed: self.reversed,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("source", &self.source)
            .field("steps", &self.steps)
            .field("order", &self.order)
            .field("reversed", &self.reversed)
            .finish()
    }
}

impl<T> Query<T> {
    fn with_source(source: Source<T>) -> Self {
        Query {
            source,
            steps: Vec::new(),
            order: Vec::new(),
            reversed: false,
        }
    }

    /// Creates a query over a re-iterable buffer of records.
    ///
    /// The buffer is shared, never copied, between all queries chained off
    /// this one; every materialization re-reads it from the start.
    pub fn new(items: Vec<T>) -> Self {
        Query::with_source(Source::Items(Arc::new(items)))
    }

    /// Wraps a one-shot iterator without buffering it.
    ///
    /// The first materialization consumes the iterator as it streams; any
    /// later materialization (from this query or any query chained off it)
    /// fails with [`SourceExhausted`](crate::QueryError::SourceExhausted).
    pub fn once<I>(iterator: I) -> Self
    where
        I: Iterator<Item = T> + 'static,
    {
        Query::with_source(Source::Once(Arc::new(Mutex::new(Some(Box::new(
            iterator,
        ))))))
    }

    /// Returns a query keeping only records matching **every** lookup.
    ///
    /// Lookup keys parse eagerly; a malformed key fails here, before any
    /// record is touched. An empty lookup list keeps everything.
    pub fn filter<L, K, V>(&self, lookups: L) -> Result<Self>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let predicates = parse_predicates(lookups)?;
        let mut next = self.clone();
        if !predicates.is_empty() {
            next.steps.push(Step::Filter(predicates));
        }
        Ok(next)
    }

    /// Returns a query dropping records matching **every** lookup.
    ///
    /// The negation applies to the conjunction of all given lookups, not to
    /// each lookup individually: a record survives as soon as one lookup
    /// fails for it. An empty lookup list keeps everything.
    pub fn exclude<L, K, V>(&self, lookups: L) -> Result<Self>
    where
        L: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let predicates = parse_predicates(lookups)?;
        let mut next = self.clone();
        if !predicates.is_empty() {
            next.steps.push(Step::Exclude(predicates));
        }
        Ok(next)
    }

    /// Returns a query that attaches a derived value under `name`.
    ///
    /// The computation runs once per record at materialization time, never
    /// earlier, and sees the record with all previously chained annotations
    /// applied. The new field shares the namespace of the record's own
    /// fields and may shadow one; the underlying record is never modified.
    /// Errors returned by the computation are record-level failures.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::BTreeMap;
    ///
    /// use loiter::{Query, Value};
    ///
    /// let records = vec![BTreeMap::from([("n".to_string(), Value::from(20i64))])];
    /// let doubled = Query::new(records).annotate("twice", |row| {
    ///     let n = row.value("n")?.as_number().map(|n| n.to_f64()).unwrap_or(0.0);
    ///     Ok(Value::from(n * 2.0))
    /// });
    ///
    /// let rows = doubled.to_vec().unwrap();
    /// assert_eq!(rows[0].value("twice").unwrap(), Value::from(40i64));
    /// ```
    pub fn annotate<F>(&self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Row<T>) -> Result<Value> + 'static,
    {
        let mut next = self.clone();
        next.steps.push(Step::Annotate(Annotation {
            name: name.into(),
            compute: Arc::new(compute),
        }));
        next
    }

    /// Returns a query with a full ordering specification.
    ///
    /// Keys sort lexicographically, first key primary, each key ascending
    /// unless prefixed with `-`. The specification replaces any previously
    /// recorded one and clears a pending reversal; no sorting happens until
    /// materialization, which buffers the whole sequence.
    pub fn order_by<I, S>(&self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut order = Vec::new();
        for key in keys {
            order.push(OrderKey::parse(key.as_ref())?);
        }

        let mut next = self.clone();
        next.order = order;
        next.reversed = false;
        Ok(next)
    }

    /// Returns a query yielding results in the opposite order.
    ///
    /// With an ordering recorded, every key's direction is inverted and
    /// records tied on all keys keep their upstream order; without one, the
    /// materialized sequence is reversed end-to-end. Either way this
    /// applies to the sequence as filtered and annotated, not to the raw
    /// upstream, and buffers at materialization time. Reversing twice is
    /// the identity.
    pub fn reverse(&self) -> Self {
        let mut next = self.clone();
        next.reversed = !next.reversed;
        next
    }

    /// Returns a query concatenating this query's results with `other`'s.
    ///
    /// Pure concatenation: no de-duplication, self's records first. Each
    /// side runs its own full pipeline; chain an
    /// [`order_by`](Query::order_by) after the union when a global order is
    /// required.
    pub fn union(&self, other: &Query<T>) -> Query<T> {
        Query::with_source(Source::Chain(
            Arc::new(self.clone()),
            Arc::new(other.clone()),
        ))
    }

    /// Returns an independent snapshot of this chain.
    ///
    /// Chaining is already non-mutating, so this is plain cloning; it
    /// exists to mark a branch point by intent.
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// Returns a lazy query over a positional sub-range of the results.
    ///
    /// Unlike [`get`](Query::get) this is not eager: the bound is applied
    /// while streaming, and the returned query chains like any other.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let skip = match range.start_bound() {
            Bound::Included(n) => *n,
            Bound::Excluded(n) => n + 1,
            Bound::Unbounded => 0,
        };
        let take = match range.end_bound() {
            Bound::Included(n) => Some((n + 1).saturating_sub(skip)),
            Bound::Excluded(n) => Some(n.saturating_sub(skip)),
            Bound::Unbounded => None,
        };

        Query::with_source(Source::Slice {
            inner: Arc::new(self.clone()),
            skip,
            take,
        })
    }
}

fn parse_predicates<L, K, V>(lookups: L) -> Result<Vec<Predicate>>
where
    L: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut predicates = Vec::new();
    for (key, operand) in lookups {
        predicates.push(Predicate::parse(key.as_ref(), operand)?);
    }
    Ok(predicates)
}

impl<T> From<Vec<T>> for Query<T> {
    fn from(items: Vec<T>) -> Self {
        Query::new(items)
    }
}

impl<T> FromIterator<T> for Query<T> {
    /// Collects into a re-iterable root buffer.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Query::new(iter.into_iter().collect())
    }
}

impl<T> BitOr for &Query<T> {
    type Output = Query<T>;

    /// The OR combination: an alias for [`Query::union`].
    fn bitor(self, other: &Query<T>) -> Query<T> {
        self.union(other)
    }
}
