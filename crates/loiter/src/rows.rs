//! Materialization: pulling records through a query's recipe.
//!
//! [`Rows`] is the single driver behind every evaluation entry point. A
//! plain pipeline streams: one upstream record is pulled at a time, the
//! chained steps run in order, and survivors are yielded as they appear. A
//! query carrying an order specification or a reversal buffers the whole
//! filtered sequence first, sorts it stably, and yields from the buffer.
//!
//! The first record-level error ends the iteration; nothing is skipped
//! silently.

use std::cmp::Ordering;
use std::mem;
use std::sync::{Arc, PoisonError};

use crate::error::{QueryError, Result};
use crate::ordering::compare_values;
use crate::query::{Query, Source, Step};
use crate::record::{resolve, Record, Row};

impl<T: Record + Clone + 'static> Query<T> {
    /// Starts a fresh materialization of this query.
    ///
    /// Each call re-reads the upstream from its start (for a one-shot
    /// source, the second call fails with
    /// [`SourceExhausted`](QueryError::SourceExhausted)). The iterator
    /// yields `Result` items; the first `Err` is final.
    pub fn iter(&self) -> Rows<T> {
        Rows {
            state: State::Pending(self.clone()),
        }
    }

    /// Materializes the whole query into a vector.
    pub fn to_vec(&self) -> Result<Vec<Row<T>>> {
        self.iter().collect()
    }

    /// Counts the records surviving the pipeline.
    ///
    /// O(n) in general; when the source is a root buffer and no filtering
    /// or ordering is pending, the buffer length is returned directly.
    pub fn count(&self) -> Result<usize> {
        if let Some(len) = self.fast_len() {
            return Ok(len);
        }

        let mut count = 0;
        for row in self.iter() {
            row?;
            count += 1;
        }
        Ok(count)
    }

    fn fast_len(&self) -> Option<usize> {
        let filtering = self
            .steps
            .iter()
            .any(|step| matches!(step, Step::Filter(_) | Step::Exclude(_)));

        match &self.source {
            Source::Items(items) if !filtering && self.order.is_empty() => Some(items.len()),
            _ => None,
        }
    }

    /// Returns the record at `index`, counting from the end for negative
    /// indices.
    ///
    /// Eager by design: a non-negative index drives the pipeline up to that
    /// position, a negative index forces a full materialization. Out of
    /// range is `Ok(None)`.
    pub fn get(&self, index: i64) -> Result<Option<Row<T>>> {
        if index < 0 {
            let rows = self.to_vec()?;
            let offset = rows.len() as i64 + index;
            if offset < 0 {
                return Ok(None);
            }
            return Ok(rows.into_iter().nth(offset as usize));
        }

        let mut rows = self.iter();
        for _ in 0..index {
            match rows.next() {
                Some(Ok(_)) => {}
                Some(Err(error)) => return Err(error),
                None => return Ok(None),
            }
        }
        rows.next().transpose()
    }

    /// Returns the first surviving record, if any.
    pub fn first(&self) -> Result<Option<Row<T>>> {
        self.get(0)
    }

    /// Returns `true` if any record survives the pipeline.
    ///
    /// Stops at the first survivor when no ordering is pending.
    pub fn exists(&self) -> Result<bool> {
        match self.iter().next() {
            Some(Ok(_)) => Ok(true),
            Some(Err(error)) => Err(error),
            None => Ok(false),
        }
    }
}

impl<'a, T: Record + Clone + 'static> IntoIterator for &'a Query<T> {
    type Item = Result<Row<T>>;
    type IntoIter = Rows<T>;

    fn into_iter(self) -> Rows<T> {
        self.iter()
    }
}

/// Iterator over a query's materialized records.
///
/// Created by [`Query::iter`]. Yields `Result<Row<T>>`; after the first
/// `Err` (or the end of the sequence) the iterator is fused.
pub struct Rows<T> {
    state: State<T>,
}

enum State<T> {
    Pending(Query<T>),
    Streaming(Pipeline<T>),
    Buffered(std::vec::IntoIter<Row<T>>),
    Done,
}

impl<T: Record + Clone + 'static> Iterator for Rows<T> {
    type Item = Result<Row<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                State::Pending(_) => {
                    let query = match mem::replace(&mut self.state, State::Done) {
                        State::Pending(query) => query,
                        _ => return None,
                    };
                    if query.order.is_empty() && !query.reversed {
                        self.state = State::Streaming(Pipeline::new(&query));
                    } else {
                        match buffer_ordered(&query) {
                            Ok(rows) => self.state = State::Buffered(rows.into_iter()),
                            Err(error) => return Some(Err(error)),
                        }
                    }
                }
                State::Streaming(pipeline) => {
                    return match pipeline.next() {
                        Some(Ok(row)) => Some(Ok(row)),
                        Some(Err(error)) => {
                            self.state = State::Done;
                            Some(Err(error))
                        }
                        None => {
                            self.state = State::Done;
                            None
                        }
                    };
                }
                State::Buffered(rows) => return rows.next().map(Ok),
                State::Done => return None,
            }
        }
    }
}

/// Drives the full pipeline, then sorts and/or reverses the buffer.
///
/// Sort keys are resolved once per record before sorting; a resolution
/// failure or a cross-kind comparison aborts the whole operation, since a
/// partially sorted sequence is not a valid result.
fn buffer_ordered<T: Record + Clone + 'static>(query: &Query<T>) -> Result<Vec<Row<T>>> {
    let mut rows = Vec::new();
    let mut pipeline = Pipeline::new(query);
    while let Some(row) = pipeline.next() {
        rows.push(row?);
    }

    if !query.order.is_empty() {
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            let mut key = Vec::with_capacity(query.order.len());
            for order_key in &query.order {
                key.push(resolve(&row, order_key.lookup())?);
            }
            keyed.push((key, row));
        }

        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            for (index, order_key) in query.order.iter().enumerate() {
                match compare_values(&a[index], &b[index]) {
                    Ok(Some(ordering)) => {
                        let mut ordering = order_key.dir().apply(ordering);
                        // A pending reversal inverts every key's direction;
                        // ties keep their upstream order either way.
                        if query.reversed {
                            ordering = ordering.reverse();
                        }
                        if ordering != Ordering::Equal {
                            return ordering;
                        }
                    }
                    // NaN ties: stable order preserved.
                    Ok(None) => {}
                    Err(error) => {
                        if failure.is_none() {
                            failure = Some(error);
                        }
                        return Ordering::Equal;
                    }
                }
            }
            Ordering::Equal
        });
        if let Some(error) = failure {
            return Err(error);
        }

        rows.extend(keyed.into_iter().map(|(_, row)| row));
    } else if query.reversed {
        rows.reverse();
    }

    Ok(rows)
}

/// The streaming pass: upstream feed plus the chained steps.
struct Pipeline<T> {
    feed: Feed<T>,
    steps: Vec<Step<T>>,
}

impl<T: Record + Clone + 'static> Pipeline<T> {
    fn new(query: &Query<T>) -> Self {
        Pipeline {
            feed: Feed::new(&query.source),
            steps: query.steps.clone(),
        }
    }
}

impl<T: Record + Clone + 'static> Iterator for Pipeline<T> {
    type Item = Result<Row<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        'records: loop {
            let mut row = match self.feed.next()? {
                Ok(row) => row,
                Err(error) => return Some(Err(error)),
            };

            for step in &self.steps {
                match step {
                    Step::Filter(predicates) => {
                        for predicate in predicates {
                            match predicate.matches(&row) {
                                Ok(true) => {}
                                Ok(false) => continue 'records,
                                Err(error) => return Some(Err(error)),
                            }
                        }
                    }
                    Step::Exclude(predicates) => {
                        // Dropped only when the whole conjunction holds.
                        let mut all_match = true;
                        for predicate in predicates {
                            match predicate.matches(&row) {
                                Ok(true) => {}
                                Ok(false) => {
                                    all_match = false;
                                    break;
                                }
                                Err(error) => return Some(Err(error)),
                            }
                        }
                        if all_match {
                            continue 'records;
                        }
                    }
                    Step::Annotate(annotation) => match (annotation.compute)(&row) {
                        Ok(value) => row.push_annotation(annotation.name.clone(), value),
                        Err(error) => return Some(Err(error)),
                    },
                }
            }

            return Some(Ok(row));
        }
    }
}

/// Upstream record feed for one pipeline pass.
enum Feed<T> {
    Buffer { items: Arc<Vec<T>>, cursor: usize },
    Taken(Box<dyn Iterator<Item = T>>),
    Spent { reported: bool },
    Chain {
        first: Option<Box<Rows<T>>>,
        second: Option<Box<Rows<T>>>,
    },
    Slice {
        inner: Box<Rows<T>>,
        skip: usize,
        take: Option<usize>,
    },
}

impl<T: Record + Clone + 'static> Feed<T> {
    fn new(source: &Source<T>) -> Self {
        match source {
            Source::Items(items) => Feed::Buffer {
                items: Arc::clone(items),
                cursor: 0,
            },
            Source::Once(cell) => {
                let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.take() {
                    Some(iterator) => Feed::Taken(iterator),
                    None => Feed::Spent { reported: false },
                }
            }
            Source::Chain(first, second) => Feed::Chain {
                first: Some(Box::new(first.iter())),
                second: Some(Box::new(second.iter())),
            },
            Source::Slice { inner, skip, take } => Feed::Slice {
                inner: Box::new(inner.iter()),
                skip: *skip,
                take: *take,
            },
        }
    }

    fn next(&mut self) -> Option<Result<Row<T>>> {
        match self {
            Feed::Buffer { items, cursor } => {
                let item = items.get(*cursor)?.clone();
                *cursor += 1;
                Some(Ok(Row::new(item)))
            }
            Feed::Taken(iterator) => iterator.next().map(|item| Ok(Row::new(item))),
            Feed::Spent { reported } => {
                if *reported {
                    None
                } else {
                    *reported = true;
                    Some(Err(QueryError::SourceExhausted))
                }
            }
            Feed::Chain { first, second } => {
                if let Some(rows) = first {
                    match rows.next() {
                        Some(item) => return Some(item),
                        None => *first = None,
                    }
                }
                let rows = second.as_mut()?;
                match rows.next() {
                    Some(item) => Some(item),
                    None => {
                        *second = None;
                        None
                    }
                }
            }
            Feed::Slice { inner, skip, take } => {
                while *skip > 0 {
                    *skip -= 1;
                    match inner.next() {
                        Some(Ok(_)) => {}
                        Some(Err(error)) => return Some(Err(error)),
                        None => return None,
                    }
                }
                match take {
                    Some(0) => None,
                    Some(remaining) => {
                        *remaining -= 1;
                        inner.next()
                    }
                    None => inner.next(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn numbers(n: i64) -> Query<Value> {
        Query::new((0..n).map(Value::from).collect())
    }

    #[test]
    fn streaming_yields_every_record() {
        let rows: Vec<_> = numbers(4).iter().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].value("x").is_err());
    }

    #[test]
    fn fresh_iterations_restart_from_the_top() {
        let query = numbers(3);
        let first: Vec<_> = query.iter().collect::<Result<_>>().unwrap();
        let second: Vec<_> = query.iter().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn one_shot_source_is_exhausted_on_the_second_pass() {
        let query = Query::once((0i64..3).map(Value::from));
        assert_eq!(query.count().unwrap(), 3);

        let err = query.count().unwrap_err();
        assert!(matches!(err, QueryError::SourceExhausted));
    }

    #[test]
    fn fast_count_skips_the_pipeline() {
        let query = numbers(5).annotate("boom", |_| Err(QueryError::SourceExhausted));
        // Annotations alone leave the fast length usable.
        assert_eq!(query.count().unwrap(), 5);
    }

    #[test]
    fn filtered_count_drives_the_pipeline() {
        let query = numbers(5);
        // A filter on a nonexistent field must fail loudly, not count.
        let filtered = query.filter([("missing", 1i64)]).unwrap();
        assert!(filtered.count().is_err());
    }

    #[test]
    fn get_is_positional() {
        let query = numbers(5);
        assert_eq!(
            query.get(2).unwrap().unwrap().into_inner(),
            Value::from(2i64)
        );
        assert_eq!(
            query.get(-1).unwrap().unwrap().into_inner(),
            Value::from(4i64)
        );
        assert!(query.get(9).unwrap().is_none());
        assert!(query.get(-9).unwrap().is_none());
    }

    #[test]
    fn first_and_exists() {
        let query = numbers(3);
        assert_eq!(query.first().unwrap().unwrap().into_inner(), Value::from(0i64));
        assert!(query.exists().unwrap());
        assert!(!numbers(0).exists().unwrap());
        assert!(numbers(0).first().unwrap().is_none());
    }
}
