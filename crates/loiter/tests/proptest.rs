//! Property-based tests for loiter using proptest.

use std::collections::BTreeMap;

use proptest::prelude::*;

use loiter::{lookups, Number, Query, Row, Value};

// ============================================================================
// Test helpers
// ============================================================================

type Rec = BTreeMap<String, Value>;

/// Record with a unique position marker and a small group key, so that
/// stability among tied records is observable.
fn record(position: usize, group: i64) -> Rec {
    BTreeMap::from([
        ("position".to_string(), Value::from(position)),
        ("group".to_string(), Value::from(group)),
    ])
}

fn dataset(groups: &[i64]) -> Query<Rec> {
    Query::new(
        groups
            .iter()
            .enumerate()
            .map(|(position, group)| record(position, *group))
            .collect(),
    )
}

fn group_of(row: &Row<Rec>) -> i64 {
    match row.value("group").unwrap() {
        Value::Number(Number::I64(group)) => group,
        other => panic!("group is not an integer: {other:?}"),
    }
}

fn position_of(row: &Row<Rec>) -> u64 {
    match row.value("position").unwrap() {
        Value::Number(Number::U64(position)) => position,
        other => panic!("position is not an integer: {other:?}"),
    }
}

fn groups_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..5, 0..40)
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Filtering never grows the collection.
    #[test]
    fn filter_never_grows_the_collection(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let query = dataset(&groups);
        let filtered = query.filter(lookups! { group__gte: threshold }).unwrap();

        prop_assert!(filtered.count().unwrap() <= groups.len());
    }

    /// A filter and its exclude partition the source: every record lands in
    /// exactly one of the two.
    #[test]
    fn filter_and_exclude_partition_the_source(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let query = dataset(&groups);
        let kept = query.filter(lookups! { group__lt: threshold }).unwrap();
        let dropped = query.exclude(lookups! { group__lt: threshold }).unwrap();

        prop_assert_eq!(
            kept.count().unwrap() + dropped.count().unwrap(),
            groups.len()
        );

        // Their union holds every position exactly once.
        let mut positions: Vec<u64> = kept
            .union(&dropped)
            .to_vec()
            .unwrap()
            .iter()
            .map(position_of)
            .collect();
        positions.sort_unstable();
        let expected: Vec<u64> = (0..groups.len() as u64).collect();
        prop_assert_eq!(positions, expected);
    }

    /// Counting equals driving the full iteration.
    #[test]
    fn count_equals_iteration_length(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let filtered = dataset(&groups)
            .filter(lookups! { group__gte: threshold })
            .unwrap();

        prop_assert_eq!(filtered.count().unwrap(), filtered.to_vec().unwrap().len());
    }

    /// Ordering sorts by the key and keeps tied records in upstream order.
    #[test]
    fn ordering_is_sorted_and_stable(groups in groups_strategy()) {
        let rows = dataset(&groups)
            .order_by(["group"])
            .unwrap()
            .to_vec()
            .unwrap();

        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(group_of(a) <= group_of(b), "sort order violated");
            if group_of(a) == group_of(b) {
                prop_assert!(
                    position_of(a) < position_of(b),
                    "stable sort violated: tied records reordered"
                );
            }
        }
    }

    /// Reversing an ordered query equals sorting by the inverted direction.
    #[test]
    fn reverse_equals_inverted_direction(groups in groups_strategy()) {
        let query = dataset(&groups);
        let reversed = query.order_by(["group"]).unwrap().reverse().to_vec().unwrap();
        let inverted = query.order_by(["-group"]).unwrap().to_vec().unwrap();

        prop_assert_eq!(reversed, inverted);
    }

    /// Reversing twice is the identity.
    #[test]
    fn reverse_twice_is_identity(groups in groups_strategy()) {
        let query = dataset(&groups);
        let plain = query.to_vec().unwrap();
        let twice = query.reverse().reverse().to_vec().unwrap();

        prop_assert_eq!(plain, twice);
    }

    /// Positional indexing agrees with the materialized list.
    #[test]
    fn get_matches_the_materialized_list(groups in groups_strategy()) {
        let query = dataset(&groups);
        let rows = query.to_vec().unwrap();

        for (index, row) in rows.iter().enumerate() {
            let got = query.get(index as i64).unwrap();
            prop_assert_eq!(got.as_ref(), Some(row));
        }
        if !rows.is_empty() {
            let got = query.get(-1).unwrap();
            prop_assert_eq!(got.as_ref(), rows.last());
        }
        prop_assert!(query.get(rows.len() as i64).unwrap().is_none());
    }

    /// Slicing matches slicing the materialized list and stays lazy.
    #[test]
    fn slice_matches_the_materialized_list(
        groups in groups_strategy(),
        start in 0usize..45,
        len in 0usize..45,
    ) {
        let query = dataset(&groups);
        let rows = query.to_vec().unwrap();

        let end = (start + len).min(rows.len());
        let expected: &[Row<Rec>] = if start < rows.len() {
            &rows[start..end]
        } else {
            &[]
        };

        let sliced = query.slice(start..start + len).to_vec().unwrap();
        prop_assert_eq!(sliced.as_slice(), expected);
    }

    /// A union's length is the sum of both sides; no de-duplication occurs.
    #[test]
    fn union_length_is_the_sum_of_both_sides(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let query = dataset(&groups);
        let left = query.filter(lookups! { group__lt: threshold }).unwrap();
        let right = query.all();

        prop_assert_eq!(
            left.union(&right).count().unwrap(),
            left.count().unwrap() + groups.len()
        );
    }

    /// A union followed by an ordering is globally sorted.
    #[test]
    fn union_with_trailing_order_is_globally_sorted(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let query = dataset(&groups);
        let left = query.filter(lookups! { group__lt: threshold }).unwrap();
        let right = query.exclude(lookups! { group__lt: threshold }).unwrap();

        let rows = left.union(&right).order_by(["group"]).unwrap().to_vec().unwrap();
        for pair in rows.windows(2) {
            prop_assert!(group_of(&pair[0]) <= group_of(&pair[1]));
        }
    }

    /// Deriving children never changes what the parent yields.
    #[test]
    fn parents_are_unaffected_by_children(
        groups in groups_strategy(),
        threshold in 0i64..5,
    ) {
        let parent = dataset(&groups);
        let before = parent.to_vec().unwrap();

        let _filtered = parent.filter(lookups! { group__gte: threshold }).unwrap();
        let _ordered = parent.order_by(["-group"]).unwrap();
        let _reversed = parent.reverse();
        let _annotated = parent.annotate("noise", |_| Ok(Value::Null));

        prop_assert_eq!(parent.to_vec().unwrap(), before);
    }
}

// ============================================================================
// Additional edge cases
// ============================================================================

#[test]
fn empty_collection_is_well_behaved() {
    let query = dataset(&[]);

    assert_eq!(query.count().unwrap(), 0);
    assert!(query.to_vec().unwrap().is_empty());
    assert!(!query.exists().unwrap());
    assert!(query.first().unwrap().is_none());
    assert!(query.get(0).unwrap().is_none());
    assert!(query.get(-1).unwrap().is_none());
    assert!(query
        .order_by(["group"])
        .unwrap()
        .to_vec()
        .unwrap()
        .is_empty());
}

#[test]
fn slice_of_zero_length_is_empty() {
    let query = dataset(&[1, 2, 3]);
    assert_eq!(query.slice(1..1).count().unwrap(), 0);
}
