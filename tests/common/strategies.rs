use proptest::prelude::*;

/// Distinct user ids for an assignee pool
pub fn assignee_pool_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::hash_set(1i64..10_000, 1..8).prop_map(|ids| {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids
    })
}

/// Raw intention strings as they arrive from classifiers and operators
pub fn intention_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("interested".to_string())),
        Just(Some(" Interested ".to_string())),
        Just(Some("not_interested".to_string())),
        Just(Some("Not Interested".to_string())),
        "[a-z ]{0,12}".prop_map(Some),
    ]
}

/// Assignee pool plus a lead count of up to four full rotations
pub fn pool_and_lead_count_strategy() -> impl Strategy<Value = (Vec<i64>, usize)> {
    assignee_pool_strategy().prop_flat_map(|pool| {
        let rotations = pool.len() * 4;
        (Just(pool), 0..rotations)
    })
}
