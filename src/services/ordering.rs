/// Lecture ordering rules: `order_index` values within a course are 1-based
/// and contiguous. Creation appends at the end; deletion closes the gap.

pub(crate) fn next_order(existing_count: i64) -> i32 {
    existing_count as i32 + 1
}

/// Computes the renumbering needed after a deletion. `remaining` holds the
/// surviving lectures as (id, order_index), already sorted ascending by
/// order. Returns only the lectures whose order actually changes.
pub(crate) fn plan_renumbering(remaining: &[(String, i32)]) -> Vec<(String, i32)> {
    remaining
        .iter()
        .enumerate()
        .filter_map(|(index, (id, order))| {
            let target = index as i32 + 1;
            if *order != target {
                Some((id.clone(), target))
            } else {
                None
            }
        })
        .collect()
}
