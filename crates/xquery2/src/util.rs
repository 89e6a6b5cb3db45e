//! Small, pure helpers shared by the controller and processor stages.

/// Partition `[a, b]` at the given boundary values.
///
/// Each boundary value `v` that falls strictly inside `[a, b-1]` becomes the right end of
/// one sub-interval and `v + 1` becomes the start of the next; values outside `[a, b-1]`
/// are ignored. Duplicate and out-of-order values are tolerated.
pub fn split_interval(a: i64, b: i64, values: &[i64]) -> Vec<(i64, i64)> {
    let mut boundaries: Vec<i64> = values.iter().copied().filter(|&v| v >= a && v < b).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut result = Vec::with_capacity(boundaries.len() + 1);
    let mut start = a;
    for v in boundaries {
        result.push((start, v));
        start = v + 1;
    }
    result.push((start, b));
    result
}

/// Split a slice into consecutive runs sharing the same key, used to group log entries
/// by block number during a scan.
///
/// The input is assumed already sorted by `key`; unlike `itertools::group_by`, we don't
/// require `Ord`, only `Eq`.
pub fn bundled<T, K, F>(items: Vec<T>, key: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> K,
    K: Eq,
{
    let mut groups: Vec<Vec<T>> = Vec::new();
    for item in items {
        match groups.last_mut() {
            Some(group) if key(group.last().unwrap()) == key(&item) => group.push(item),
            _ => groups.push(vec![item]),
        }
    }
    groups
}

/// Yield successive chunks of at most `size` elements, used to batch log entries into jobs.
pub fn batched<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut out = Vec::with_capacity(items.len().div_ceil(size.max(1)));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        out.push(iter.by_ref().take(size).collect());
    }
    out
}
