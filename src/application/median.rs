// Exact median of a small in-memory set

/// Median of `values`, or `None` when empty.
///
/// Two values average to their mean; larger sets are sorted on a copy so the
/// caller's slice is left untouched.
pub fn median(values: &[f64]) -> Option<f64> {
    match values {
        [] => None,
        [only] => Some(*only),
        [a, b] => Some(0.5 * (a + b)),
        _ => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 1 {
                Some(sorted[mid])
            } else {
                Some(0.5 * (sorted[mid - 1] + sorted[mid]))
            }
        }
    }
}
