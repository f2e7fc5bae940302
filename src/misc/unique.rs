/// Keep the first of every group of items that `same` considers equal.
/// Quadratic in the number of kept items.
pub fn unique_by<V, F>(items: Vec<V>, same: F) -> Vec<V>
where
    F: Fn(&V, &V) -> bool,
{
    let mut kept: Vec<V> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|k| same(k, &item)) {
            kept.push(item);
        }
    }
    kept
}
