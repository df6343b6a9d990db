//! Second labeling pass: union-find roots to contiguous cluster ids.

/// Rewrites an associated label table into cluster ids `1..=k` and returns `k`.
///
/// Roots receive ids in ascending index order. Every other entry points at a
/// strictly smaller index that has already been rewritten, so one lookup
/// through its parent yields the final id.
pub fn compact_labels(labels: &mut [u32]) -> u32 {
    let mut clusters = 0u32;
    for i in 0..labels.len() {
        let parent = labels[i];
        labels[i] = if parent as usize == i {
            clusters += 1;
            clusters
        } else {
            debug_assert!((parent as usize) < i, "parent {parent} not below {i}");
            labels[parent as usize]
        };
    }
    clusters
}
