//! Union-find over a flat label table.
//!
//! `labels[e]` is the parent of element `e`; an element pointing at itself is
//! a root. Unions always attach the larger index under the smaller one, so
//! the root of every tree is its lowest-indexed member. The compaction pass
//! depends on that.

/// Follows parent links from `e` up to its root.
///
/// Trees are not compressed on the way.
#[inline]
pub fn find_root(labels: &[u32], e: u32) -> u32 {
    let mut r = e;
    while labels[r as usize] != r {
        r = labels[r as usize];
    }
    r
}

/// Links `e1` and `e2`, keeping the smaller index as the representative.
///
/// Both arguments must be roots. Returns the surviving root.
#[inline]
pub fn make_union(labels: &mut [u32], e1: u32, e2: u32) -> u32 {
    let (root, child) = if e1 < e2 { (e1, e2) } else { (e2, e1) };
    labels[child as usize] = root;
    root
}
