//! Merging two observed orderings of the same stops into one sequence.

use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Merges two partial orders positionally.
///
/// Heads that agree are emitted once. When one head shows up later in the other
/// sequence, the other sequence catches up first. Heads found in neither remainder are
/// interleaved `a` then `b`. Leftovers of the longer input are appended.
///
/// Every element of either input appears exactly once in the result.
pub fn merge<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let mut emitted: FxHashSet<&T> = FxHashSet::default();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            push_unseen(&a[i], &mut out, &mut emitted);
            i += 1;
            j += 1;
        } else if b[j + 1..].contains(&a[i]) {
            push_unseen(&b[j], &mut out, &mut emitted);
            j += 1;
        } else if a[i + 1..].contains(&b[j]) {
            push_unseen(&a[i], &mut out, &mut emitted);
            i += 1;
        } else {
            push_unseen(&a[i], &mut out, &mut emitted);
            push_unseen(&b[j], &mut out, &mut emitted);
            i += 1;
            j += 1;
        }
    }
    for item in a[i..].iter().chain(&b[j..]) {
        push_unseen(item, &mut out, &mut emitted);
    }
    out
}

fn push_unseen<'a, T>(item: &'a T, out: &mut Vec<T>, emitted: &mut FxHashSet<&'a T>)
where
    T: Eq + Hash + Clone,
{
    if emitted.insert(item) {
        out.push(item.clone());
    }
}
