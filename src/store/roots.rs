//! Subtree root extraction.
//!
//! Given the sorted OID set of a walk, find the maximal non-overlapping
//! subtree roots so each can be registered as one managed-object group.

use std::cmp::Ordering;

use tracing::trace;

use crate::oid::Oid;

/// Compute the subtree roots of a sorted OID sequence.
///
/// The result is lexicographically sorted, pairwise prefix-free, and covers
/// every input OID exactly once.
///
/// Candidates are the longest common prefixes of adjacent OIDs; a candidate
/// survives as a root only if no shorter candidate is a prefix of it
/// (otherwise the shorter one already covers its subtree). OIDs that share
/// no prefix with any neighbor have no candidate and become their own
/// single-leaf roots.
pub fn subtree_roots<'a, I>(oids: I) -> Vec<Oid>
where
    I: IntoIterator<Item = &'a Oid> + Clone,
{
    let mut candidates: Vec<Oid> = Vec::new();

    let mut last: Option<&Oid> = None;
    for oid in oids.clone() {
        if let Some(prev) = last {
            let mut n = oid.len().min(prev.len());
            while n > 0 {
                if oid.left_most_compare(n, prev) == Ordering::Equal {
                    candidates.push(prev.prefix(n));
                    break;
                }
                n -= 1;
            }
        }
        last = Some(oid);
    }
    candidates.sort();

    let mut roots: Vec<Oid> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if candidate.is_empty() {
            continue;
        }
        let mut trimmed = candidate.trim(1);
        while !trimmed.is_empty() && candidates.binary_search(&trimmed).is_err() {
            trimmed = trimmed.trim(1);
        }
        if trimmed.is_empty() && !roots.contains(candidate) {
            roots.push(candidate.clone());
        }
    }

    // Isolated OIDs (no prefix shared with either neighbor) produced no
    // candidate; they root themselves.
    for oid in oids {
        if !roots.iter().any(|root| oid.starts_with(root)) {
            roots.push(oid.clone());
        }
    }
    roots.sort();
    roots.dedup();

    trace!(?roots, "identified subtree roots");
    roots
}
