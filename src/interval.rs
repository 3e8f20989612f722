//! Interval arithmetic over closed block ranges.
//!
//! All functions operate on *canonical* interval lists: sorted by start,
//! non-overlapping, non-adjacent. Inputs in canonical form produce outputs in
//! canonical form; [`union`] additionally canonicalises whatever it is given.
//!
//! Block ranges are inclusive on both ends, so `[1, 3]` and `[4, 6]` are
//! adjacent and coalesce to `[1, 6]`.

use std::cmp::{max, min};
use std::ops::RangeInclusive;

use alloy::primitives::BlockNumber;

/// A closed interval of block numbers.
pub type BlockRange = RangeInclusive<BlockNumber>;

/// Merges two interval lists, coalescing overlapping and adjacent ranges.
#[must_use]
pub fn union(a: &[BlockRange], b: &[BlockRange]) -> Vec<BlockRange> {
    let mut merged: Vec<BlockRange> = a.iter().chain(b).cloned().collect();
    merged.sort_by_key(|range| (*range.start(), *range.end()));

    let mut out: Vec<BlockRange> = Vec::with_capacity(merged.len());
    for range in merged {
        debug_assert!(range.start() <= range.end(), "malformed interval");
        match out.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                if range.end() > last.end() {
                    *last = *last.start()..=*range.end();
                }
            }
            _ => out.push(range),
        }
    }
    out
}

/// Intersects two canonical interval lists.
#[must_use]
pub fn intersection(a: &[BlockRange], b: &[BlockRange]) -> Vec<BlockRange> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        let start = max(*a[i].start(), *b[j].start());
        let end = min(*a[i].end(), *b[j].end());
        if start <= end {
            out.push(start..=end);
        }
        if a[i].end() < b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Subtracts the coverage of `b` from `a`.
#[must_use]
pub fn difference(a: &[BlockRange], b: &[BlockRange]) -> Vec<BlockRange> {
    let mut out = Vec::new();
    let mut j = 0;
    for range in a {
        let mut cursor = *range.start();
        let end = *range.end();

        // Blockers entirely below this range cannot clip it, nor anything
        // after it.
        while j < b.len() && *b[j].end() < cursor {
            j += 1;
        }

        let mut k = j;
        loop {
            let Some(blocker) = b.get(k).filter(|blocker| *blocker.start() <= end) else {
                out.push(cursor..=end);
                break;
            };
            if *blocker.start() > cursor {
                out.push(cursor..=*blocker.start() - 1);
            }
            if *blocker.end() >= end {
                break;
            }
            cursor = *blocker.end() + 1;
            k += 1;
        }
    }
    out
}

/// Total number of blocks covered by a canonical interval list.
#[must_use]
pub fn interval_sum(a: &[BlockRange]) -> u64 {
    a.iter().map(|range| range.end() - range.start() + 1).sum()
}

/// Splits each interval into pieces of at most `max_width` blocks.
///
/// Splitting happens within intervals only; pieces never merge across the
/// gaps of the input list.
///
/// # Panics
///
/// Panics if `max_width` is 0.
#[must_use]
pub fn chunks(a: &[BlockRange], max_width: u64) -> Vec<BlockRange> {
    assert!(max_width >= 1, "max_width must be at least 1");
    let mut out = Vec::new();
    for range in a {
        let mut start = *range.start();
        loop {
            let end = min(start.saturating_add(max_width - 1), *range.end());
            out.push(start..=end);
            if end == *range.end() {
                break;
            }
            start = end + 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_coalesces_overlaps_and_adjacencies() {
        assert_eq!(union(&[1..=3], &[4..=6]), vec![1..=6]);
        assert_eq!(union(&[1..=5], &[3..=8]), vec![1..=8]);
        assert_eq!(union(&[1..=2], &[5..=6]), vec![1..=2, 5..=6]);
        assert_eq!(union(&[], &[7..=7]), vec![7..=7]);
    }

    #[test]
    fn union_canonicalises_unsorted_input() {
        let out = union(&[10..=12, 0..=1], &[2..=4, 11..=15]);
        assert_eq!(out, vec![0..=4, 10..=15]);
    }

    #[test]
    fn union_swallows_contained_ranges() {
        assert_eq!(union(&[0..=100], &[5..=10, 20..=30]), vec![0..=100]);
    }

    #[test]
    fn intersection_basic() {
        assert_eq!(intersection(&[0..=10], &[5..=15]), vec![5..=10]);
        assert_eq!(intersection(&[0..=3], &[5..=9]), vec![]);
        assert_eq!(intersection(&[0..=10, 20..=30], &[8..=25]), vec![8..=10, 20..=25]);
    }

    #[test]
    fn difference_clips_from_both_ends() {
        assert_eq!(difference(&[0..=10], &[0..=3]), vec![4..=10]);
        assert_eq!(difference(&[0..=10], &[8..=12]), vec![0..=7]);
        assert_eq!(difference(&[0..=10], &[4..=6]), vec![0..=3, 7..=10]);
        assert_eq!(difference(&[0..=10], &[0..=10]), vec![]);
    }

    #[test]
    fn difference_with_spanning_blocker() {
        // one blocker clipping several ranges
        assert_eq!(difference(&[0..=5, 10..=15, 20..=25], &[4..=21]), vec![0..=3, 22..=25]);
    }

    #[test]
    fn difference_ignores_disjoint_blockers() {
        assert_eq!(difference(&[10..=20], &[0..=5, 25..=30]), vec![10..=20]);
    }

    #[test]
    fn sum_counts_inclusive_widths() {
        assert_eq!(interval_sum(&[]), 0);
        assert_eq!(interval_sum(&[5..=5]), 1);
        assert_eq!(interval_sum(&[0..=9, 20..=24]), 15);
    }

    #[test]
    fn sum_union_closure_identity() {
        // sum(A ∪ B) = sum(A) + sum(B) − sum(A ∩ B)
        let cases = [
            (vec![0..=10], vec![5..=15]),
            (vec![0..=3, 8..=12], vec![2..=9, 20..=21]),
            (vec![100..=199], vec![]),
            (vec![0..=0, 2..=2, 4..=4], vec![1..=1, 3..=3]),
        ];
        for (a, b) in cases {
            let lhs = interval_sum(&union(&a, &b));
            let rhs = interval_sum(&a) + interval_sum(&b) - interval_sum(&intersection(&a, &b));
            assert_eq!(lhs, rhs, "a={a:?} b={b:?}");
        }
    }

    #[test]
    fn difference_union_intersection_partition_identity() {
        // (A \ B) ∪ (A ∩ B) = A
        let cases = [
            (vec![0..=10], vec![5..=15]),
            (vec![0..=3, 8..=12, 30..=40], vec![2..=9, 35..=35]),
            (vec![100..=199], vec![100..=199]),
        ];
        for (a, b) in cases {
            let rebuilt = union(&difference(&a, &b), &intersection(&a, &b));
            assert_eq!(rebuilt, a, "a={a:?} b={b:?}");
        }
    }

    #[test]
    fn chunks_splits_by_width() {
        assert_eq!(chunks(&[100..=250], 50), vec![100..=149, 150..=199, 200..=249, 250..=250]);
        assert_eq!(chunks(&[100..=199], 50), vec![100..=149, 150..=199]);
        assert_eq!(chunks(&[100..=120], 50), vec![100..=120]);
    }

    #[test]
    fn chunks_never_merge_across_gaps() {
        assert_eq!(chunks(&[0..=1, 3..=4], 10), vec![0..=1, 3..=4]);
    }

    #[test]
    fn chunks_width_one() {
        assert_eq!(chunks(&[7..=9], 1), vec![7..=7, 8..=8, 9..=9]);
    }

    #[test]
    #[should_panic(expected = "max_width must be at least 1")]
    fn chunks_zero_width_panics() {
        let _ = chunks(&[0..=1], 0);
    }
}
