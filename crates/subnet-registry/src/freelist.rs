//! Free list of relative address offsets
//!
//! The free list is the allocator's source of truth: an ordered set of
//! disjoint inclusive `{start, end}` ranges holding every offset that is
//! still available in a subnet. Ranges are kept sorted ascending and are
//! never adjacent; releasing next to an existing range merges the two.
//!
//! Offsets are always relative to the subnet base, never absolute
//! addresses, so the list is independent of any particular subnet.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Inclusive range of free offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRange {
    /// First free offset
    pub start: u32,
    /// Last free offset
    pub end: u32,
}

impl FreeRange {
    /// Number of offsets covered by the range
    pub fn len(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }

    /// Whether the range is degenerate (never constructed by the list)
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Ordered collection of disjoint, non-adjacent free ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreeList {
    ranges: Vec<FreeRange>,
}

impl FreeList {
    /// Create an empty free list (fully reserved address space)
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Create a free list holding a single range
    pub fn with_range(start: u32, end: u32) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self {
            ranges: vec![FreeRange { start, end }],
        })
    }

    /// Remove `[start, end]` from the free list
    ///
    /// Removes whatever part of the requested span is currently free; a
    /// range straddling the span is split into up to two remainders. The
    /// return value is `true` only when the span was fully contained in
    /// free space; on `false` the overlap has still been reserved and the
    /// caller decides whether partial coverage is acceptable.
    pub fn reserve_range(&mut self, start: u32, end: u32) -> Result<bool> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }

        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        let mut removed: u64 = 0;

        for r in &self.ranges {
            if r.end < start || r.start > end {
                kept.push(*r);
                continue;
            }

            let overlap_start = r.start.max(start);
            let overlap_end = r.end.min(end);
            removed += u64::from(overlap_end) - u64::from(overlap_start) + 1;

            if r.start < start {
                kept.push(FreeRange {
                    start: r.start,
                    end: start - 1,
                });
            }
            if r.end > end {
                kept.push(FreeRange {
                    start: end + 1,
                    end: r.end,
                });
            }
        }

        self.ranges = kept;
        Ok(removed == u64::from(end) - u64::from(start) + 1)
    }

    /// Reserve the lowest free offset
    ///
    /// Returns `None` when the list is empty (address space exhausted).
    pub fn reserve_next(&mut self) -> Option<u32> {
        let first = self.ranges.first_mut()?;
        let offset = first.start;

        if first.start == first.end {
            self.ranges.remove(0);
        } else {
            first.start += 1;
        }

        Some(offset)
    }

    /// Return `[start, end]` to the free list
    ///
    /// Merges with overlapping and adjacent free ranges so the
    /// disjoint/non-adjacent invariant holds. Releasing offsets that are
    /// already free is a no-op for that part of the span, not an error.
    /// Returns the number of offsets that were actually freed.
    pub fn release_range(&mut self, start: u32, end: u32) -> Result<u64> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }

        let mut merged = FreeRange { start, end };
        let mut already_free: u64 = 0;
        let mut out = Vec::with_capacity(self.ranges.len() + 1);

        {
            let mut iter = self.ranges.iter().peekable();

            // Ranges strictly left of the released span, not even adjacent
            while let Some(r) = iter.peek() {
                if u64::from(r.end) + 1 < u64::from(merged.start) {
                    out.push(**r);
                    iter.next();
                } else {
                    break;
                }
            }

            // Absorb everything overlapping or touching the span
            while let Some(r) = iter.peek() {
                if u64::from(r.start) > u64::from(merged.end) + 1 {
                    break;
                }

                let overlap_start = r.start.max(start);
                let overlap_end = r.end.min(end);
                if overlap_start <= overlap_end {
                    already_free += u64::from(overlap_end) - u64::from(overlap_start) + 1;
                }

                merged.start = merged.start.min(r.start);
                merged.end = merged.end.max(r.end);
                iter.next();
            }

            out.push(merged);
            out.extend(iter.copied());
        }

        self.ranges = out;
        Ok(u64::from(end) - u64::from(start) + 1 - already_free)
    }

    /// Truncate the free list at a new upper bound after the address space
    /// shrank
    ///
    /// Ranges wholly above the bound are dropped, one crossing it is cut at
    /// the bound. Growing the space never extends the list: newly in-range
    /// offsets stay reserved until the caller releases them explicitly.
    pub fn rebound(&mut self, new_upper_bound: u32) {
        self.ranges.retain_mut(|r| {
            if r.start > new_upper_bound {
                return false;
            }
            if r.end > new_upper_bound {
                r.end = new_upper_bound;
            }
            true
        });
    }

    /// Whether no offsets are free
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of free offsets
    pub fn free_count(&self) -> u64 {
        self.ranges.iter().map(FreeRange::len).sum()
    }

    /// Lowest free offset
    pub fn first(&self) -> Option<u32> {
        self.ranges.first().map(|r| r.start)
    }

    /// Highest free offset
    pub fn highest(&self) -> Option<u32> {
        self.ranges.last().map(|r| r.end)
    }

    /// The underlying ranges, sorted ascending
    pub fn ranges(&self) -> &[FreeRange] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ranges: &[(u32, u32)]) -> FreeList {
        FreeList {
            ranges: ranges
                .iter()
                .map(|&(start, end)| FreeRange { start, end })
                .collect(),
        }
    }

    fn assert_invariant(flist: &FreeList) {
        for pair in flist.ranges().windows(2) {
            assert!(pair[0].start <= pair[0].end, "range out of order: {pair:?}");
            assert!(
                u64::from(pair[0].end) + 1 < u64::from(pair[1].start),
                "ranges overlap or touch: {pair:?}"
            );
        }
    }

    #[test]
    fn test_reserve_splits_straddled_range() {
        let mut flist = list(&[(1, 253)]);

        let full = flist.reserve_range(10, 20).unwrap();
        assert!(full);
        assert_eq!(flist, list(&[(1, 9), (21, 253)]));
        assert_invariant(&flist);
    }

    #[test]
    fn test_reserve_partial_overlap_reports_incomplete() {
        let mut flist = list(&[(1, 9), (21, 253)]);

        // [5, 25] straddles the reserved hole; only the free part goes away
        let full = flist.reserve_range(5, 25).unwrap();
        assert!(!full);
        assert_eq!(flist, list(&[(1, 4), (26, 253)]));
        assert_invariant(&flist);
    }

    #[test]
    fn test_reserve_entirely_used_span() {
        let mut flist = list(&[(1, 9)]);

        let full = flist.reserve_range(100, 110).unwrap();
        assert!(!full);
        assert_eq!(flist, list(&[(1, 9)]));
    }

    #[test]
    fn test_reserve_rejects_reversed_range() {
        let mut flist = list(&[(1, 253)]);
        assert!(matches!(
            flist.reserve_range(20, 10),
            Err(Error::InvalidRange { start: 20, end: 10 })
        ));
    }

    #[test]
    fn test_reserve_single_offset_edges() {
        let mut flist = list(&[(1, 253)]);

        assert!(flist.reserve_range(1, 1).unwrap());
        assert!(flist.reserve_range(253, 253).unwrap());
        assert_eq!(flist, list(&[(2, 252)]));
    }

    #[test]
    fn test_reserve_next_lowest_first() {
        let mut flist = list(&[(5, 6), (10, 20)]);

        assert_eq!(flist.reserve_next(), Some(5));
        assert_eq!(flist.reserve_next(), Some(6));
        assert_eq!(flist.reserve_next(), Some(10));
        assert_eq!(flist, list(&[(11, 20)]));
    }

    #[test]
    fn test_exhaustion() {
        let mut flist = list(&[(1, 3), (7, 8)]);
        let capacity = flist.free_count();
        assert_eq!(capacity, 5);

        let mut seen = Vec::new();
        for _ in 0..capacity {
            seen.push(flist.reserve_next().expect("free space left"));
        }

        assert_eq!(seen, vec![1, 2, 3, 7, 8]);
        assert_eq!(flist.reserve_next(), None);
        assert!(flist.is_empty());
    }

    #[test]
    fn test_release_merges_adjacent() {
        let mut flist = list(&[(1, 9), (21, 253)]);

        let freed = flist.release_range(10, 20).unwrap();
        assert_eq!(freed, 11);
        assert_eq!(flist, list(&[(1, 253)]));
        assert_invariant(&flist);
    }

    #[test]
    fn test_release_is_idempotent_over_free_space() {
        let mut flist = list(&[(1, 253)]);

        let freed = flist.release_range(10, 20).unwrap();
        assert_eq!(freed, 0);
        assert_eq!(flist, list(&[(1, 253)]));
    }

    #[test]
    fn test_release_partial_overlap_counts_only_new() {
        let mut flist = list(&[(1, 9)]);

        // 5..=9 already free, 10..=12 newly freed
        let freed = flist.release_range(5, 12).unwrap();
        assert_eq!(freed, 3);
        assert_eq!(flist, list(&[(1, 12)]));
        assert_invariant(&flist);
    }

    #[test]
    fn test_release_bridges_many_ranges() {
        let mut flist = list(&[(1, 2), (5, 6), (9, 10), (20, 30)]);

        let freed = flist.release_range(3, 12).unwrap();
        assert_eq!(freed, 6); // 3,4,7,8,11,12
        assert_eq!(flist, list(&[(1, 12), (20, 30)]));
        assert_invariant(&flist);
    }

    #[test]
    fn test_release_into_empty_list() {
        let mut flist = FreeList::new();

        let freed = flist.release_range(4, 8).unwrap();
        assert_eq!(freed, 5);
        assert_eq!(flist, list(&[(4, 8)]));
    }

    #[test]
    fn test_conservation() {
        let original = list(&[(1, 253)]);
        let mut flist = original.clone();

        assert!(flist.reserve_range(10, 20).unwrap());
        assert_eq!(flist.release_range(10, 20).unwrap(), 11);
        assert_eq!(flist, original);
    }

    #[test]
    fn test_rebound_truncates() {
        let mut flist = list(&[(0, 253)]);

        flist.rebound(127);
        assert_eq!(flist, list(&[(0, 127)]));
    }

    #[test]
    fn test_rebound_drops_ranges_above_bound() {
        let mut flist = list(&[(1, 9), (21, 100), (200, 253)]);

        flist.rebound(127);
        assert_eq!(flist, list(&[(1, 9), (21, 100)]));

        flist.rebound(5);
        assert_eq!(flist, list(&[(1, 5)]));
    }

    #[test]
    fn test_rebound_never_extends() {
        let mut flist = list(&[(1, 126)]);

        // Growing the bound leaves the list untouched
        flist.rebound(253);
        assert_eq!(flist, list(&[(1, 126)]));
    }

    #[test]
    fn test_invariant_after_mixed_sequence() {
        let mut flist = list(&[(1, 254)]);

        flist.reserve_range(10, 20).unwrap();
        flist.reserve_range(30, 40).unwrap();
        flist.release_range(15, 35).unwrap();
        flist.reserve_range(1, 5).unwrap();
        flist.release_range(1, 254).unwrap();

        assert_invariant(&flist);
        assert_eq!(flist, list(&[(1, 254)]));
    }

    #[test]
    fn test_full_u32_bounds() {
        let mut flist = list(&[(0, u32::MAX)]);

        assert!(flist.reserve_range(u32::MAX, u32::MAX).unwrap());
        assert_eq!(flist, list(&[(0, u32::MAX - 1)]));

        assert_eq!(flist.release_range(u32::MAX, u32::MAX).unwrap(), 1);
        assert_eq!(flist, list(&[(0, u32::MAX)]));
    }
}
