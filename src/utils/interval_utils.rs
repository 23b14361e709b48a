use std::cmp::{max, min};

pub struct IntervalUtils {}

impl IntervalUtils {
    /**
     * Determine whether the closed intervals [start1, end1] and [start2, end2]
     * share at least one position
     */
    pub fn overlaps_closed(start1: i32, end1: i32, start2: i32, end2: i32) -> bool {
        return start1 <= end2 && start2 <= end1;
    }

    /**
     * Intersection of two closed intervals, None if they do not overlap
     */
    pub fn intersection_closed(
        start1: i32,
        end1: i32,
        start2: i32,
        end2: i32,
    ) -> Option<(i32, i32)> {
        let start = max(start1, start2);
        let end = min(end1, end2);
        if start <= end {
            Some((start, end))
        } else {
            None
        }
    }
}
