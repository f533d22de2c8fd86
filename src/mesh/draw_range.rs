//! Part index ranges and display-list assembly.
//!
//! Every mesh entry's index buffer is the concatenation of its parts, so a
//! part's range starts at the prefix sum of the lengths before it. A set of
//! active parts is drawn with one call per *disjoint* span: ranges are sorted
//! by start and merged whenever a range begins at or before the end of the
//! previous one.

use std::ops::Range;

use rustc_hash::FxHashMap;

/// A part's slice of one mesh's index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartRange {
    /// Mesh the range belongs to.
    pub mesh: usize,
    /// First index.
    pub start: u32,
    /// Index count.
    pub length: u32,
}

impl PartRange {
    /// One past the last index.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }
}

/// Start offset of each part: `starts[0] = 0`,
/// `starts[i] = starts[i - 1] + lengths[i - 1]`.
pub fn part_starts(lengths: &[u32]) -> Vec<u32> {
    lengths
        .iter()
        .scan(0u32, |next, &len| {
            let start = *next;
            *next = next.saturating_add(len);
            Some(start)
        })
        .collect()
}

/// Merged, sorted, non-overlapping `[begin, end)` index spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayList {
    spans: Vec<Range<u32>>,
}

impl DisplayList {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from `(start, length)` ranges in any order.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut ranges: Vec<(u32, u32)> = ranges.into_iter().collect();
        ranges.sort_unstable_by_key(|&(start, _)| start);
        let mut list = Self::new();
        for (start, length) in ranges {
            list.push(start, start.saturating_add(length));
        }
        list
    }

    /// Add `[begin, end)` in any order, merging it with every span it
    /// overlaps or touches. Empty spans are dropped.
    pub fn push(&mut self, begin: u32, end: u32) {
        if begin >= end {
            return;
        }
        let lo = self.spans.partition_point(|s| s.end < begin);
        let hi = self.spans.partition_point(|s| s.start <= end);
        if lo == hi {
            self.spans.insert(lo, begin..end);
            return;
        }
        let merged = begin.min(self.spans[lo].start)..end.max(self.spans[hi - 1].end);
        self.spans[lo] = merged;
        let _ = self.spans.drain(lo + 1..hi);
    }

    /// The spans, in draw order.
    pub fn spans(&self) -> &[Range<u32>] {
        &self.spans
    }

    /// Flattened `[begin0, end0, begin1, end1, ...]` form.
    pub fn to_flat(&self) -> Vec<u32> {
        self.spans.iter().flat_map(|s| [s.start, s.end]).collect()
    }

    /// Number of draw calls the list issues.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// `true` when nothing would be drawn.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total indices covered.
    pub fn index_count(&self) -> u32 {
        self.spans.iter().map(|s| s.end - s.start).sum()
    }
}

/// Model-wide lookup from part name to every index range holding it.
///
/// Built incrementally as entries arrive; a part split across entries
/// accumulates one range per occurrence.
#[derive(Debug, Clone, Default)]
pub struct PartRanges {
    by_name: FxHashMap<String, Vec<PartRange>>,
}

impl PartRanges {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the parts of `mesh`, whose index buffer holds `names` in
    /// order with the given `lengths`. Returns the ranges added, in order.
    pub fn add_mesh(
        &mut self,
        mesh: usize,
        names: &[String],
        lengths: &[u32],
    ) -> Vec<PartRange> {
        let starts = part_starts(lengths);
        names
            .iter()
            .zip(lengths.iter().zip(starts))
            .map(|(name, (&length, start))| {
                let range = PartRange {
                    mesh,
                    start,
                    length,
                };
                self.by_name.entry(name.clone()).or_default().push(range);
                range
            })
            .collect()
    }

    /// Every range of `name`, in load order.
    pub fn get(&self, name: &str) -> &[PartRange] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    /// `true` once at least one range of `name` has loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of distinct part names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// `true` before any mesh is registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// All part names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Per-mesh display lists covering `active` parts. Parts not yet loaded
    /// are skipped; meshes with nothing active are absent.
    pub fn display_lists<'a>(
        &self,
        active: impl IntoIterator<Item = &'a str>,
    ) -> FxHashMap<usize, DisplayList> {
        let mut per_mesh: FxHashMap<usize, Vec<(u32, u32)>> = FxHashMap::default();
        for name in active {
            for range in self.get(name) {
                per_mesh
                    .entry(range.mesh)
                    .or_default()
                    .push((range.start, range.length));
            }
        }
        per_mesh
            .into_iter()
            .map(|(mesh, ranges)| (mesh, DisplayList::from_ranges(ranges)))
            .collect()
    }

    /// Drop everything (model switch).
    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn starts_are_prefix_sums() {
        assert_eq!(part_starts(&[10, 20, 30]), vec![0, 10, 30]);
        assert!(part_starts(&[]).is_empty());
    }

    #[test]
    fn adjacent_ranges_merge() {
        let list = DisplayList::from_ranges([(0, 10), (10, 15), (40, 10)]);
        assert_eq!(list.to_flat(), vec![0, 25, 40, 50]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn disjoint_ranges_stay_separate() {
        let list = DisplayList::from_ranges([(0, 10), (20, 10)]);
        assert_eq!(list.to_flat(), vec![0, 10, 20, 30]);
    }

    #[test]
    fn ranges_are_sorted_before_merging() {
        let list = DisplayList::from_ranges([(40, 10), (10, 15), (0, 10)]);
        assert_eq!(list.to_flat(), vec![0, 25, 40, 50]);
        assert_eq!(list.index_count(), 35);
    }

    #[test]
    fn zero_length_ranges_are_dropped() {
        let list = DisplayList::from_ranges([(5, 0), (0, 5)]);
        assert_eq!(list.to_flat(), vec![0, 5]);
        assert!(DisplayList::from_ranges([(3, 0)]).is_empty());
    }

    #[test]
    fn push_accepts_spans_out_of_order() {
        let mut list = DisplayList::new();
        list.push(20, 30);
        list.push(0, 5);
        assert_eq!(list.to_flat(), vec![0, 5, 20, 30]);

        list.push(10, 12);
        list.push(4, 21);
        assert_eq!(list.to_flat(), vec![0, 30]);

        list.push(40, 50);
        list.push(30, 40);
        assert_eq!(list.to_flat(), vec![0, 50]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn duplicate_parts_do_not_overlap() {
        let list = DisplayList::from_ranges([(0, 10), (0, 10), (20, 5)]);
        assert_eq!(list.to_flat(), vec![0, 10, 20, 25]);
    }

    #[test]
    fn split_parts_accumulate_ranges() {
        let mut table = PartRanges::new();
        let _ = table.add_mesh(0, &names(&["pvm", "pvdr"]), &[6, 9]);
        let _ = table.add_mesh(1, &names(&["pvdr"]), &[12]);
        let _ = table.add_mesh(2, &names(&["pvdr", "pder"]), &[3, 3]);

        let pvdr = table.get("pvdr");
        assert_eq!(pvdr.len(), 3);
        assert_eq!(pvdr[0], PartRange { mesh: 0, start: 6, length: 9 });
        assert_eq!(pvdr[1], PartRange { mesh: 1, start: 0, length: 12 });
        assert_eq!(pvdr[2], PartRange { mesh: 2, start: 0, length: 3 });
        assert_eq!(table.len(), 3);
        assert!(table.get("missing").is_empty());
    }

    #[test]
    fn display_lists_group_by_mesh() {
        let mut table = PartRanges::new();
        let _ = table.add_mesh(0, &names(&["a", "b", "c"]), &[10, 15, 15]);
        let _ = table.add_mesh(1, &names(&["c", "d"]), &[4, 4]);

        let lists = table.display_lists(["a", "b", "c", "not-loaded"]);
        assert_eq!(lists[&0].to_flat(), vec![0, 40]);
        assert_eq!(lists[&1].to_flat(), vec![0, 4]);

        let lists = table.display_lists(["a", "c"]);
        assert_eq!(lists[&0].to_flat(), vec![0, 10, 25, 40]);
    }
}
