//! Selection regions over a sample buffer.
//!
//! A selection is an ordered list of non-overlapping frame regions.
//! Adding a region that touches or overlaps existing ones merges them,
//! so the list is always a disjoint union in ascending order.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A half-open frame region `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, frame: usize) -> bool {
        frame >= self.start && frame < self.end
    }

    /// Regions touch or overlap (mergeable).
    fn touches(&self, other: &Region) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Ordered, disjoint selection-region list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionList {
    regions: SmallVec<[Region; 4]>,
}

impl SelectionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, merging with any regions it touches.
    pub fn add(&mut self, region: Region) {
        if region.is_empty() {
            return;
        }
        let mut merged = region;
        let mut out: SmallVec<[Region; 4]> = SmallVec::new();
        for r in self.regions.drain(..) {
            if r.touches(&merged) {
                merged.start = merged.start.min(r.start);
                merged.end = merged.end.max(r.end);
            } else {
                out.push(r);
            }
        }
        let pos = out.iter().position(|r| r.start > merged.start);
        match pos {
            Some(i) => out.insert(i, merged),
            None => out.push(merged),
        }
        self.regions = out;
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Total selected frames across all regions.
    pub fn total_frames(&self) -> usize {
        self.regions.iter().map(Region::len).sum()
    }

    /// The region containing `frame`, if any.
    pub fn region_at(&self, frame: usize) -> Option<Region> {
        self.regions.iter().copied().find(|r| r.contains(frame))
    }

    /// Whether `frame` lies inside the selection union.
    pub fn contains(&self, frame: usize) -> bool {
        self.region_at(frame).is_some()
    }

    /// The first region starting at or after `frame`.
    pub fn next_region_from(&self, frame: usize) -> Option<Region> {
        self.regions.iter().copied().find(|r| r.start >= frame)
    }

    /// The last region ending at or before `frame`.
    pub fn prev_region_before(&self, frame: usize) -> Option<Region> {
        self.regions
            .iter()
            .rev()
            .copied()
            .find(|r| r.end <= frame)
    }

    pub fn first(&self) -> Option<Region> {
        self.regions.first().copied()
    }

    pub fn last(&self) -> Option<Region> {
        self.regions.last().copied()
    }
}
