//! Statistics
//!
//! Optional bookkeeping of the number of outstanding blocks, and the peak thereof.
//!
//! Statistics are selected at compile-time via `Configuration::Statistics`; `NoStatistics` is zero-sized and its
//! operations are no-ops, so that a Pool without tracking pays nothing for it.

use core::cell::Cell;

/// Snapshot of the statistics of a Pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct AllocatorStats {
    /// Number of blocks reserved by the pool.
    pub total_blocks: usize,
    /// Number of blocks currently allocated, 0 if not tracked.
    pub allocated_blocks: usize,
    /// Maximum number of blocks allocated at once, 0 if not tracked.
    pub peak_usage: usize,
    /// Fragmentation of the pool, always 0: a fixed-block pool cannot fragment.
    pub fragmentation_metric: usize,
}

/// Statistics
///
/// Hooks invoked by a Pool on each successful allocation and deallocation.
pub trait Statistics: Default {
    /// Whether the statistics are actually tracked.
    const TRACKED: bool;

    /// Records the allocation of a block.
    fn on_allocate(&self);

    /// Records the deallocation of a block.
    fn on_deallocate(&self);

    /// Returns the number of outstanding blocks, or 0 if not tracked.
    fn outstanding(&self) -> usize;

    /// Returns the peak number of outstanding blocks, or 0 if not tracked.
    fn peak(&self) -> usize;
}

/// No tracking whatsoever.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStatistics;

impl Statistics for NoStatistics {
    const TRACKED: bool = false;

    #[inline(always)]
    fn on_allocate(&self) {}

    #[inline(always)]
    fn on_deallocate(&self) {}

    fn outstanding(&self) -> usize { 0 }

    fn peak(&self) -> usize { 0 }
}

/// Tracking of the outstanding and peak number of blocks.
#[derive(Debug, Default)]
pub struct TrackStatistics {
    outstanding: Cell<usize>,
    peak: Cell<usize>,
}

impl Statistics for TrackStatistics {
    const TRACKED: bool = true;

    #[inline(always)]
    fn on_allocate(&self) {
        let outstanding = self.outstanding.get() + 1;
        self.outstanding.set(outstanding);

        if outstanding > self.peak.get() {
            self.peak.set(outstanding);
        }
    }

    #[inline(always)]
    fn on_deallocate(&self) {
        let outstanding = self.outstanding.get();
        debug_assert!(outstanding > 0, "More deallocations than allocations");

        self.outstanding.set(outstanding.wrapping_sub(1));
    }

    fn outstanding(&self) -> usize { self.outstanding.get() }

    fn peak(&self) -> usize { self.peak.get() }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn no_statistics() {
    let stats = NoStatistics;

    stats.on_allocate();
    stats.on_allocate();
    stats.on_deallocate();

    assert_eq!(0, stats.outstanding());
    assert_eq!(0, stats.peak());
    assert_eq!(0, core::mem::size_of::<NoStatistics>());
}

#[test]
fn track_statistics_outstanding() {
    let stats = TrackStatistics::default();
    assert_eq!(0, stats.outstanding());

    stats.on_allocate();
    stats.on_allocate();
    assert_eq!(2, stats.outstanding());

    stats.on_deallocate();
    assert_eq!(1, stats.outstanding());

    stats.on_deallocate();
    assert_eq!(0, stats.outstanding());
}

#[test]
fn track_statistics_peak() {
    let stats = TrackStatistics::default();
    assert_eq!(0, stats.peak());

    stats.on_allocate();
    stats.on_allocate();
    stats.on_allocate();
    assert_eq!(3, stats.peak());

    stats.on_deallocate();
    stats.on_deallocate();
    assert_eq!(3, stats.peak());

    stats.on_allocate();
    assert_eq!(3, stats.peak());

    stats.on_allocate();
    stats.on_allocate();
    assert_eq!(4, stats.peak());
    assert_eq!(4, stats.outstanding());
}

} // mod tests
