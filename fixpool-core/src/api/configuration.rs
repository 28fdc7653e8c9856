//! The configuration of fixpool-core.
//!
//! A Configuration selects, at compile-time, the trade-offs made by a Pool:
//!
//! -   Statistics: whether the outstanding and peak number of blocks are tracked.
//! -   Validation: whether each deallocated block is checked to be a block of the pool before being pushed back on
//!     the free-list.
//!
//! Neither costs anything when disabled.

use super::{NoStatistics, Statistics, TrackStatistics};

/// Configuration
///
/// The Configuration instance allows adjusting the trade-offs between latency and hardening.
pub trait Configuration {
    /// The statistics tracked by the Pool.
    type Statistics: Statistics;

    /// Whether `Pool::deallocate` checks that the block lies within the region, at the start of a block.
    ///
    /// A rejected block is reported, and otherwise ignored, rather than corrupting the free-list.
    const VALIDATE_DEALLOCATION: bool;
}

/// Fast and unchecked: no statistics, no validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfiguration;

impl Configuration for DefaultConfiguration {
    type Statistics = NoStatistics;

    const VALIDATE_DEALLOCATION: bool = false;
}

/// Statistics, without validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrackedConfiguration;

impl Configuration for TrackedConfiguration {
    type Statistics = TrackStatistics;

    const VALIDATE_DEALLOCATION: bool = false;
}

/// Statistics and validation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HardenedConfiguration;

impl Configuration for HardenedConfiguration {
    type Statistics = TrackStatistics;

    const VALIDATE_DEALLOCATION: bool = true;
}
