#![deny(missing_docs)]

//! A fixed-block-size memory pool.
//!
//! The type `PoolAllocator` reserves a single contiguous region up-front, carves it into equally-sized blocks, and
//! serves allocation and deallocation requests in constant time, without calling into the global allocator.
//!
//! The type `TypedPool` builds on top to move values of a single type into the pool, handing out `PoolBox` handles
//! which return their block when dropped.
//!
//! #   Warning
//!
//! A pool never grows: once exhausted, allocation fails until a block is returned. A pool is not thread-safe: it may
//! be moved to another thread, but not shared.

mod allocator;
mod platform;
mod typed;

pub use allocator::PoolAllocator;
pub use platform::SystemPlatform;
pub use typed::{PoolBox, TypedPool};

#[cfg(target_os = "linux")]
pub use platform::MmapPlatform;

pub use fixpool_core::{
    AllocatorStats, Configuration, CreateError, DeallocateError, DefaultConfiguration, HardenedConfiguration,
    NoStatistics, Platform, Pool, Statistics, TrackStatistics, TrackedConfiguration,
};
