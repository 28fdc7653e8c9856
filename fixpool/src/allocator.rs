//! Allocator

use std::{alloc::Layout, ptr::NonNull};

use fixpool_core::{AllocatorStats, Configuration, CreateError, DeallocateError, DefaultConfiguration, Pool};

use crate::SystemPlatform;

/// Fixed-block-size Pool Allocator, over the global allocator.
///
/// The configuration `C` selects whether statistics are tracked, and whether deallocations are validated; by default
/// neither is.
///
/// #   Example
///
/// ```
/// use fixpool::{PoolAllocator, TrackedConfiguration};
///
/// let pool = PoolAllocator::<TrackedConfiguration>::new(24, 4).expect("Pool");
///
/// let block = pool.allocate();
/// assert!(block.is_some());
/// assert_eq!(1, pool.stats().allocated_blocks);
///
/// //  Safety:
/// //  -   `block` was allocated by `pool`, and is no longer in use.
/// unsafe { pool.deallocate(block) };
/// assert_eq!(0, pool.stats().allocated_blocks);
/// ```
pub struct PoolAllocator<C = DefaultConfiguration>
    where
        C: Configuration,
{
    pool: Pool<C, SystemPlatform>,
}

impl<C> PoolAllocator<C>
    where
        C: Configuration,
{
    /// Creates a pool of `block_count` blocks, each suitable for an object of `object_size` bytes.
    ///
    /// Returns an error if either argument is 0, or if the region cannot be reserved.
    #[cold]
    pub fn new(object_size: usize, block_count: usize) -> Result<Self, CreateError> {
        Pool::new(object_size, block_count, SystemPlatform::new()).map(|pool| Self { pool })
    }

    /// Creates a pool of `block_count` blocks, each suitable for an object of the given `layout`.
    #[cold]
    pub fn with_layout(layout: Layout, block_count: usize) -> Result<Self, CreateError> {
        Pool::with_layout(layout, block_count, SystemPlatform::new()).map(|pool| Self { pool })
    }

    /// Creates a pool of `block_count` blocks, each suitable for a `T`.
    #[cold]
    pub fn for_type<T>(block_count: usize) -> Result<Self, CreateError> {
        Self::with_layout(Layout::new::<T>(), block_count)
    }

    /// Allocates a block of `block_size()` bytes.
    ///
    /// Returns None if the pool is exhausted.
    #[inline]
    pub fn allocate(&self) -> Option<NonNull<u8>> { self.pool.allocate() }

    /// Deallocates a block; deallocating None is a no-op.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block` has been returned by a prior call to `allocate` on this instance.
    /// -   Assumes `block` has not been deallocated since its allocation.
    /// -   Assumes the memory pointed by `block` is no longer in use.
    #[inline]
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) { self.pool.deallocate(block) }

    /// Deallocates a block, after checking that it is the start of a block of this pool.
    ///
    /// #   Safety
    ///
    /// -   Assumes `block`, if a block of this pool, is currently allocated.
    /// -   Assumes the memory pointed by `block` is no longer in use.
    pub unsafe fn try_deallocate(&self, block: NonNull<u8>) -> Result<(), DeallocateError> {
        self.pool.try_deallocate(block)
    }

    /// Returns whether `address` is the start of a block of this pool.
    pub fn owns(&self, address: *const u8) -> bool { self.pool.owns(address) }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> AllocatorStats { self.pool.stats() }

    /// Returns the size of each block, in bytes.
    pub fn block_size(&self) -> usize { self.pool.block_size() }

    /// Returns the number of blocks reserved.
    pub fn block_count(&self) -> usize { self.pool.block_count() }

    /// Returns a reference to the underlying pool.
    pub fn as_pool(&self) -> &Pool<C, SystemPlatform> { &self.pool }
}

impl<C> std::fmt::Debug for PoolAllocator<C>
    where
        C: Configuration,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolAllocator").field(&self.pool).finish()
    }
}

// mod tests
