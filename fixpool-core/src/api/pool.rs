//! Pool
//!
//! The Pool reserves a single region from its Platform on construction, carves it into blocks of identical size, and
//! threads all blocks into an intrusive free-list. Allocation pops the head of the free-list, deallocation pushes the
//! block back on top; both are O(1) and never call into the Platform.
//!
//! #   Safety
//!
//! A Pool _assumes_ it is only used from a single thread, and makes no attempt at synchronizing memory accesses. This
//! is enforced by the Pool not being `Sync`.

use core::{
    alloc::Layout,
    fmt,
    marker::PhantomData,
    mem,
    ptr::NonNull,
};

use crate::{AllocatorStats, Configuration, CreateError, DeallocateError, Platform, PowerOf2, Statistics};
use crate::internals::{blocks::{FreeBlock, FreeList}, region::Region};

/// A fixed-block-size memory pool.
///
/// Each block is at least as large as the requested object size, and at least as large as a pointer, so that a free
/// block can store the link to the next free block in-place.
pub struct Pool<C, P>
    where
        C: Configuration,
        P: Platform,
{
    region: Region,
    layout: Layout,
    free: FreeList,
    statistics: C::Statistics,
    platform: P,
    _configuration: PhantomData<C>,
}

impl<C, P> Pool<C, P>
    where
        C: Configuration,
        P: Platform,
{
    /// Creates a pool of `block_count` blocks, each suitable for an object of `object_size` bytes.
    ///
    /// The blocks are aligned for a pointer, and no more; use `with_layout` for stricter alignment requirements.
    pub fn new(object_size: usize, block_count: usize, platform: P) -> Result<Self, CreateError> {
        if object_size == 0 {
            return Err(CreateError::ZeroObjectSize);
        }

        let layout = Layout::from_size_align(object_size, 1)
            .map_err(|_| CreateError::CapacityOverflow { block_size: object_size, block_count })?;

        Self::with_layout(layout, block_count, platform)
    }

    /// Creates a pool of `block_count` blocks, each suitable for an object of the given `layout`.
    ///
    /// The size of each block is the size of `layout`, or of a pointer if larger, rounded up to the alignment of
    /// `layout`, or of a pointer if larger.
    ///
    /// Reserves the whole region from the `platform` at once; no further reservation occurs during the lifetime of
    /// the pool.
    pub fn with_layout(layout: Layout, block_count: usize, platform: P) -> Result<Self, CreateError> {
        if layout.size() == 0 {
            return Err(CreateError::ZeroObjectSize);
        }

        if block_count == 0 {
            return Err(CreateError::ZeroBlockCount);
        }

        //  Safety:
        //  -   The alignment of a `Layout` is always a power of 2.
        let align = unsafe { PowerOf2::new_unchecked(layout.align()) };
        let align = align.max(PowerOf2::align_of::<FreeBlock>());

        let block_size = layout.size().max(mem::size_of::<FreeBlock>());
        let block_size = align.checked_round_up(block_size)
            .ok_or(CreateError::CapacityOverflow { block_size: layout.size(), block_count })?;

        let region_layout = Region::layout(block_size, block_count, align.value())
            .ok_or(CreateError::CapacityOverflow { block_size, block_count })?;

        //  Safety:
        //  -   `region_layout.size()` is non-zero, as both `block_size` and `block_count` are.
        let base = unsafe { platform.allocate(region_layout) };

        let base = match base {
            Some(base) => base,
            None => {
                tracing::warn!(size = region_layout.size(), align = region_layout.align(), "region reservation failed");
                return Err(CreateError::OutOfMemory { size: region_layout.size() });
            },
        };

        debug_assert!(base.as_ptr() as usize % align == 0,
            "Incorrect alignment of region: {:x} % {:x} != 0", base.as_ptr() as usize, align.value());

        //  Safety:
        //  -   `base` points to `block_size * block_count` bytes, as per `region_layout`.
        let region = unsafe { Region::new(base, block_size, block_count) };

        let free = FreeList::default();

        //  Pushing in reverse address order leaves block 0 at the head, each block linking to the next.
        for index in (0..block_count).rev() {
            //  Safety:
            //  -   `index` is less than `block_count`.
            //  -   The block is exclusively owned, and sized and aligned for a `FreeBlock`.
            //  -   The block is pushed only once.
            unsafe { free.push(region.block(index)) };
        }

        tracing::debug!(block_size, block_count, size = region_layout.size(), "pool created");

        let statistics = C::Statistics::default();
        let _configuration = PhantomData;

        Ok(Self { region, layout: region_layout, free, statistics, platform, _configuration })
    }

    /// Allocates a block.
    ///
    /// Returns None if the pool is exhausted, in which case the pool is left unmodified.
    ///
    /// The block is `block_size()` bytes large and is _not_ zeroed: it contains whatever was last written to it.
    #[inline]
    pub fn allocate(&self) -> Option<NonNull<u8>> {
        let block = self.free.pop()?;

        self.statistics.on_allocate();

        Some(block)
    }

    /// Deallocates a block; deallocating None is a no-op.
    ///
    /// If the configuration validates deallocations, a block which is not the start of a block of this pool is
    /// reported and ignored.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block` was returned by a prior call to `allocate` on this instance.
    /// -   Assumes that `block` has not been deallocated since its allocation.
    /// -   Assumes that the memory pointed to by `block` is no longer in use.
    #[inline]
    pub unsafe fn deallocate(&self, block: Option<NonNull<u8>>) {
        let block = match block {
            Some(block) => block,
            None => return,
        };

        if C::VALIDATE_DEALLOCATION {
            if let Err(error) = self.region.locate(block.as_ptr()) {
                tracing::error!(%error, "rejected deallocation");
                return;
            }
        } else {
            debug_assert!(self.owns(block.as_ptr()), "{:x} is not a block of this pool", block.as_ptr() as usize);
        }

        //  Safety:
        //  -   `block` is a block of this pool, allocated, and no longer in use, as per pre-conditions.
        self.release(block);
    }

    /// Deallocates a block, after checking that it is the start of a block of this pool.
    ///
    /// The check is performed regardless of the configuration, and an error is returned if it fails, in which case
    /// the pool is left unmodified.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `block`, if a block of this pool, is currently allocated.
    /// -   Assumes that the memory pointed to by `block` is no longer in use.
    pub unsafe fn try_deallocate(&self, block: NonNull<u8>) -> Result<(), DeallocateError> {
        self.region.locate(block.as_ptr())?;

        //  Safety:
        //  -   `block` is a block of this pool, as per the check above.
        //  -   `block` is allocated, and no longer in use, as per pre-conditions.
        self.release(block);

        Ok(())
    }

    /// Returns whether `address` is the start of a block of this pool, whether allocated or not.
    pub fn owns(&self, address: *const u8) -> bool { self.region.locate(address).is_ok() }

    /// Returns the index of the block starting at `address`, if any.
    ///
    /// Blocks are indexed in address order, from 0 to `block_count() - 1`.
    pub fn index_of(&self, address: *const u8) -> Option<usize> { self.region.locate(address).ok() }

    /// Returns a snapshot of the statistics.
    ///
    /// The number of allocated blocks and the peak usage are 0 unless the configuration tracks them.
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            total_blocks: self.region.block_count(),
            allocated_blocks: self.statistics.outstanding(),
            peak_usage: self.statistics.peak(),
            fragmentation_metric: 0,
        }
    }

    /// Returns the size of each block, in bytes.
    pub fn block_size(&self) -> usize { self.region.block_size() }

    /// Returns the number of blocks reserved by the pool.
    pub fn block_count(&self) -> usize { self.region.block_count() }

    /// Returns the layout of the region reserved by the pool.
    pub fn layout(&self) -> Layout { self.layout }

    /// Returns whether all blocks are allocated.
    pub fn is_exhausted(&self) -> bool { self.free.is_empty() }

    /// Returns the number of free blocks.
    ///
    /// Walks the entire free-list, O(n).
    pub fn free_blocks(&self) -> usize { self.free.len() }

    /// Returns a reference to the platform.
    pub fn platform(&self) -> &P { &self.platform }

    //  Pushes the block back on top of the free-list.
    //
    //  #   Safety
    //
    //  -   Assumes that `block` is an allocated block of this pool.
    //  -   Assumes that the memory pointed to by `block` is no longer in use.
    #[inline(always)]
    unsafe fn release(&self, block: NonNull<u8>) {
        //  Safety:
        //  -   `block` is exclusively owned, and sized and aligned for a `FreeBlock`, as a block of this pool.
        //  -   `block` is allocated, hence not already in the free-list.
        self.free.push(block);

        self.statistics.on_deallocate();
    }
}

impl<C, P> Drop for Pool<C, P>
    where
        C: Configuration,
        P: Platform,
{
    fn drop(&mut self) {
        if <C::Statistics as Statistics>::TRACKED {
            let outstanding = self.statistics.outstanding();
            assert!(outstanding == 0, "Pool dropped with {} outstanding blocks", outstanding);
        } else {
            debug_assert!(self.free.len() == self.block_count(),
                "Pool dropped with {} outstanding blocks", self.block_count() - self.free.len());
        }

        //  Safety:
        //  -   `base` was allocated by `platform`, with `layout`.
        //  -   No block is in use any longer, as checked above.
        unsafe { self.platform.deallocate(self.region.base(), self.layout) };
    }
}

impl<C, P> fmt::Debug for Pool<C, P>
    where
        C: Configuration,
        P: Platform,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("base", &self.region.base())
            .field("block_size", &self.block_size())
            .field("block_count", &self.block_count())
            .field("stats", &self.stats())
            .finish()
    }
}

//  Safety:
//  -   The Pool exclusively owns its region, hence moving it to another thread moves the region along.
//  -   The Pool remains !Sync, by virtue of its free-list being made of `Cell`s.
unsafe impl<C, P> Send for Pool<C, P>
    where
        C: Configuration,
        C::Statistics: Send,
        P: Platform + Send,
{
}


#[cfg(test)]
mod tests {

use core::ptr;

use crate::{DefaultConfiguration, HardenedConfiguration, TrackedConfiguration};

use super::*;
use super::test::{FailingPlatform, TestPlatform};

type DefaultPool<'a> = Pool<DefaultConfiguration, &'a TestPlatform>;
type TrackedPool<'a> = Pool<TrackedConfiguration, &'a TestPlatform>;
type HardenedPool<'a> = Pool<HardenedConfiguration, &'a TestPlatform>;

const POINTER_SIZE: usize = mem::size_of::<*mut u8>();

#[test]
fn pool_new_zero_object_size() {
    let platform = TestPlatform::default();

    let result = DefaultPool::new(0, 4, &platform);

    assert_eq!(Some(CreateError::ZeroObjectSize), result.err());
    assert_eq!(0, platform.allocated());
}

#[test]
fn pool_new_zero_block_count() {
    let platform = TestPlatform::default();

    let result = DefaultPool::new(24, 0, &platform);

    assert_eq!(Some(CreateError::ZeroBlockCount), result.err());
    assert_eq!(0, platform.allocated());
}

#[test]
fn pool_new_capacity_overflow() {
    let platform = TestPlatform::default();

    let result = DefaultPool::new(usize::MAX / 2, 3, &platform);
    assert!(matches!(result.err(), Some(CreateError::CapacityOverflow { block_count: 3, .. })));

    let result = DefaultPool::new(usize::MAX, 1, &platform);
    assert!(matches!(result.err(), Some(CreateError::CapacityOverflow { block_count: 1, .. })));

    assert_eq!(0, platform.allocated());
}

#[test]
fn pool_new_out_of_memory() {
    let result = Pool::<DefaultConfiguration, _>::new(24, 4, FailingPlatform);

    assert_eq!(Some(CreateError::OutOfMemory { size: 96 }), result.err());
}

#[test]
fn pool_new_out_of_memory_too_large() {
    let platform = TestPlatform::default();

    let result = DefaultPool::new(64, TestPlatform::STORE_SIZE, &platform);

    assert_eq!(Some(CreateError::OutOfMemory { size: 64 * TestPlatform::STORE_SIZE }), result.err());
    assert_eq!(0, platform.allocated());
}

#[test]
fn pool_new_block_size() {
    fn block_size(object_size: usize) -> usize {
        let platform = TestPlatform::default();
        let pool = DefaultPool::new(object_size, 4, &platform).expect("Pool");
        pool.block_size()
    }

    assert_eq!(POINTER_SIZE, block_size(1));
    assert_eq!(POINTER_SIZE, block_size(POINTER_SIZE));
    assert_eq!(24, block_size(24));
    assert_eq!(32, block_size(32));
    assert_eq!(2 * POINTER_SIZE, block_size(POINTER_SIZE + 1));

    //  Rounded up to the alignment of the link, so that every block is suitably aligned for it.
    assert_eq!(0, block_size(12) % POINTER_SIZE);
    assert!(block_size(12) >= 12);

    #[cfg(target_pointer_width = "64")]
    assert_eq!(16, block_size(12));

    #[cfg(target_pointer_width = "64")]
    assert_eq!(16, block_size(13));
}

#[test]
fn pool_new_block_spacing() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(12, 4, &platform).expect("Pool");

    let blocks = [pool.allocate(), pool.allocate(), pool.allocate(), pool.allocate()];
    let first = blocks[0].expect("Block").as_ptr() as usize;

    for (index, block) in blocks.iter().enumerate() {
        let address = block.expect("Block").as_ptr() as usize;

        assert_eq!(first + index * pool.block_size(), address);
        assert_eq!(0, address % POINTER_SIZE);
    }

    assert_eq!(4 * pool.block_size(), pool.layout().size());

    for block in &blocks {
        unsafe { pool.deallocate(*block) };
    }
}

#[test]
fn pool_with_layout_block_size() {
    fn block_size(size: usize, align: usize) -> usize {
        let platform = TestPlatform::default();
        let layout = Layout::from_size_align(size, align).expect("Layout");
        let pool = DefaultPool::with_layout(layout, 2, &platform).expect("Pool");
        pool.block_size()
    }

    assert_eq!(POINTER_SIZE, block_size(1, 1));
    assert_eq!(24, block_size(24, 8));
    assert_eq!(32, block_size(24, 32));
    assert_eq!(64, block_size(24, 64));
}

#[test]
fn pool_with_layout_alignment() {
    let platform = TestPlatform::default();
    let layout = Layout::from_size_align(24, 64).expect("Layout");

    let pool = DefaultPool::with_layout(layout, 4, &platform).expect("Pool");

    assert_eq!(64, pool.layout().align());
    assert_eq!(256, pool.layout().size());

    let blocks = [pool.allocate(), pool.allocate(), pool.allocate(), pool.allocate()];

    for block in &blocks {
        let block = block.expect("Block");
        assert_eq!(0, block.as_ptr() as usize % 64);
    }

    for block in &blocks {
        unsafe { pool.deallocate(*block) };
    }
}

#[test]
fn pool_reserves_once() {
    let platform = TestPlatform::default();

    {
        let pool = DefaultPool::new(24, 4, &platform).expect("Pool");
        assert_eq!(1, platform.allocated());
        assert_eq!(0, platform.deallocated());

        let block = pool.allocate();
        unsafe { pool.deallocate(block) };

        assert_eq!(1, platform.allocated());
        assert_eq!(0, platform.deallocated());
    }

    assert_eq!(1, platform.allocated());
    assert_eq!(1, platform.deallocated());
}

#[test]
fn pool_initial_free_list_address_order() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(24, 4, &platform).expect("Pool");

    assert_eq!(4, pool.free_blocks());
    assert_eq!(96, pool.layout().size());

    let blocks = [pool.allocate(), pool.allocate(), pool.allocate(), pool.allocate()];

    for (index, block) in blocks.iter().enumerate() {
        let block = block.expect("Block");
        assert_eq!(Some(index), pool.index_of(block.as_ptr()));
    }

    let first = blocks[0].expect("Block").as_ptr() as usize;

    for (index, block) in blocks.iter().enumerate() {
        assert_eq!(first + index * 24, block.expect("Block").as_ptr() as usize);
    }

    for block in &blocks {
        unsafe { pool.deallocate(*block) };
    }
}

#[test]
fn pool_capacity_bound() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 4, &platform).expect("Pool");

    let blocks = [pool.allocate(), pool.allocate(), pool.allocate(), pool.allocate()];

    assert!(blocks.iter().all(|block| block.is_some()));
    assert!(pool.is_exhausted());
    assert_eq!(None, pool.allocate());

    for block in &blocks {
        unsafe { pool.deallocate(*block) };
    }

    assert_eq!(0, pool.stats().allocated_blocks);
}

#[test]
fn pool_exhaustion_idempotent() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(8, 2, &platform).expect("Pool");

    let (a, b) = (pool.allocate(), pool.allocate());
    let stats = pool.stats();

    for _ in 0..4 {
        assert_eq!(None, pool.allocate());
        assert_eq!(None, pool.free.peek());
        assert_eq!(stats, pool.stats());
    }

    unsafe { pool.deallocate(b) };
    unsafe { pool.deallocate(a) };
}

#[test]
fn pool_lifo_reuse() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(24, 4, &platform).expect("Pool");

    let (a, b) = (pool.allocate(), pool.allocate());
    assert_ne!(a, b);

    unsafe { pool.deallocate(a) };
    unsafe { pool.deallocate(b) };

    assert_eq!(b, pool.allocate());
    assert_eq!(a, pool.allocate());

    unsafe { pool.deallocate(a) };
    unsafe { pool.deallocate(b) };
}

#[test]
fn pool_allocate_not_zeroed() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(24, 1, &platform).expect("Pool");

    let block = pool.allocate().expect("Block");

    unsafe { ptr::write_bytes(block.as_ptr(), 0xfe, 24) };
    unsafe { pool.deallocate(Some(block)) };

    let again = pool.allocate().expect("Block");
    assert_eq!(block, again);

    //  The link occupies the first bytes, the remainder is left as is.
    let tail = unsafe { core::slice::from_raw_parts(again.as_ptr().add(POINTER_SIZE), 24 - POINTER_SIZE) };
    assert!(tail.iter().all(|byte| *byte == 0xfe));

    unsafe { pool.deallocate(Some(again)) };
}

#[test]
fn pool_deallocate_none() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 2, &platform).expect("Pool");

    let block = pool.allocate();

    unsafe { pool.deallocate(None) };

    assert_eq!(1, pool.stats().allocated_blocks);
    assert_eq!(1, pool.free_blocks());

    unsafe { pool.deallocate(block) };

    assert_eq!(0, pool.stats().allocated_blocks);
    assert_eq!(2, pool.free_blocks());
}

#[test]
fn pool_stats_tracked() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 4, &platform).expect("Pool");

    assert_eq!(AllocatorStats { total_blocks: 4, allocated_blocks: 0, peak_usage: 0, fragmentation_metric: 0 },
        pool.stats());

    let (a, b, c) = (pool.allocate(), pool.allocate(), pool.allocate());

    assert_eq!(AllocatorStats { total_blocks: 4, allocated_blocks: 3, peak_usage: 3, fragmentation_metric: 0 },
        pool.stats());

    unsafe { pool.deallocate(b) };
    unsafe { pool.deallocate(a) };

    assert_eq!(AllocatorStats { total_blocks: 4, allocated_blocks: 1, peak_usage: 3, fragmentation_metric: 0 },
        pool.stats());

    unsafe { pool.deallocate(c) };

    assert_eq!(AllocatorStats { total_blocks: 4, allocated_blocks: 0, peak_usage: 3, fragmentation_metric: 0 },
        pool.stats());
}

#[test]
fn pool_stats_untracked() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(24, 4, &platform).expect("Pool");

    let (a, b) = (pool.allocate(), pool.allocate());

    assert_eq!(AllocatorStats { total_blocks: 4, allocated_blocks: 0, peak_usage: 0, fragmentation_metric: 0 },
        pool.stats());

    unsafe { pool.deallocate(a) };
    unsafe { pool.deallocate(b) };
}

#[test]
fn pool_owns() {
    let platform = TestPlatform::default();
    let pool = DefaultPool::new(24, 4, &platform).expect("Pool");

    let block = pool.allocate().expect("Block");
    let address = block.as_ptr() as usize;

    assert!(pool.owns(block.as_ptr()));
    assert!(pool.owns((address + 24) as *const u8));

    assert!(!pool.owns((address + 1) as *const u8));
    assert!(!pool.owns((address + 96) as *const u8));
    assert!(!pool.owns(ptr::null()));

    let local = 0u64;
    assert!(!pool.owns(&local as *const u64 as *const u8));

    unsafe { pool.deallocate(Some(block)) };
}

#[test]
fn pool_try_deallocate() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 4, &platform).expect("Pool");

    let block = pool.allocate().expect("Block");
    let address = block.as_ptr() as usize;

    let inner = NonNull::new((address + 4) as *mut u8).expect("Non-null");
    let result = unsafe { pool.try_deallocate(inner) };

    assert_eq!(Err(DeallocateError::Misaligned { address: address + 4, misalignment: 4 }), result);
    assert_eq!(1, pool.stats().allocated_blocks);
    assert_eq!(3, pool.free_blocks());

    let mut foreign = 0u64;
    let foreign = NonNull::from(&mut foreign).cast::<u8>();
    let result = unsafe { pool.try_deallocate(foreign) };

    assert_eq!(Err(DeallocateError::OutOfRange { address: foreign.as_ptr() as usize }), result);
    assert_eq!(1, pool.stats().allocated_blocks);
    assert_eq!(3, pool.free_blocks());

    assert_eq!(Ok(()), unsafe { pool.try_deallocate(block) });
    assert_eq!(0, pool.stats().allocated_blocks);
    assert_eq!(4, pool.free_blocks());
}

#[test]
fn pool_hardened_deallocate_rejects() {
    let platform = TestPlatform::default();
    let pool = HardenedPool::new(24, 4, &platform).expect("Pool");

    let block = pool.allocate().expect("Block");
    let address = block.as_ptr() as usize;

    let mut foreign = 0u64;
    let foreign = NonNull::from(&mut foreign).cast::<u8>();

    unsafe { pool.deallocate(Some(foreign)) };
    unsafe { pool.deallocate(NonNull::new((address + 8) as *mut u8)) };

    assert_eq!(1, pool.stats().allocated_blocks);
    assert_eq!(3, pool.free_blocks());
    assert_eq!(0, unsafe { *foreign.cast::<u64>().as_ptr() });

    unsafe { pool.deallocate(Some(block)) };

    assert_eq!(0, pool.stats().allocated_blocks);
    assert_eq!(4, pool.free_blocks());
}

#[test]
fn pool_move() {
    fn consume(pool: TrackedPool<'_>, block: Option<NonNull<u8>>) -> usize {
        unsafe { pool.deallocate(block) };
        pool.stats().peak_usage
    }

    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 4, &platform).expect("Pool");

    let block = pool.allocate();
    let moved = pool;

    assert!(moved.owns(block.expect("Block").as_ptr()));
    assert_eq!(1, moved.stats().allocated_blocks);

    assert_eq!(1, consume(moved, block));
    assert_eq!(1, platform.deallocated());
}

#[test]
#[should_panic(expected = "Pool dropped with 1 outstanding blocks")]
fn pool_drop_outstanding() {
    let platform = TestPlatform::default();
    let pool = TrackedPool::new(24, 4, &platform).expect("Pool");

    let _leaked = pool.allocate();
}

} // mod tests
