//! Typed Pool
//!
//! A pool dedicated to values of a single type, which moves values into its blocks and hands out `PoolBox` handles.
//!
//! A `PoolBox` borrows its pool, hence the pool cannot be dropped, or moved, whilst any of its values is alive.

use std::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

use fixpool_core::{AllocatorStats, Configuration, CreateError, DefaultConfiguration};

use crate::PoolAllocator;

/// A pool of `T`.
///
/// #   Example
///
/// ```
/// use fixpool::TypedPool;
///
/// struct Particle { position: [f32; 3], velocity: [f32; 3] }
///
/// let pool = TypedPool::<Particle>::new(2).expect("Pool");
///
/// let particle = pool.insert(Particle { position: [0.0; 3], velocity: [1.0; 3] }).ok().expect("Free block");
/// assert_eq!([1.0; 3], particle.velocity);
/// ```
pub struct TypedPool<T, C = DefaultConfiguration>
    where
        C: Configuration,
{
    allocator: PoolAllocator<C>,
    _marker: PhantomData<T>,
}

impl<T, C> TypedPool<T, C>
    where
        C: Configuration,
{
    /// Creates a pool of `capacity` blocks, each suitable for a `T`.
    ///
    /// Returns an error if `capacity` is 0, if `T` is zero-sized, or if the region cannot be reserved.
    #[cold]
    pub fn new(capacity: usize) -> Result<Self, CreateError> {
        let allocator = PoolAllocator::for_type::<T>(capacity)?;

        Ok(Self { allocator, _marker: PhantomData })
    }

    /// Moves `value` into a free block.
    ///
    /// Returns `value` back if the pool is exhausted.
    #[inline]
    pub fn insert(&self, value: T) -> Result<PoolBox<'_, T, C>, T> {
        let block = match self.allocator.allocate() {
            Some(block) => block.cast::<T>(),
            None => return Err(value),
        };

        //  Safety:
        //  -   `block` is sized and aligned for a `T`, as the pool was created for `T`.
        //  -   `block` is exclusively owned, having just been allocated.
        unsafe { ptr::write(block.as_ptr(), value) };

        Ok(PoolBox { value: block, pool: self })
    }

    /// Returns the number of blocks of the pool.
    pub fn capacity(&self) -> usize { self.allocator.block_count() }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> AllocatorStats { self.allocator.stats() }

    /// Returns the number of values which can still be inserted.
    ///
    /// Walks the free-list, O(n).
    pub fn available(&self) -> usize { self.allocator.as_pool().free_blocks() }

    //  Returns the block of `value` to the pool.
    //
    //  #   Safety
    //
    //  -   Assumes that `value` was inserted in this pool, and has been dropped or moved out of since.
    unsafe fn release(&self, value: NonNull<T>) { self.allocator.deallocate(Some(value.cast())) }
}

impl<T, C> fmt::Debug for TypedPool<T, C>
    where
        C: Configuration,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPool").field("allocator", &self.allocator).finish()
    }
}

/// A value stored within a `TypedPool`.
///
/// Dropping the `PoolBox` drops the value and returns its block to the pool.
pub struct PoolBox<'a, T, C = DefaultConfiguration>
    where
        C: Configuration,
{
    value: NonNull<T>,
    pool: &'a TypedPool<T, C>,
}

impl<'a, T, C> PoolBox<'a, T, C>
    where
        C: Configuration,
{
    /// Moves the value out of the pool, returning its block.
    pub fn into_inner(this: Self) -> T {
        let this = mem::ManuallyDrop::new(this);

        //  Safety:
        //  -   `value` is initialized, and is never read again.
        let value = unsafe { ptr::read(this.value.as_ptr()) };

        //  Safety:
        //  -   `value` was inserted in `pool`, and has just been moved out of.
        unsafe { this.pool.release(this.value) };

        value
    }

    /// Returns the address of the block holding the value.
    pub fn as_ptr(this: &Self) -> *const T { this.value.as_ptr() }
}

impl<'a, T, C> Deref for PoolBox<'a, T, C>
    where
        C: Configuration,
{
    type Target = T;

    fn deref(&self) -> &T {
        //  Safety:
        //  -   `value` is initialized, and borrowed along `self`.
        unsafe { self.value.as_ref() }
    }
}

impl<'a, T, C> DerefMut for PoolBox<'a, T, C>
    where
        C: Configuration,
{
    fn deref_mut(&mut self) -> &mut T {
        //  Safety:
        //  -   `value` is initialized, and exclusively borrowed along `self`.
        unsafe { self.value.as_mut() }
    }
}

impl<'a, T, C> Drop for PoolBox<'a, T, C>
    where
        C: Configuration,
{
    fn drop(&mut self) {
        //  Safety:
        //  -   `value` is initialized, and never accessed again.
        unsafe { ptr::drop_in_place(self.value.as_ptr()) };

        //  Safety:
        //  -   `value` was inserted in `pool`, and has just been dropped.
        unsafe { self.pool.release(self.value) };
    }
}

impl<'a, T, C> fmt::Debug for PoolBox<'a, T, C>
    where
        T: fmt::Debug,
        C: Configuration,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Debug::fmt(&**self, f) }
}

// mod tests
