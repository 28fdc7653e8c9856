//! A free Block of a Pool, and the intrusive stack threading the free blocks together.

use core::{
    cell::Cell,
    ptr::{self, NonNull},
};

use crate::{PowerOf2, utils};

//  Link to the next free block, if any.
type Link = Cell<Option<NonNull<FreeBlock>>>;

/// FreeBlock.
///
/// The in-place header of a block which is currently free: a single link to the next free block, if any.
#[repr(C)]
#[derive(Default)]
pub(crate) struct FreeBlock {
    next: Link,
}

impl FreeBlock {
    /// In-place constructs a `FreeBlock` linking to `next`.
    ///
    /// #   Safety
    ///
    /// -   Assumes that access to the memory location is exclusive.
    /// -   Assumes that there is sufficient memory available.
    /// -   Assumes that the pointer is correctly aligned.
    #[allow(clippy::cast_ptr_alignment)]
    pub(crate) unsafe fn initialize(at: NonNull<u8>, next: Option<NonNull<FreeBlock>>) -> NonNull<FreeBlock> {
        debug_assert!(utils::is_sufficiently_aligned_for(at, PowerOf2::align_of::<FreeBlock>()));

        //  Safety:
        //  -   `at` is assumed to be sufficiently aligned.
        let ptr = at.as_ptr() as *mut FreeBlock;

        //  Safety:
        //  -   Access to the memory location is exclusive.
        //  -   `ptr` is assumed to be sufficiently sized.
        ptr::write(ptr, FreeBlock { next: Cell::new(next) });

        at.cast()
    }
}

/// FreeList.
///
/// A LIFO stack of `FreeBlock`, the links being stored within the blocks themselves.
#[derive(Default)]
pub(crate) struct FreeList(Link);

impl FreeList {
    /// Creates an instance.
    #[cfg(test)]
    pub(crate) fn new(ptr: Option<NonNull<FreeBlock>>) -> Self { Self(Cell::new(ptr)) }

    /// Returns whether the stack is empty, or not.
    pub(crate) fn is_empty(&self) -> bool { self.peek().is_none() }

    /// Returns the head of the stack, if any, without popping it.
    pub(crate) fn peek(&self) -> Option<NonNull<FreeBlock>> { self.0.get() }

    /// Pops the head of the stack, if any.
    ///
    /// The returned memory still contains the stale link.
    pub(crate) fn pop(&self) -> Option<NonNull<u8>> {
        let result = self.peek()?;

        //  Safety:
        //  -   Non-null, and valid instance, as only initialized blocks are ever pushed.
        let next = unsafe { result.as_ref().next.get() };
        self.0.set(next);

        Some(result.cast())
    }

    /// Pushes the block at `at` on top of the stack.
    ///
    /// #   Safety
    ///
    /// -   Assumes that access to the block is exclusive, and remains so until it is popped.
    /// -   Assumes that the block is sufficiently sized and aligned for a `FreeBlock`.
    /// -   Assumes that the block is not already within the stack.
    pub(crate) unsafe fn push(&self, at: NonNull<u8>) {
        let block = FreeBlock::initialize(at, self.peek());

        self.0.set(Some(block));
    }

    /// Returns the number of blocks in the stack.
    ///
    /// Walks the entire stack, O(n).
    pub(crate) fn len(&self) -> usize {
        let mut result = 0;
        let mut current = self.peek();

        while let Some(block) = current {
            result += 1;

            //  Safety:
            //  -   Non-null, and valid instance, as only initialized blocks are ever pushed.
            current = unsafe { block.as_ref().next.get() };
        }

        result
    }
}

// mod tests
