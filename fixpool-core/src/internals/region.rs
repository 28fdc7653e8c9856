//! Region
//!
//! The contiguous memory reserved by a Pool, carved into `block_count` blocks of `block_size` bytes each.

use core::{alloc::Layout, ptr::NonNull};

use crate::DeallocateError;

/// Region.
///
/// A Region only describes the memory; it neither reserves nor releases it.
pub(crate) struct Region {
    base: NonNull<u8>,
    block_size: usize,
    block_count: usize,
}

impl Region {
    /// Creates an instance.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `base` points to at least `block_size * block_count` bytes.
    pub(crate) unsafe fn new(base: NonNull<u8>, block_size: usize, block_count: usize) -> Self {
        debug_assert!(block_size > 0);
        debug_assert!(block_count > 0);
        debug_assert!(block_size.checked_mul(block_count).is_some());

        Self { base, block_size, block_count }
    }

    /// Computes the layout of a region of `block_count` blocks, each `block_size` bytes, aligned on `align`.
    ///
    /// Returns None if the size overflows.
    pub(crate) fn layout(block_size: usize, block_count: usize, align: usize) -> Option<Layout> {
        let size = block_size.checked_mul(block_count)?;

        Layout::from_size_align(size, align).ok()
    }

    /// Returns the start of the region.
    pub(crate) fn base(&self) -> NonNull<u8> { self.base }

    /// Returns the size of a block, in bytes.
    pub(crate) fn block_size(&self) -> usize { self.block_size }

    /// Returns the number of blocks.
    pub(crate) fn block_count(&self) -> usize { self.block_count }

    /// Returns the size of the region, in bytes.
    pub(crate) fn size(&self) -> usize { self.block_size * self.block_count }

    /// Returns a pointer to the start of the `index`th block.
    ///
    /// #   Safety
    ///
    /// -   Assumes that `index` is less than `block_count`.
    pub(crate) unsafe fn block(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.block_count, "{} >= {}", index, self.block_count);

        //  Safety:
        //  -   `index * block_size` is within the region, as per pre-condition.
        NonNull::new_unchecked(self.base.as_ptr().add(index * self.block_size))
    }

    /// Returns the index of the block starting at `address`.
    ///
    /// The address is only valid if it lies within `[base, base + size)` and its offset from `base` is an exact
    /// multiple of `block_size`.
    pub(crate) fn locate(&self, address: *const u8) -> Result<usize, DeallocateError> {
        let address = address as usize;
        let base = self.base.as_ptr() as usize;

        if address < base || address - base >= self.size() {
            return Err(DeallocateError::OutOfRange { address });
        }

        let offset = address - base;
        let misalignment = offset % self.block_size;

        if misalignment != 0 {
            return Err(DeallocateError::Misaligned { address, misalignment });
        }

        Ok(offset / self.block_size)
    }
}

#[cfg(test)]
mod tests {

use super::*;

#[repr(align(64))]
struct Store([u8; 256]);

fn region_of(store: &Store, block_size: usize, block_count: usize) -> Region {
    assert!(block_size * block_count <= store.0.len());

    let base = NonNull::from(&store.0).cast();

    //  Safety:
    //  -   `store` is sufficiently large, as per the assert above.
    unsafe { Region::new(base, block_size, block_count) }
}

#[test]
fn region_layout() {
    let layout = Region::layout(24, 4, 8).expect("Valid layout");

    assert_eq!(96, layout.size());
    assert_eq!(8, layout.align());

    assert_eq!(None, Region::layout(usize::MAX / 2, 3, 8));
    assert_eq!(None, Region::layout(usize::MAX / 2 + 1, 1, 8));
}

#[test]
fn region_block() {
    let store = Store([0; 256]);
    let region = region_of(&store, 24, 4);

    let base = region.base().as_ptr() as usize;

    assert_eq!(96, region.size());

    for index in 0..4 {
        let block = unsafe { region.block(index) };
        assert_eq!(base + index * 24, block.as_ptr() as usize);
    }
}

#[test]
fn region_locate_valid() {
    let store = Store([0; 256]);
    let region = region_of(&store, 24, 4);

    for index in 0..4 {
        let block = unsafe { region.block(index) };
        assert_eq!(Ok(index), region.locate(block.as_ptr()));
    }
}

#[test]
fn region_locate_out_of_range() {
    let store = Store([0; 256]);
    let region = region_of(&store, 24, 4);

    let base = region.base().as_ptr() as usize;

    let before = (base - 24) as *const u8;
    let end = (base + 96) as *const u8;
    let after = (base + 120) as *const u8;

    assert_eq!(Err(DeallocateError::OutOfRange { address: base - 24 }), region.locate(before));
    assert_eq!(Err(DeallocateError::OutOfRange { address: base + 96 }), region.locate(end));
    assert_eq!(Err(DeallocateError::OutOfRange { address: base + 120 }), region.locate(after));
    assert_eq!(Err(DeallocateError::OutOfRange { address: 0 }), region.locate(core::ptr::null()));
}

#[test]
fn region_locate_misaligned() {
    let store = Store([0; 256]);
    let region = region_of(&store, 24, 4);

    let base = region.base().as_ptr() as usize;

    let inner = (base + 8) as *const u8;
    let last = (base + 95) as *const u8;

    assert_eq!(Err(DeallocateError::Misaligned { address: base + 8, misalignment: 8 }), region.locate(inner));
    assert_eq!(Err(DeallocateError::Misaligned { address: base + 95, misalignment: 23 }), region.locate(last));
}

} // mod tests
