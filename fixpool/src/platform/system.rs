//! Implementation of the Platform trait over the global allocator.

use std::{alloc::{self, Layout}, ptr::NonNull};

use fixpool_core::Platform;

/// Implementation of the Platform trait, reserving the region from the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPlatform;

impl SystemPlatform {
    /// Creates an instance.
    pub const fn new() -> Self { Self }
}

impl Platform for SystemPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);

        //  Safety:
        //  -   `layout.size()` is non-zero, as per pre-condition.
        NonNull::new(alloc::alloc(layout))
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        //  Safety:
        //  -   `pointer` was allocated by `alloc::alloc` with `layout`, as per pre-condition.
        alloc::dealloc(pointer.as_ptr(), layout);
    }
}

#[cfg(test)]
mod tests {

use super::*;

#[test]
fn system_platform_round_trip() {
    let platform = SystemPlatform::new();
    let layout = Layout::from_size_align(96, 64).expect("Layout");

    let pointer = unsafe { platform.allocate(layout) }.expect("Allocated");
    assert_eq!(0, pointer.as_ptr() as usize % 64);

    //  Safety:
    //  -   `pointer` points to 96 writable bytes.
    unsafe { std::ptr::write_bytes(pointer.as_ptr(), 0xfe, 96) };

    unsafe { platform.deallocate(pointer, layout) };
}

} // mod tests
