//! Implementation of the Platform trait over anonymous memory mappings, for Linux.

use std::{alloc::Layout, io, ptr::{self, NonNull}};

use fixpool_core::{Platform, PowerOf2};

/// Implementation of the Platform trait, reserving the region as a private anonymous mapping.
///
/// The region is obtained directly from the kernel, bypassing the global allocator entirely, and is returned to the
/// kernel when the pool is dropped. Its size is rounded up to a multiple of the page size.
#[derive(Clone, Copy, Debug, Default)]
pub struct MmapPlatform;

impl MmapPlatform {
    /// Creates an instance.
    pub const fn new() -> Self { Self }

    /// Returns the size of a page.
    pub fn page_size() -> PowerOf2 {
        //  Safety:
        //  -   `_SC_PAGESIZE` is always a valid name.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        assert!(page_size > 0, "Could not query page size: {}", page_size);

        PowerOf2::new(page_size as usize).expect("Page size is a power of 2")
    }

    //  Returns the size actually mapped for `layout`.
    fn mapped_size(layout: Layout) -> Option<usize> { Self::page_size().checked_round_up(layout.size()) }
}

impl Platform for MmapPlatform {
    unsafe fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let page_size = Self::page_size();
        let size = Self::mapped_size(layout)?;

        let candidate = if layout.align() <= page_size.value() {
            mmap_allocate(size)
        } else {
            //  Safety:
            //  -   The alignment of a `Layout` is always a power of 2.
            mmap_over(size, PowerOf2::new_unchecked(layout.align()))
        };

        debug_assert!(candidate.map_or(true, |pointer| pointer.as_ptr() as usize % layout.align() == 0),
            "Incorrect alignment of mapping: {:?} for {}", candidate, layout.align());

        candidate
    }

    unsafe fn deallocate(&self, pointer: NonNull<u8>, layout: Layout) {
        let size = Self::mapped_size(layout).expect("Size was mapped");

        munmap_deallocate(pointer.as_ptr(), size);
    }
}

//  Attempts to allocate the required size, aligned on `alignment`.
//
//  Ensures the alignment is met by over-allocating then trimming front and back.
//
//  Assumes that `size` is a multiple of the page size, and `alignment` is greater than the page size.
fn mmap_over(size: usize, alignment: PowerOf2) -> Option<NonNull<u8>> {
    let over_size = size.checked_add(alignment.value())?;
    let front_pointer = mmap_allocate(over_size)?;

    let misalignment = (front_pointer.as_ptr() as usize) % alignment;
    let front_size = if misalignment == 0 { 0 } else { alignment.value() - misalignment };
    let back_size = over_size - front_size - size;

    debug_assert!(front_size < alignment.value(), "{} >= {}", front_size, alignment.value());
    debug_assert!(front_size + size + back_size == over_size,
        "{} + {} + {} != {}", front_size, size, back_size, over_size);

    //  Safety:
    //  -   `front_size` is less than `over_size`, hence the result is within the mapping.
    let aligned_pointer = unsafe { front_pointer.as_ptr().add(front_size) };

    //  Safety:
    //  -   `front_size + size` is less than or equal to `over_size`, hence the result is within the mapping, or
    //      pointing to its end.
    let back_pointer = unsafe { aligned_pointer.add(size) };

    if front_size > 0 {
        //  Safety:
        //  -   `front_pointer` points to a mapping of at least `front_size` bytes.
        //  -   `[front_pointer, front_pointer + front_size)` is no longer in use.
        unsafe { munmap_deallocate(front_pointer.as_ptr(), front_size) };
    }

    if back_size > 0 {
        //  Safety:
        //  -   `back_pointer` points to a mapping of at least `back_size` bytes.
        //  -   `[back_pointer, back_pointer + back_size)` is no longer in use.
        unsafe { munmap_deallocate(back_pointer, back_size) };
    }

    NonNull::new(aligned_pointer)
}

//  Wrapper around `mmap`.
//
//  Returns a pointer to `size` bytes of memory, aligned on the page size.
fn mmap_allocate(size: usize) -> Option<NonNull<u8>> {
    let length = size;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

    //  No specific address hint.
    let addr = ptr::null_mut();
    //  When used in conjunction with MAP_ANONYMOUS, fd is mandated to be -1 on some implementations.
    let fd = -1;
    //  When used in conjunction with MAP_ANONYMOUS, offset is mandated to be 0 on some implementations.
    let offset = 0;

    //  Safety:
    //  -   `addr`, `fd`, and `offset` are suitable for MAP_ANONYMOUS.
    let result = unsafe { libc::mmap(addr, length, prot, flags, fd, offset) };

    if result == libc::MAP_FAILED {
        tracing::warn!(size, error = %io::Error::last_os_error(), "mmap failed");
        return None;
    }

    NonNull::new(result as *mut u8)
}

//  Wrapper around `munmap`.
//
//  #   Panics
//
//  If `munmap` returns a non-0 result.
//
//  #   Safety
//
//  -   Assumes that `addr` points to a mapping of at least `size` bytes.
//  -   Assumes that the range `[addr, addr + size)` is no longer in use.
unsafe fn munmap_deallocate(addr: *mut u8, size: usize) {
    let result = libc::munmap(addr as *mut libc::c_void, size);
    assert!(result == 0, "Could not munmap {:x}, {}: {}", addr as usize, size, io::Error::last_os_error());
}

// mod tests
