//! Errors reported by a Pool.

use thiserror::Error;

/// Failure to create a `Pool`.
///
/// No `Pool` is produced, and nothing is left to release.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum CreateError {
    /// The object size was 0.
    #[error("object size must be non-zero")]
    ZeroObjectSize,
    /// The block count was 0.
    #[error("block count must be non-zero")]
    ZeroBlockCount,
    /// The size of the region does not fit within `isize::MAX` bytes.
    #[error("region of {block_count} blocks of {block_size} bytes overflows")]
    CapacityOverflow {
        /// The size of a block, or the object size if rounding it up to a block overflowed.
        block_size: usize,
        /// The requested number of blocks.
        block_count: usize,
    },
    /// The platform could not reserve the region.
    #[error("out of memory: could not reserve {size} bytes")]
    OutOfMemory {
        /// The size of the region, in bytes.
        size: usize,
    },
}

/// Rejection of a block handed back to a `Pool`.
///
/// The free-list is left untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum DeallocateError {
    /// The address lies outside the region of the pool.
    #[error("address {address:#x} lies outside the pool region")]
    OutOfRange {
        /// The rejected address.
        address: usize,
    },
    /// The address lies within the region of the pool, but not at the start of a block.
    #[error("address {address:#x} is {misalignment} bytes past the start of a block")]
    Misaligned {
        /// The rejected address.
        address: usize,
        /// The distance, in bytes, from the start of the enclosing block.
        misalignment: usize,
    },
}
