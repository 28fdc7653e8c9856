//! Blocks
//!
//! A Block represent a unit of allocation within a Pool.
//!
//! Whilst allocated, the content of the block is purely in the hands of the user. Whilst deallocated, however, the
//! block storage is reused to store the link to the next free block, forming an intrusive LIFO stack.
//!
//! Note: Blocks are never _constructed_, instead raw memory is reinterpreted as blocks.

mod free_block;

pub(crate) use free_block::{FreeBlock, FreeList};
