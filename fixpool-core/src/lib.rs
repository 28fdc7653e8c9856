#![no_std]

#![deny(missing_docs)]

//! Building blocks for a fixed-block-size memory pool.
//!
//! fixpool-core provides a pool allocator which reserves a single contiguous region up-front, carves it into
//! equally-sized blocks, and serves allocation and deallocation requests in constant time. It contains:
//! -   A platform trait, used to reserve the region to be carved up.
//! -   A configuration trait, used to select statistics tracking and deallocation validation at compile-time.
//! -   The `Pool` itself.
//!
//! A `Pool` is strictly single-threaded: it may be moved to another thread, but never shared.

mod api;
mod internals;
mod utils;

pub use api::*;
