//! The internals of fixpool-core.
//!
//! The internals provide the free-list and region bookkeeping behind `Pool`.

pub mod blocks;
pub mod region;
