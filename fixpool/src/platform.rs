//! Platforms backing the region of a Pool.

mod system;

pub use system::SystemPlatform;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::MmapPlatform;
