//! The API of fixpool-core.

mod configuration;
mod error;
mod platform;
mod pool;
mod statistics;

pub use configuration::{Configuration, DefaultConfiguration, HardenedConfiguration, TrackedConfiguration};
pub use error::{CreateError, DeallocateError};
pub use platform::Platform;
pub use pool::Pool;
pub use statistics::{AllocatorStats, NoStatistics, Statistics, TrackStatistics};

pub use crate::utils::PowerOf2;
