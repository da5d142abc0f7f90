//! Shared utilities for the Citadel protocol.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use stats::EventStats;
pub use time::format_duration;
