//! Citadel node: configuration and wiring for the guardian quorum and
//! treasury protection protocol.
//!
//! The node owns no protocol logic of its own. It:
//! - Loads and validates a [`ProtocolConfig`] from TOML
//! - Builds every component with one-way dependency injection
//! - Applies genesis principals and backups
//! - Feeds the event stream into per-operation counters

pub mod config;
pub mod error;
pub mod protocol;

pub use config::{GenesisPrincipal, ProtocolConfig};
pub use error::NodeError;
pub use protocol::{Protocol, ProtocolStatus};
