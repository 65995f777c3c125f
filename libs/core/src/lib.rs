//! Chatlayer bridge core contracts and value types.
//!
//! This crate holds the platform-agnostic message model exchanged with the
//! test framework, the connector configuration resolved at startup, and the
//! capability record that selects which parts of the webhook protocol are
//! understood.
pub mod capabilities;
pub mod config;
pub mod types;

pub use capabilities::*;
pub use config::{ConfigError, ConnectorConfig, ConnectorSettings, Credentials, NlpSettings};
pub use types::*;
