//! # Core Module
//!
//! Configuration and error types shared by every component of the client.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: YAML config file support next to the CLI flags
//! - 1.0.0: Initial creation with config and error modules

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{ChannelConfig, CliArgs, Config, LoginCommand, Mode};
pub use error::{RegistryError, SessionError, TransportError};
