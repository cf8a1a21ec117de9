//! Configuration Module
//!
//! Handles configuration loading, validation and CLI overrides.

pub mod manager;
pub mod types;

pub use manager::{CliOverrides, ConfigManager};
pub use types::*;
