//! Configuration schema and JSON5 loading for Lagoon.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Config file discovery and loading.
pub use loader::{default_config_path, load, load_or_default};
/// Configuration schema models.
pub use model::*;
