//! Shared configuration library for Vigil.
//!
//! Centralizes `.env` handling, `vigil.toml` parsing, environment overrides
//! and detector settings loading so the server and its tooling agree on
//! defaults and precedence.

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::detector::{DetectorConfigSource, load_detector_settings};
pub use models::{AuthConfig, Config, ConfigMetadata, DatabaseConfig, RedisConfig, ServerConfig};
pub use sources::EnvConfig;
pub use validation::{ConfigWarning, ConfigWarnings};
