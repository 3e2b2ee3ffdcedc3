//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WebServerConfig (validated, immutable)
//!     → handed to the controller at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AnnouncementConfig;
pub use schema::ContributionConfig;
pub use schema::ObservabilityConfig;
pub use schema::PathsConfig;
pub use schema::ServerConfig;
pub use schema::ShutdownConfig;
pub use schema::WebServerConfig;
