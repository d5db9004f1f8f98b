//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or embedding code
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → HttpConfig shared via Arc with the listener and every session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the gateway starts; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{GatewayConfig, HttpConfig, ObservabilityConfig};
pub use validation::{validate_config, validate_http, ValidationError};
