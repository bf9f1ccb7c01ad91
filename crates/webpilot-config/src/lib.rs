//! # webpilot config
//!
//! Loads `webpilot.toml`, expands `${VAR}` placeholders, applies the
//! environment overrides and validates the result.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
