//! Error types for the webpilot protocol layer.

mod agent;
mod browser;
mod provider;
mod tool;

pub use agent::*;
pub use browser::*;
pub use provider::*;
pub use tool::*;
