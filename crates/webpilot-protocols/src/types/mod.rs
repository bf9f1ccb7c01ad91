//! Conversation types shared by providers and the agent loop.

mod common;
mod content;
mod message;

pub use common::*;
pub use content::*;
pub use message::*;
