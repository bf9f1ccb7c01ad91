//! LLM Provider protocol definitions.
//!
//! A provider turns a conversation into the next assistant turn and knows how
//! its API expects assistant turns and tool results to be written back.

mod request;
mod response;
mod traits;

pub use request::*;
pub use response::*;
pub use traits::*;
