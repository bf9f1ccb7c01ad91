//! Tool protocol definitions.
//!
//! Tools are the only way the agent touches the browser.

mod context;
mod definition;
mod result;
mod traits;

pub use context::*;
pub use definition::*;
pub use result::*;
pub use traits::*;
