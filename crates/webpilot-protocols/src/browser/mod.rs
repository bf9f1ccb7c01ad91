//! Browser driver protocol.
//!
//! The agent core never talks to a concrete browser; it goes through
//! [`BrowserDriver`], and element enumeration comes back as unscored
//! [`RawElement`] attribute bags.

mod driver;
mod element;

pub use driver::*;
pub use element::*;
