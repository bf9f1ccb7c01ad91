//! Browser side of webpilot.
//!
//! Turns natural-language intents into concrete element selectors and
//! exposes the browser as a catalog of tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    WebSocket     ┌──────────────────┐
//! │   CdpDriver     │ ◄──────────────► │   Chrome/Edge    │
//! │  (this crate)   │       CDP        │                  │
//! └─────────────────┘                  └──────────────────┘
//! ```
//!
//! - [`dom`]: selector synthesis, candidate ranking and the candidate analyst.
//! - [`driver`]: [`CdpDriver`], the [`BrowserDriver`](webpilot_protocols::BrowserDriver)
//!   implementation. Chrome is launched with a persistent profile when
//!   nothing listens on the debugging port.
//! - [`tools`]: `navigate_to_url`, `click`, `type_text`, `query_dom` and the rest.

pub mod cdp;
pub mod dom;
pub mod driver;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use dom::{AnalystSelection, Candidate, CandidateAnalyst, CandidateEngine, synthesize_selector};
pub use driver::{CdpDriver, DriverConfig, dismiss_popups};
pub use tools::{BrowserToolOptions, browser_tools};
