//! Visual decorations over buffer text.
//!
//! - [`StyleRange`] / [`Rgb`]: a decorated char interval
//! - [`StyleStore`]: ranges keyed by start offset
//! - [`StyleProvider`]: the active per-line styling policy
//! - [`markup`]: HTML generation for a buffer window
//! - [`rules`]: regex-driven styler configured from JSON5

pub mod markup;
mod provider;
mod range;
pub mod rules;
mod store;

pub use provider::{LineStyleEvent, LineStyler, StyleProvider, styler_fn};
pub use range::{ColorParseError, Rgb, StyleRange};
pub use rules::{Rule, RuleStyler, RulesError};
pub use store::StyleStore;
