//! Tether Translate - async resolution framework
//!
//! - [`Translator`]: one asynchronous resolution source
//! - [`fan_out`]: queries many translators concurrently and merges the outcomes
//! - [`Lookup`]: a runtime-extensible set of translators for one identifier
//!   domain, plus the platform's built-in resolution path
//!
//! Host adapters register translators into lookups; linkers consult lookups to
//! turn stored identifiers back into live entity handles.

#![deny(unsafe_code)]

pub mod aggregator;
pub mod lookup;
pub mod translator;

// Re-exports
pub use aggregator::fan_out;
pub use lookup::{Lookup, TranslatorRegistry};
pub use translator::{FnTranslator, Translator};
