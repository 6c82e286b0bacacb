//! Entity modules.
//!
//! Each module wraps operations over one or more ports and provides the
//! building blocks for use cases.

pub mod tag_index;
pub mod trigger_ledger;

pub use tag_index::TagBindingIndex;
pub use trigger_ledger::TriggerLedger;
