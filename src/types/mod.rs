//! Shared data structures for valve condition monitoring
//!
//! - Condition codes and their maintenance descriptors
//! - Feature tables, the canonical feature schema, and normal ranges
//! - Component condition profile rows used as training labels

mod condition;
mod features;
mod profile;

pub use condition::*;
pub use features::*;
pub use profile::*;
