//! Thread module

pub mod state;
pub mod thread;

pub use state::{validate_transition, QueueRelation};
pub use thread::{ThreadId, ThreadRecord, ThreadSnapshot};
