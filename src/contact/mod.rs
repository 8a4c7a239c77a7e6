//! Best-effort contact directory derived from message history.
//!
//! The phone never exports its address book, only the display name it had for
//! each number at the time a message was backed up. The resolver merges the
//! different spellings of a number under one canonical key and keeps the most
//! useful name it has seen.

mod collector;
pub mod normalize;
mod resolver;

pub use collector::ContactCollector;
pub use normalize::{canonical_number, UNKNOWN_NAME};
pub use resolver::{Contact, ContactResolver};
