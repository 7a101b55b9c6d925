//! The counting game: parse a message, judge it against the group's count,
//! and tell the messaging layer what to do about it.

pub mod evaluator;
pub mod expr;
pub mod respond;
pub mod store;

pub use evaluator::{evaluate, BreakReason, GroupState, Outcome};
pub use store::GroupStore;
