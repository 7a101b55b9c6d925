//! Core of the Counting Mochi bot.
//!
//! This crate is intentionally framework-agnostic. The counting game decides
//! outcomes; Telegram lives behind the `MessagingPort` implemented in the
//! adapter crate.

pub mod audit;
pub mod config;
pub mod counting;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;

pub use errors::{Error, Result};
