//! Shared message type and the error-context helpers used across all pinion crates.

pub mod error;
pub mod message;

pub use {
    error::FromMessage,
    message::{Message, values_equal},
};
