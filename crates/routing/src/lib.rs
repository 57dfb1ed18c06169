//! Route messages to registrations by partial-attribute patterns.
//!
//! Resolution cascade (precedence):
//! 1. Every literal constraint of the pattern is present in the message
//! 2. Highest specificity (most literal constraints)
//! 3. Most recent registration

pub mod error;
pub mod index;
pub mod pattern;
pub mod syntax;

pub use {
    error::{Error, Result},
    index::{Entry, PatternIndex},
    pattern::{Constraint, Pattern, WILDCARD},
    syntax::{parse_message, parse_scalar},
};
