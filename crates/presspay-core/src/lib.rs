//! Data model and payment-challenge codec for the presspay unlock protocol.
//!
//! This crate is pure: no I/O and no ambient clock. Validating entry points
//! take the current unix time as an argument.

pub mod challenge;
pub mod errors;
pub mod types;
