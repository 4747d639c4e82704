//! Core domain concepts shared across all subdomains.
//!
//! - [`bounded::BoundedBuffer`]: fixed-capacity FIFO used for history, examples and feedback
//! - [`error::DomainError`]: domain-level errors

pub mod bounded;
pub mod error;
