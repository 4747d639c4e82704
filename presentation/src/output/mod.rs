//! Output formatting for the CLI

pub mod console;
pub mod formatter;
pub mod json;
