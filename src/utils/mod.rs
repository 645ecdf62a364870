//! Shared utilities: input validation and system tool resolution.

pub mod binary;
pub mod validation;

pub use binary::{resolve_binary, validate_binary, BinaryError};
pub use validation::validate_input_file;
