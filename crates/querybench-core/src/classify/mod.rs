//! Lexical heuristics over raw SQL text and database error messages.
//!
//! None of this is a parser. Every entry point accepts arbitrary text and
//! falls back to a default tier or label instead of failing.

pub mod complexity;
pub mod errors;
pub mod tables;

pub use complexity::analyze_complexity;
pub use errors::{classify_error, ErrorKind};
pub use tables::extract_tables;
