//! Report stream parsing.
//!
//! Processes embed JSON reports in their stdout between an open and a close
//! delimiter. This module scans chunked output for those segments and keeps
//! everything else as stray text.

mod error;
mod parser;
mod types;

pub use error::ReportParseError;
pub use parser::ReportParser;
pub use types::{Report, ReportDelimiters, ScanEvent, DEFAULT_CLOSE, DEFAULT_OPEN};
