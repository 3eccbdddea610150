//! Core Module - Report Parsing & Pipeline
//!
//! Parsing of CLI reports, beat formatting, the fetch/publish pipeline and the daily scheduler.

pub mod beats;
pub mod operations;
pub mod parser;
pub mod scheduler;

pub use beats::*;
pub use operations::*;
pub use parser::*;
pub use scheduler::*;
