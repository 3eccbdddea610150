//! Models Module - Data Structures & Configuration
//!
//! Records flowing through the pipeline, settings, and the error type.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
