//! Utils Module - Helper Functions & Shared Utilities

pub mod cache;
pub mod constants;
pub mod shutdown;

pub use cache::*;
pub use shutdown::*;
