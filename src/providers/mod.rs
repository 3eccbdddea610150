//! Providers Module - External Systems
//!
//! Where reports come from (NWS product pages) and where beats go (Kafka).

pub mod kafka;
pub mod nws;

pub use kafka::*;
pub use nws::*;
