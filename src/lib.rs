//! tls-legacy - blocking-style TLS API over a non-blocking record layer
//!
//! This crate adapts a legacy read/write/shutdown API (single integer result
//! plus an out-of-band retry hint) to a record-layer engine that reports
//! explicit readiness outcomes instead of blocking.

pub mod legacy;
pub mod tls;
