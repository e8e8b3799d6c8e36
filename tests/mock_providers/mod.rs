//! Mock Provider Servers
//!
//! In-process servers that speak the Live API wire protocol, with
//! scriptable replies and failure modes:
//! - Delayed or missing setup acknowledgment
//! - Malformed messages
//! - Server-initiated close

// Each test binary uses a different subset of the mocks
#![allow(dead_code)]

pub mod live_mock;

pub use live_mock::*;
