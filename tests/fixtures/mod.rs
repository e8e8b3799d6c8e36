//! Test Fixtures Module
//!
//! Generated audio and Live API message fixtures.

// Each test binary uses a different subset of the fixtures
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;
