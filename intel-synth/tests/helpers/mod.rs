//! Test Helper Utilities
//!
//! Call-counting stub clients for the three external services, plus
//! builders for services, state and search outcomes.

#![allow(dead_code)]

pub mod stubs;

#[allow(unused_imports)]
pub use stubs::{
    outcome_failed, outcome_ok, services, test_state, SearchBehavior, StubCompletion, StubSearch,
    StubSpeech,
};
