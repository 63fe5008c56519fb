//! # Intel Common Library
//!
//! Shared code for the intelligence synthesis services:
//! - Error types
//! - Bootstrap configuration loading
//! - Secret resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
