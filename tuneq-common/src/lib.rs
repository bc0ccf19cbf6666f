//! # tuneq Common Library
//!
//! Shared code for the tuneq workspace:
//! - Bootstrap configuration (TOML schema, config file lookup, music root resolution)
//! - Common error type
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod human_time;

pub use error::{Error, Result};
