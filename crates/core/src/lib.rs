//! Core types and utilities for hooksmith
//!
//! This is the foundation crate (Layer 0) that all other hooksmith crates depend on.
//! It provides:
//! - Base error types
//! - The validated hook name type
//!
//! This crate has no dependencies on other hooksmith crates.

pub mod error;
pub mod name;

pub use error::{Error, Result};
pub use name::HookName;
