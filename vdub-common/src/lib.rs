//! # vdub Common Library
//!
//! Shared code for the vdub crates:
//! - Configuration loading and config file resolution
//! - Supported language table (the single place mapping languages to models)
//! - Common error type

pub mod config;
pub mod error;
pub mod language;

pub use error::{Error, Result};
pub use language::Language;
