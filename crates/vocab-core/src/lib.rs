//! # vocab-core
//!
//! Core crate for the vocabulary platform access client. Contains the
//! configuration schema, typed identifiers, client events, the API
//! response envelope, the traits other crates implement, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
