//! Core domain types and utilities for the Greek study tool.
//!
//! This crate provides the foundational identifiers and the storage error
//! taxonomy shared by the identity and analysis crates.

pub mod error;
pub mod id;

pub use error::{Result, StoreError};
pub use id::{AnalysisId, ParseIdError, UserId};
