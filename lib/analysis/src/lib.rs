//! Analyses: the per-user documents of the Greek study tool.
//!
//! This crate provides:
//!
//! - **Model**: `Analysis`, its listing view `AnalysisSummary`, and the
//!   validated client input `AnalysisDraft`
//! - **Store seam**: `AnalysisStore`, whose single-resource methods take the
//!   owner's `UserId` alongside the `AnalysisId`
//! - **Selector**: `AnalysisSelector`, decoding the id-`0` "most recent" path
//! - **In-memory store**: `MemoryAnalysisStore`

pub mod error;
pub mod memory;
pub mod model;
pub mod store;

pub use error::AnalysisValidationError;
pub use memory::MemoryAnalysisStore;
pub use model::{Analysis, AnalysisDraft, AnalysisSelector, AnalysisSummary, MAX_TITLE_CHARS};
pub use store::AnalysisStore;
