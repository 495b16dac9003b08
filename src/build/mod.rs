//! Per-build state.
//!
//! - [`context`] - provider/format types and the [`context::BuildContext`] record

pub mod context;
