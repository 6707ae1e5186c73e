#![forbid(unsafe_code)]

//! Core primitives shared by the fview crates.
//!
//! - [`Size`]: cell-based geometry negotiated between backing controls.
//! - [`DebugLog`]: process-wide, append-only diagnostic sink.

pub mod debug_log;
pub mod geometry;

pub use debug_log::{DebugLog, DebugLogWriter, log};
pub use geometry::Size;
