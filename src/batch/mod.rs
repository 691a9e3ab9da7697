//! Batch series building.
//!
//! This module provides:
//! - ROI binding for every included video (`plan`)
//! - Per-video extraction of numeric readings into a series (`builder`)
//! - The background session that owns the result set (`session`)
//! - Advisory progress reporting (`progress`)

pub mod builder;
pub mod plan;
pub mod progress;
pub mod session;

pub use builder::ResultSet;
pub use plan::bind_rois;
pub use progress::{LogReporter, StatusReporter};
pub use session::{BatchContext, BatchSession};
