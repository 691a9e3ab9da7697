//! Result export.
//!
//! This module provides:
//! - Padded column-per-video CSV table
//! - JSON dump of the result set
//! - Plain-text listing for display
//! - Per-video line charts

pub mod chart;
pub mod json;
pub mod listing;
pub mod table;

pub use chart::render_all_charts;
pub use json::export_to_json;
pub use listing::format_listing;
pub use table::export_to_csv;
