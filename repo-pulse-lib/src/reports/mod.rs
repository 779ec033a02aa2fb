//! Rendering of engine results for people and programs.
//!
//! The JSON builders produce the shapes returned by the tools, with unknown
//! measurements as `null`. The console generator writes a plain or colored
//! text summary of activity metrics.

mod console;
mod json;

pub use console::generate as generate_console;
pub use json::{commit_json, issue_json, metrics_json, series_json};
