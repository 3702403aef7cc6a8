//! Output module for rendering job reports
//!
//! This module handles:
//! - Rendering a finished job as a markdown report
//! - Printing job statistics to the terminal

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::print_statistics;
