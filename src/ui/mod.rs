//! User interface components.
//!
//! This module provides:
//! - CLI interface
//! - Text rendering of scan reports

pub mod cli;
pub mod report;

pub use cli::Cli;
pub use report::{render_report, render_report_summary};
