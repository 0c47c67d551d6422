//! ioc-sweep: a lightweight indicator-of-compromise sweep agent
//!
//! This crate compares local system state against threat-intelligence
//! indicators. It hashes files in configured directories, inspects outbound
//! TCP connections and running processes, and produces a point-in-time
//! report of everything that matched a malicious hash, IP address or
//! suspicious process name.

pub mod core;
pub mod detection;
pub mod scanner;
pub mod ui;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
