//! Utility functions for display formatting.

pub mod format;

pub use format::{format_idle, truncate_string};
