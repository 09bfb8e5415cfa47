//! Colored progress lines on stdout
//!
//! Diagnostics go through `tracing` on stderr; these helpers are the
//! user-facing report of what happened to each group and repository.
//! `NO_COLOR` disables the styling.

use crossterm::style::Stylize;
use std::fmt::Display;

/// Phase start/complete, clone notices
pub fn success(message: impl Display) {
    println!("{}", message.to_string().green());
}

/// Existing working copy being updated
pub fn notice(message: impl Display) {
    println!("{}", message.to_string().blue());
}

/// Failures and skips
pub fn failure(message: impl Display) {
    println!("{}", message.to_string().red());
}

/// Uncolored informational line
pub fn plain(message: impl Display) {
    println!("{}", message);
}

pub fn banner(message: impl Display) {
    println!("{}", message.to_string().green().bold());
}
