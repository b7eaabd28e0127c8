//! Subcommand implementations.
//!
//! Each returns the process exit code on a completed run, or an error for
//! failures that prevented the run from happening at all.

pub mod note;
pub mod upload;

/// Every item succeeded.
pub const EXIT_OK: u8 = 0;
/// The run completed but at least one item failed.
pub const EXIT_PARTIAL: u8 = 1;
/// The run could not be carried out (bad config, auth, unreachable server).
pub const EXIT_FATAL: u8 = 2;
