//! CLI subcommand implementations.

pub mod announcements;
pub mod search;
