//! Subcommand handlers.

pub mod bodies;
pub mod completions;
pub mod config;
pub mod decode;
pub mod sessions;
