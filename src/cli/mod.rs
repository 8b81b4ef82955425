//! CLI module for researcher - argument parsing and transcript output.

pub mod commands;
pub mod transcript;

pub use commands::{Cli, is_exit_command};
