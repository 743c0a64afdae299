//! CLI module containing argument parsing and output formatting

pub mod args;
pub mod output;

pub use args::{Args, BackendCommand, Command};
