pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::{run, write_report};
