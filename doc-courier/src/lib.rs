pub mod cli;
pub mod load_config;
pub mod smtp;

pub use cli::{run, Cli, Commands};
