pub mod cli;
pub mod device;
pub mod directory;
pub mod load_config;

pub use cli::{run, Cli, Commands};
