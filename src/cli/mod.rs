pub mod commands;
pub mod render;

pub use commands::{ChannelsAction, Cli, Commands};
