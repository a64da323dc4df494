use clap::{Parser, Subcommand};

use crate::domain::ChannelInstance;

#[derive(Parser)]
#[command(name = "subfeed")]
#[command(about = "Subreddit dashboard: polls hot listings and remembers your picks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or change the selected subreddits
    Channels {
        #[command(subcommand)]
        action: ChannelsAction,
    },

    /// Show or set how many posts are fetched per subreddit
    Limit {
        /// New limit (1-100); prints the current one if omitted
        value: Option<u32>,
    },

    /// Fetch the selected subreddits once and print the posts
    Fetch {
        /// Channel list to use (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        instance: ChannelInstance,

        /// Print posts as JSON instead of cards
        #[arg(long)]
        json: bool,
    },

    /// Keep polling the selected subreddits and print every refresh
    Watch {
        /// Channel list to use (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        instance: ChannelInstance,
    },
}

#[derive(Subcommand)]
pub enum ChannelsAction {
    /// Print the selected subreddits
    Show {
        #[arg(short, long, default_value = "primary")]
        instance: ChannelInstance,
    },

    /// Replace the selection (at most 4; no names clears it)
    Set {
        #[arg(short, long, default_value = "primary")]
        instance: ChannelInstance,

        /// Subreddit names, without the r/ prefix
        names: Vec<String>,
    },

    /// Forget the stored selection and go back to the defaults
    Reset {
        #[arg(short, long, default_value = "primary")]
        instance: ChannelInstance,
    },
}
