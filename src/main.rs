use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subfeed::cli::render::{format_card, format_channels};
use subfeed::cli::{ChannelsAction, Cli, Commands};
use subfeed::config::Config;
use subfeed::domain::{ChannelInstance, Preferences};
use subfeed::errors::FeederResult;
use subfeed::services::{
    FeedCache, FeedPoller, FeedSnapshot, FetchService, PreferenceService, SelectionService,
};
use subfeed::sources::RedditSource;
use subfeed::storage::{SqlitePreferenceStore, SqliteStorage};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "subfeed=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> FeederResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize storage
    let storage = SqliteStorage::new(&config.db_path)?;
    let store = SqlitePreferenceStore::new(storage);

    match cli.command {
        Commands::Channels { action } => cmd_channels(action, store),
        Commands::Limit { value } => cmd_limit(value, store),
        Commands::Fetch { instance, json } => cmd_fetch(instance, json, store, &config).await,
        Commands::Watch { instance } => cmd_watch(instance, store, &config).await,
    }
}

fn cmd_channels(action: ChannelsAction, store: SqlitePreferenceStore) -> FeederResult<()> {
    match action {
        ChannelsAction::Show { instance } => {
            let selection = SelectionService::new(store, instance)?;
            println!("{} channels: {}", instance, format_channels(&selection.channels()));
        }
        ChannelsAction::Set { instance, names } => {
            let selection = SelectionService::new(store, instance)?;
            selection.update_channels(&names)?;
            println!("{} channels set: {}", instance, format_channels(&selection.channels()));
        }
        ChannelsAction::Reset { instance } => {
            let selection = SelectionService::new(store, instance)?;
            selection.reset()?;
            println!(
                "{} channels reset: {}",
                instance,
                format_channels(&selection.channels())
            );
        }
    }

    Ok(())
}

fn cmd_limit(value: Option<u32>, store: SqlitePreferenceStore) -> FeederResult<()> {
    let service = PreferenceService::new(store);

    let prefs = match value {
        Some(limit) => service.set_reddit_limit(limit)?,
        None => service.load()?,
    };

    println!("Posts per subreddit: {}", prefs.reddit_limit);
    Ok(())
}

fn build_cache(config: &Config) -> FeederResult<FeedCache<RedditSource>> {
    let source = RedditSource::new(&config.api_base, config.http_timeout)?;
    Ok(FeedCache::new(
        FetchService::new(source),
        config.stale_after,
        config.cache_capacity,
    ))
}

async fn cmd_fetch(
    instance: ChannelInstance,
    json: bool,
    store: SqlitePreferenceStore,
    config: &Config,
) -> FeederResult<()> {
    let selection = SelectionService::new(store.clone(), instance)?;
    let prefs = PreferenceService::new(store).load()?;
    let channels = selection.channels();

    if channels.is_empty() {
        println!("No subreddits selected.");
        return Ok(());
    }

    let cache = build_cache(config)?;
    let read = cache.read(&channels, prefs.reddit_limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(read.posts.as_ref())?);
        return Ok(());
    }

    println!("Fetched {}\n", format_channels(&channels));
    if read.posts.is_empty() {
        println!("No posts.");
        return Ok(());
    }

    let now = Utc::now();
    for (i, post) in read.posts.iter().enumerate() {
        println!("{}", format_card(i, post, now));
    }

    Ok(())
}

async fn cmd_watch(
    instance: ChannelInstance,
    store: SqlitePreferenceStore,
    config: &Config,
) -> FeederResult<()> {
    // Kept alive for the whole run: dropping it stops the poller
    let selection = SelectionService::new(store.clone(), instance)?;

    // Re-read before every fetch so `subfeed limit` applies to a running watch
    let preferences = PreferenceService::new(store);
    let limit = move || match preferences.load() {
        Ok(prefs) => prefs.reddit_limit,
        Err(e) => {
            tracing::warn!(error = %e, "could not read preferences, using default limit");
            Preferences::default().reddit_limit
        }
    };

    let cache = build_cache(config)?;
    let poller = FeedPoller::new(cache, config.refetch_interval, limit);
    let handle = poller.spawn(selection.subscribe());
    let mut snapshots = handle.subscribe();

    println!(
        "Watching {} (refresh every {}s, Ctrl-C to stop)\n",
        format_channels(&selection.channels()),
        config.refetch_interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
        }
    }

    handle.stop();
    println!("Stopped.");
    Ok(())
}

fn print_snapshot(snapshot: &FeedSnapshot) {
    if snapshot.is_loading {
        return;
    }

    if let Some(error) = &snapshot.error {
        println!("[error] {}", error);
        return;
    }

    let Some(posts) = &snapshot.data else {
        return;
    };

    println!(
        "== {} ({} posts, {}) ==",
        format_channels(&snapshot.channels),
        posts.len(),
        Utc::now().format("%H:%M:%S")
    );
    let now = Utc::now();
    for (i, post) in posts.iter().enumerate() {
        println!("{}", format_card(i, post, now));
    }
    println!();
}
